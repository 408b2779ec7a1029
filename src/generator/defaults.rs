//! Default generators, one per field kind.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use super::words::{pick, WORDS};
use super::{FieldGenerator, Result};
use crate::model::{Decimal, FieldKind, FieldValue, GeneratorOptions};

/// The default generator for every field kind.
pub fn all() -> Vec<(FieldKind, Arc<dyn FieldGenerator>)> {
    vec![
        (FieldKind::Int, Arc::new(IntGenerator) as Arc<dyn FieldGenerator>),
        (FieldKind::UInt, Arc::new(UIntGenerator)),
        (FieldKind::Float, Arc::new(FloatGenerator)),
        (FieldKind::Decimal, Arc::new(DecimalGenerator)),
        (FieldKind::Bool, Arc::new(BoolGenerator)),
        (FieldKind::Timestamp, Arc::new(TimestampGenerator)),
        (FieldKind::String, Arc::new(StringGenerator)),
        (FieldKind::Uuid, Arc::new(UuidGenerator)),
    ]
}

fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10_f64.powi(places.min(15) as i32);
    (value * factor).round() / factor
}

/// Signed integer in `[min, max)`, shortened to at most `length_limit` digits.
pub struct IntGenerator;

impl FieldGenerator for IntGenerator {
    fn name(&self) -> &'static str {
        "int"
    }

    fn generate(&self, rng: &mut ChaCha8Rng, options: &GeneratorOptions) -> Result<FieldValue> {
        let (min, max) = (options.min_value, options.max_value);
        let mut value = if min < max {
            rng.random_range(min..max)
        } else {
            min
        };
        if options.length_limit < 19 {
            let bound = 10_i64.pow(options.length_limit as u32);
            while value >= bound {
                value /= 10;
            }
        }
        Ok(FieldValue::Int(value))
    }
}

/// Unsigned integer in `[max(min, 0), max)`.
pub struct UIntGenerator;

impl FieldGenerator for UIntGenerator {
    fn name(&self) -> &'static str {
        "uint"
    }

    fn generate(&self, rng: &mut ChaCha8Rng, options: &GeneratorOptions) -> Result<FieldValue> {
        let min = options.min_value.max(0) as u64;
        let max = options.max_value.max(0) as u64;
        let value = if min < max {
            rng.random_range(min..max)
        } else {
            min
        };
        Ok(FieldValue::UInt(value))
    }
}

/// Unit-interval float rounded to `round_to` places.
pub struct FloatGenerator;

impl FieldGenerator for FloatGenerator {
    fn name(&self) -> &'static str {
        "float"
    }

    fn generate(&self, rng: &mut ChaCha8Rng, options: &GeneratorOptions) -> Result<FieldValue> {
        Ok(FieldValue::Float(round_to(rng.random::<f64>(), options.round_to)))
    }
}

/// Decimal in `[min, max)` rounded to `round_to` places.
pub struct DecimalGenerator;

impl FieldGenerator for DecimalGenerator {
    fn name(&self) -> &'static str {
        "decimal"
    }

    fn generate(&self, rng: &mut ChaCha8Rng, options: &GeneratorOptions) -> Result<FieldValue> {
        let min = options.min_value as f64;
        let span = (options.max_value as f64 - min).max(0.0);
        let value = min + rng.random::<f64>() * span;
        Ok(FieldValue::Decimal(Decimal::from_f64(value, options.round_to)))
    }
}

pub struct BoolGenerator;

impl FieldGenerator for BoolGenerator {
    fn name(&self) -> &'static str {
        "bool"
    }

    fn generate(&self, rng: &mut ChaCha8Rng, _options: &GeneratorOptions) -> Result<FieldValue> {
        Ok(FieldValue::Bool(rng.random::<bool>()))
    }
}

/// A moment in the past, up to `i32::MAX` seconds ago.
pub struct TimestampGenerator;

impl FieldGenerator for TimestampGenerator {
    fn name(&self) -> &'static str {
        "timestamp"
    }

    fn generate(&self, rng: &mut ChaCha8Rng, _options: &GeneratorOptions) -> Result<FieldValue> {
        let seconds_ago = rng.random_range(0..i32::MAX as i64);
        Ok(FieldValue::Timestamp(
            Utc::now() - Duration::seconds(seconds_ago),
        ))
    }
}

/// Free text, truncated to `length_limit`.
///
/// Numeric and unsafe-character options produce random characters; otherwise
/// words are joined until the limit is reached.
pub struct StringGenerator;

impl FieldGenerator for StringGenerator {
    fn name(&self) -> &'static str {
        "string"
    }

    fn generate(&self, rng: &mut ChaCha8Rng, options: &GeneratorOptions) -> Result<FieldValue> {
        let limit = options.length_limit.max(1);
        let text = if options.numeric || options.allow_unsafe_chars {
            let (low, high) = if options.numeric {
                (b'0', b'9')
            } else {
                (b'!', b'~')
            };
            let len = rng.random_range(1..=limit);
            (0..len)
                .map(|_| char::from(rng.random_range(low..=high)))
                .collect()
        } else {
            let mut text = String::with_capacity(limit + 12);
            while text.len() < limit {
                if !text.is_empty() {
                    text.push(' ');
                }
                text.push_str(pick(rng, WORDS));
            }
            text.truncate(limit);
            text
        };
        Ok(FieldValue::Text(text))
    }
}

/// Random v4 identifier drawn from the job's RNG.
pub struct UuidGenerator;

impl FieldGenerator for UuidGenerator {
    fn name(&self) -> &'static str {
        "uuid"
    }

    fn generate(&self, rng: &mut ChaCha8Rng, _options: &GeneratorOptions) -> Result<FieldValue> {
        let bytes = rng.random::<[u8; 16]>();
        Ok(FieldValue::Uuid(
            uuid::Builder::from_random_bytes(bytes).into_uuid(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    #[test]
    fn test_int_respects_range() {
        let mut rng = rng();
        let options = GeneratorOptions::new().with_range(18, 100);
        for _ in 0..200 {
            match IntGenerator.generate(&mut rng, &options) {
                Ok(FieldValue::Int(v)) => assert!((18..100).contains(&v)),
                other => panic!("unexpected value: {:?}", other),
            }
        }
    }

    #[test]
    fn test_int_length_limit_shortens_value() {
        let mut rng = rng();
        let options = GeneratorOptions::new()
            .with_range(1_000_000, 2_000_000)
            .with_length_limit(3);
        match IntGenerator.generate(&mut rng, &options) {
            Ok(FieldValue::Int(v)) => assert!(v < 1000),
            other => panic!("unexpected value: {:?}", other),
        }
    }

    #[test]
    fn test_empty_range_yields_min() {
        let mut rng = rng();
        let options = GeneratorOptions::new().with_range(5, 5);
        assert_eq!(
            UIntGenerator.generate(&mut rng, &options).expect("should generate"),
            FieldValue::UInt(5)
        );
    }

    #[test]
    fn test_decimal_is_rounded() {
        let mut rng = rng();
        let options = GeneratorOptions::new().with_range(0, 100).with_round_to(2);
        match DecimalGenerator.generate(&mut rng, &options) {
            Ok(FieldValue::Decimal(d)) => {
                assert_eq!(d.scale(), 2);
                assert!(d.to_f64() >= 0.0 && d.to_f64() <= 100.0);
            }
            other => panic!("unexpected value: {:?}", other),
        }
    }

    #[test]
    fn test_string_variants_respect_limit() {
        let mut rng = rng();
        let words = GeneratorOptions::new().with_length_limit(12);
        let numeric = GeneratorOptions::new().numeric().with_length_limit(6);
        let unsafe_chars = GeneratorOptions::new()
            .allow_unsafe_chars()
            .with_length_limit(32);

        for _ in 0..50 {
            let text = StringGenerator
                .generate(&mut rng, &words)
                .expect("should generate");
            assert_eq!(text.as_text().map(str::len), Some(12));

            let code = StringGenerator
                .generate(&mut rng, &numeric)
                .expect("should generate");
            let code = code.as_text().expect("should be text");
            assert!(!code.is_empty() && code.len() <= 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));

            let password = StringGenerator
                .generate(&mut rng, &unsafe_chars)
                .expect("should generate");
            let password = password.as_text().expect("should be text");
            assert!(password.chars().all(|c| ('!'..='~').contains(&c)));
        }
    }

    #[test]
    fn test_timestamp_is_in_the_past() {
        let mut rng = rng();
        match TimestampGenerator.generate(&mut rng, &GeneratorOptions::default()) {
            Ok(FieldValue::Timestamp(ts)) => assert!(ts <= Utc::now()),
            other => panic!("unexpected value: {:?}", other),
        }
    }

    #[test]
    fn test_uuid_is_reproducible_per_seed() {
        let a = UuidGenerator
            .generate(&mut rng(), &GeneratorOptions::default())
            .expect("should generate");
        let b = UuidGenerator
            .generate(&mut rng(), &GeneratorOptions::default())
            .expect("should generate");
        assert_eq!(a, b);
    }
}
