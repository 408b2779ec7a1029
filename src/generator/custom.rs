//! Generators a field selects explicitly through [`GeneratorKind`].
//!
//! Most of these draw from the word lists in [`super::words`]. The date
//! string generator is a [`FormattedGenerator`]: the default timestamp
//! generator composed with a formatting function.

use std::fmt::Write as _;
use std::sync::Arc;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use super::defaults::TimestampGenerator;
use super::words::{self, pick};
use super::{FieldGenerator, Result};
use crate::error::GenerationError;
use crate::model::{FieldValue, GeneratorKind, GeneratorOptions, DEFAULT_DATE_FORMAT};

/// Attempts made to fit a city name within the length limit before truncating.
const CITY_ATTEMPTS: usize = 1024;

/// Every built-in override generator.
pub fn all() -> Vec<(GeneratorKind, Arc<dyn FieldGenerator>)> {
    vec![
        (GeneratorKind::Name, Arc::new(NameGenerator) as Arc<dyn FieldGenerator>),
        (GeneratorKind::Address, Arc::new(AddressGenerator)),
        (GeneratorKind::ExtraAddress, Arc::new(ExtraAddressGenerator)),
        (GeneratorKind::BusinessName, Arc::new(BusinessNameGenerator)),
        (GeneratorKind::City, Arc::new(CityGenerator)),
        (
            GeneratorKind::State,
            Arc::new(ListGenerator::new("state", words::STATES)),
        ),
        (
            GeneratorKind::Title,
            Arc::new(ListGenerator::new("title", words::TITLES)),
        ),
        (GeneratorKind::ZipCode, Arc::new(ZipCodeGenerator)),
        (GeneratorKind::PhoneNumber, Arc::new(PhoneNumberGenerator)),
        (GeneratorKind::Ssn, Arc::new(SsnGenerator)),
        (GeneratorKind::Email, Arc::new(EmailGenerator)),
        (
            GeneratorKind::Gender,
            Arc::new(ListGenerator::new("gender", words::GENDERS)),
        ),
        (
            GeneratorKind::DateString,
            Arc::new(FormattedGenerator::new(
                "date_string",
                Arc::new(TimestampGenerator),
                format_date,
            )),
        ),
        (GeneratorKind::AlwaysTrue, Arc::new(AlwaysTrueGenerator)),
    ]
}

/// Post-processing applied to a base generator's output.
pub type Formatter = fn(FieldValue, &GeneratorOptions) -> Result<FieldValue>;

/// A base generator decorated with a formatter.
pub struct FormattedGenerator {
    name: &'static str,
    base: Arc<dyn FieldGenerator>,
    format: Formatter,
}

impl FormattedGenerator {
    pub fn new(name: &'static str, base: Arc<dyn FieldGenerator>, format: Formatter) -> Self {
        Self { name, base, format }
    }
}

impl FieldGenerator for FormattedGenerator {
    fn name(&self) -> &'static str {
        self.name
    }

    fn generate(&self, rng: &mut ChaCha8Rng, options: &GeneratorOptions) -> Result<FieldValue> {
        let value = self.base.generate(rng, options)?;
        (self.format)(value, options)
    }
}

/// Renders a timestamp with the field's chrono format (default `%m/%d/%Y`).
pub fn format_date(value: FieldValue, options: &GeneratorOptions) -> Result<FieldValue> {
    let format = options
        .format_string
        .as_deref()
        .unwrap_or(DEFAULT_DATE_FORMAT);
    match value {
        FieldValue::Timestamp(ts) => {
            let mut text = String::new();
            write!(text, "{}", ts.format(format)).map_err(|_| {
                GenerationError::GeneratorFailed {
                    generator: "date_string",
                    field: String::new(),
                    reason: format!("invalid date format '{}'", format),
                }
            })?;
            Ok(FieldValue::Text(text))
        }
        FieldValue::Blank => Ok(FieldValue::Blank),
        other => Err(GenerationError::GeneratorFailed {
            generator: "date_string",
            field: String::new(),
            reason: format!("expected a timestamp, got {:?}", other),
        }),
    }
}

/// Uniform pick from a fixed list.
pub struct ListGenerator {
    name: &'static str,
    values: &'static [&'static str],
}

impl ListGenerator {
    pub fn new(name: &'static str, values: &'static [&'static str]) -> Self {
        Self { name, values }
    }
}

impl FieldGenerator for ListGenerator {
    fn name(&self) -> &'static str {
        self.name
    }

    fn generate(&self, rng: &mut ChaCha8Rng, _options: &GeneratorOptions) -> Result<FieldValue> {
        Ok(FieldValue::Text(pick(rng, self.values).to_string()))
    }
}

/// Person names. The variant selects first, middle (an initial), last,
/// suffix or, by default, a full name.
pub struct NameGenerator;

impl FieldGenerator for NameGenerator {
    fn name(&self) -> &'static str {
        "name"
    }

    fn generate(&self, rng: &mut ChaCha8Rng, options: &GeneratorOptions) -> Result<FieldValue> {
        let variant = options
            .variant
            .as_deref()
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let name = match variant.as_str() {
            "first" | "f" => pick(rng, words::FIRST_NAMES).to_string(),
            "middle" | "m" => middle_initial(rng).to_string(),
            "last" | "l" => pick(rng, words::LAST_NAMES).to_string(),
            "suffix" | "s" => pick(rng, words::NAME_SUFFIXES).to_string(),
            _ => format!(
                "{} {} {}",
                pick(rng, words::FIRST_NAMES),
                middle_initial(rng),
                pick(rng, words::LAST_NAMES)
            ),
        };
        Ok(FieldValue::Text(name))
    }
}

fn middle_initial(rng: &mut ChaCha8Rng) -> char {
    char::from(b'A' + rng.random_range(0..26u8))
}

/// Street addresses such as "1432 Maple Ridge Rd".
pub struct AddressGenerator;

impl FieldGenerator for AddressGenerator {
    fn name(&self) -> &'static str {
        "address"
    }

    fn generate(&self, rng: &mut ChaCha8Rng, _options: &GeneratorOptions) -> Result<FieldValue> {
        let mut address = format!(
            "{} {}",
            rng.random_range(0..10_000),
            words::capitalize(pick(rng, words::WORDS))
        );
        if rng.random::<bool>() {
            address.push(' ');
            address.push_str(&words::capitalize(pick(rng, words::WORDS)));
        }
        let street_type = pick(rng, words::STREET_TYPES);
        if !street_type.is_empty() {
            address.push(' ');
            address.push_str(street_type);
        }
        Ok(FieldValue::Text(address))
    }
}

/// Secondary address lines such as "Suite 12B".
pub struct ExtraAddressGenerator;

impl FieldGenerator for ExtraAddressGenerator {
    fn name(&self) -> &'static str {
        "extra_address"
    }

    fn generate(&self, rng: &mut ChaCha8Rng, _options: &GeneratorOptions) -> Result<FieldValue> {
        let unit = pick(rng, words::UNIT_TYPES);
        let number = rng.random_range(1..1000);
        let letter = char::from(b'A' + rng.random_range(0..26u8));
        let text = match rng.random_range(0..3) {
            0 => format!("{} {}", unit, number),
            1 => format!("{} {}", unit, letter),
            _ => format!("{} {}{}", unit, number, letter),
        };
        Ok(FieldValue::Text(text))
    }
}

pub struct BusinessNameGenerator;

impl FieldGenerator for BusinessNameGenerator {
    fn name(&self) -> &'static str {
        "business_name"
    }

    fn generate(&self, rng: &mut ChaCha8Rng, _options: &GeneratorOptions) -> Result<FieldValue> {
        let mut name = words::capitalize(pick(rng, words::WORDS));
        let suffix = pick(rng, words::BUSINESS_SUFFIXES);
        if !suffix.is_empty() {
            name.push(' ');
            name.push_str(suffix);
        }
        Ok(FieldValue::Text(name))
    }
}

/// Place names that fit `length_limit`.
pub struct CityGenerator;

impl FieldGenerator for CityGenerator {
    fn name(&self) -> &'static str {
        "city"
    }

    fn generate(&self, rng: &mut ChaCha8Rng, options: &GeneratorOptions) -> Result<FieldValue> {
        let limit = options.length_limit.max(1);
        let mut city = words::place_name(rng);
        for _ in 1..CITY_ATTEMPTS {
            if city.len() <= limit {
                break;
            }
            city = words::place_name(rng);
        }
        city.truncate(limit);
        Ok(FieldValue::Text(city))
    }
}

/// Zip codes: five digits, or `length_limit` digits when set explicitly.
pub struct ZipCodeGenerator;

impl FieldGenerator for ZipCodeGenerator {
    fn name(&self) -> &'static str {
        "zip_code"
    }

    fn generate(&self, rng: &mut ChaCha8Rng, options: &GeneratorOptions) -> Result<FieldValue> {
        let default_limit = GeneratorOptions::default().length_limit;
        let len = if options.length_limit != default_limit {
            options.length_limit
        } else {
            5
        };
        Ok(FieldValue::Text(words::digits(rng, len)))
    }
}

pub struct PhoneNumberGenerator;

impl FieldGenerator for PhoneNumberGenerator {
    fn name(&self) -> &'static str {
        "phone_number"
    }

    fn generate(&self, rng: &mut ChaCha8Rng, _options: &GeneratorOptions) -> Result<FieldValue> {
        Ok(FieldValue::Text(format!(
            "{}-{}-{}",
            words::digits(rng, 3),
            words::digits(rng, 3),
            words::digits(rng, 4)
        )))
    }
}

pub struct SsnGenerator;

impl FieldGenerator for SsnGenerator {
    fn name(&self) -> &'static str {
        "ssn"
    }

    fn generate(&self, rng: &mut ChaCha8Rng, _options: &GeneratorOptions) -> Result<FieldValue> {
        Ok(FieldValue::Text(format!(
            "{}-{}-{}",
            words::digits(rng, 3),
            words::digits(rng, 2),
            words::digits(rng, 4)
        )))
    }
}

pub struct EmailGenerator;

impl FieldGenerator for EmailGenerator {
    fn name(&self) -> &'static str {
        "email"
    }

    fn generate(&self, rng: &mut ChaCha8Rng, _options: &GeneratorOptions) -> Result<FieldValue> {
        let mut local = pick(rng, words::WORDS).to_string();
        if rng.random::<bool>() {
            local.push_str(&rng.random_range(1..1000).to_string());
        }
        Ok(FieldValue::Text(format!(
            "{}@{}.{}",
            local,
            pick(rng, words::WORDS),
            pick(rng, words::EMAIL_TLDS)
        )))
    }
}

pub struct AlwaysTrueGenerator;

impl FieldGenerator for AlwaysTrueGenerator {
    fn name(&self) -> &'static str {
        "always_true"
    }

    fn generate(&self, _rng: &mut ChaCha8Rng, _options: &GeneratorOptions) -> Result<FieldValue> {
        Ok(FieldValue::Bool(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn text(generator: &dyn FieldGenerator, options: &GeneratorOptions) -> String {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        match generator.generate(&mut rng, options) {
            Ok(FieldValue::Text(text)) => text,
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn test_name_variants() {
        let middle = text(&NameGenerator, &GeneratorOptions::new().with_variant("m"));
        assert_eq!(middle.len(), 1);
        assert!(middle.chars().all(|c| c.is_ascii_uppercase()));

        let first = text(&NameGenerator, &GeneratorOptions::new().with_variant("first"));
        assert!(words::FIRST_NAMES.contains(&first.as_str()));

        let full = text(&NameGenerator, &GeneratorOptions::default());
        assert_eq!(full.split(' ').count(), 3);
    }

    #[test]
    fn test_zip_code_length() {
        assert_eq!(text(&ZipCodeGenerator, &GeneratorOptions::default()).len(), 5);
        let zip4 = GeneratorOptions::new().with_length_limit(4);
        assert_eq!(text(&ZipCodeGenerator, &zip4).len(), 4);
    }

    #[test]
    fn test_phone_and_ssn_shape() {
        let phone = text(&PhoneNumberGenerator, &GeneratorOptions::default());
        let parts: Vec<_> = phone.split('-').map(str::len).collect();
        assert_eq!(parts, vec![3, 3, 4]);

        let ssn = text(&SsnGenerator, &GeneratorOptions::default());
        let parts: Vec<_> = ssn.split('-').map(str::len).collect();
        assert_eq!(parts, vec![3, 2, 4]);
    }

    #[test]
    fn test_city_fits_limit() {
        let options = GeneratorOptions::new().with_length_limit(6);
        for seed in 0..20 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let city = CityGenerator
                .generate(&mut rng, &options)
                .expect("city should generate");
            assert!(city.as_text().map(str::len).unwrap_or(0) <= 6);
        }
    }

    #[test]
    fn test_email_has_single_at() {
        let email = text(&EmailGenerator, &GeneratorOptions::default());
        assert_eq!(email.matches('@').count(), 1);
        let tld = email.rsplit('.').next().expect("email should have a tld");
        assert!(words::EMAIL_TLDS.contains(&tld));
    }

    #[test]
    fn test_date_string_parses_back() {
        let generator = FormattedGenerator::new("date_string", Arc::new(TimestampGenerator), format_date);
        let options = GeneratorOptions::new().with_format(DEFAULT_DATE_FORMAT);
        let date = text(&generator, &options);

        NaiveDate::parse_from_str(&date, DEFAULT_DATE_FORMAT).expect("date should parse");
    }

    #[test]
    fn test_format_date_rejects_non_timestamp() {
        let result = format_date(FieldValue::Int(1), &GeneratorOptions::default());
        assert!(result.is_err());
    }
}
