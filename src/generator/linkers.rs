//! Linkers: derive a field from an earlier field of the same record.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use super::{FieldLinker, Result};
use crate::error::GenerationError;
use crate::model::{Decimal, FieldValue, GeneratorOptions, LinkerKind, DEFAULT_DATE_FORMAT};

/// Upper bound on generated years of employment.
const MAX_YEARS_EMPLOYED: i64 = 40;

/// Date formats accepted by [`YearsSinceDateLinker`], tried in order.
const DATE_FORMATS: &[&str] = &[DEFAULT_DATE_FORMAT, "%Y-%m-%d", "%d/%m/%Y"];

/// Every built-in linker.
pub fn all() -> Vec<(LinkerKind, Arc<dyn FieldLinker>)> {
    vec![
        (LinkerKind::Duplicate, Arc::new(DuplicateLinker) as Arc<dyn FieldLinker>),
        (LinkerKind::YearsSinceDate, Arc::new(YearsSinceDateLinker)),
        (LinkerKind::TimeEmployed, Arc::new(TimeEmployedLinker)),
        (LinkerKind::EnabledInteger, Arc::new(EnabledIntegerLinker)),
        (
            LinkerKind::EnabledDecimal,
            Arc::new(EnabledDecimalLinker::new(Arc::new(EnabledIntegerLinker))),
        ),
        (LinkerKind::PlusAddressedEmail, Arc::new(PlusAddressedEmailLinker)),
    ]
}

fn failed(linker: &'static str, reason: impl Into<String>) -> GenerationError {
    GenerationError::LinkerFailed {
        linker,
        field: String::new(),
        reason: reason.into(),
    }
}

/// Copies the source value.
pub struct DuplicateLinker;

impl FieldLinker for DuplicateLinker {
    fn name(&self) -> &'static str {
        "duplicate"
    }

    fn link(
        &self,
        _rng: &mut ChaCha8Rng,
        source: &FieldValue,
        _options: &GeneratorOptions,
    ) -> Result<FieldValue> {
        Ok(source.clone())
    }
}

/// Whole years elapsed since a date string or timestamp.
pub struct YearsSinceDateLinker;

impl YearsSinceDateLinker {
    fn parse(text: &str) -> Option<DateTime<Utc>> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
            return Some(ts.with_timezone(&Utc));
        }
        DATE_FORMATS.iter().find_map(|format| {
            NaiveDate::parse_from_str(text, format)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        })
    }
}

impl FieldLinker for YearsSinceDateLinker {
    fn name(&self) -> &'static str {
        "years_since_date"
    }

    fn link(
        &self,
        _rng: &mut ChaCha8Rng,
        source: &FieldValue,
        _options: &GeneratorOptions,
    ) -> Result<FieldValue> {
        let date = match source {
            FieldValue::Blank => return Ok(FieldValue::Blank),
            FieldValue::Timestamp(ts) => *ts,
            FieldValue::Text(text) => Self::parse(text)
                .ok_or_else(|| failed(self.name(), format!("unparseable date '{}'", text)))?,
            other => {
                return Err(failed(
                    self.name(),
                    format!("expected a date, got {:?}", other),
                ))
            }
        };
        Ok(FieldValue::Int((Utc::now() - date).num_days() / 365))
    }
}

/// Years at an employer: zero when the employer is empty.
pub struct TimeEmployedLinker;

impl FieldLinker for TimeEmployedLinker {
    fn name(&self) -> &'static str {
        "time_employed"
    }

    fn link(
        &self,
        rng: &mut ChaCha8Rng,
        source: &FieldValue,
        options: &GeneratorOptions,
    ) -> Result<FieldValue> {
        let employed = match source {
            FieldValue::Blank => false,
            FieldValue::Text(text) => !text.trim().is_empty(),
            _ => true,
        };
        if !employed {
            return Ok(FieldValue::Int(0));
        }
        let max = options.max_value.min(MAX_YEARS_EMPLOYED).max(0);
        let min = options.min_value.max(0).min(max);
        let years = if min < max {
            rng.random_range(min..max)
        } else {
            min
        };
        Ok(FieldValue::Int(years))
    }
}

/// An integer in `[min, max)` when the source flag is true, zero otherwise.
pub struct EnabledIntegerLinker;

impl FieldLinker for EnabledIntegerLinker {
    fn name(&self) -> &'static str {
        "enabled_integer"
    }

    fn link(
        &self,
        rng: &mut ChaCha8Rng,
        source: &FieldValue,
        options: &GeneratorOptions,
    ) -> Result<FieldValue> {
        let enabled = match source {
            FieldValue::Bool(flag) => *flag,
            FieldValue::Blank => false,
            other => {
                return Err(failed(
                    self.name(),
                    format!("expected a boolean, got {:?}", other),
                ))
            }
        };
        if !enabled {
            return Ok(FieldValue::Int(0));
        }
        let (min, max) = (options.min_value, options.max_value);
        let value = if min < max {
            rng.random_range(min..max)
        } else {
            min
        };
        Ok(FieldValue::Int(value))
    }
}

/// Decimal form of an integer linker's output.
pub struct EnabledDecimalLinker {
    inner: Arc<dyn FieldLinker>,
}

impl EnabledDecimalLinker {
    pub fn new(inner: Arc<dyn FieldLinker>) -> Self {
        Self { inner }
    }
}

impl FieldLinker for EnabledDecimalLinker {
    fn name(&self) -> &'static str {
        "enabled_decimal"
    }

    fn link(
        &self,
        rng: &mut ChaCha8Rng,
        source: &FieldValue,
        options: &GeneratorOptions,
    ) -> Result<FieldValue> {
        match self.inner.link(rng, source, options)? {
            FieldValue::Int(value) => Ok(FieldValue::Decimal(Decimal::from_int(
                value,
                options.round_to,
            ))),
            FieldValue::Blank => Ok(FieldValue::Blank),
            other => Err(failed(
                self.name(),
                format!("inner linker produced {:?}", other),
            )),
        }
    }
}

/// Inserts `+value` before the `@` of the field's format string,
/// e.g. `tester@example.com` becomes `tester+42@example.com`.
pub struct PlusAddressedEmailLinker;

impl FieldLinker for PlusAddressedEmailLinker {
    fn name(&self) -> &'static str {
        "plus_addressed_email"
    }

    fn link(
        &self,
        _rng: &mut ChaCha8Rng,
        source: &FieldValue,
        options: &GeneratorOptions,
    ) -> Result<FieldValue> {
        let template = options
            .format_string
            .as_deref()
            .ok_or_else(|| failed(self.name(), "no format string configured"))?;
        let at = template
            .find('@')
            .ok_or_else(|| failed(self.name(), format!("'{}' has no '@'", template)))?;
        Ok(FieldValue::Text(format!(
            "{}+{}{}",
            &template[..at],
            source,
            &template[at..]
        )))
    }
}
