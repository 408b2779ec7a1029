//! Corrupting filters.
//!
//! A [`Corruptor`] picks one field of each record it is offered and, with a
//! fixed probability, overwrites it with a freshly generated value. The
//! output feeds downstream consumers that must tolerate bad data.

use std::sync::Arc;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use super::config::FilterKind;
use super::stage::FilterStage;
use crate::error::GenerationError;
use crate::generator::GeneratorRegistry;
use crate::model::{GeneratorOptions, Record, Specification};

/// Probability that an offered record is corrupted.
pub const CORRUPTION_FREQUENCY: f64 = 0.5;

/// Which field a corruptor targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSelector {
    /// A uniformly random field per record.
    RandomField,
    /// The field carrying the sequence number.
    SequenceNumber,
}

pub struct Corruptor {
    kind: FilterKind,
    selector: FieldSelector,
    frequency: f64,
    specification: Arc<Specification>,
    registry: Arc<GeneratorRegistry>,
    pending: Option<Record>,
}

impl Corruptor {
    pub fn new(
        kind: FilterKind,
        specification: Arc<Specification>,
        registry: Arc<GeneratorRegistry>,
    ) -> Self {
        let selector = match kind {
            FilterKind::RandomFieldCorruptor => FieldSelector::RandomField,
            FilterKind::SequenceNumberCorruptor => FieldSelector::SequenceNumber,
        };
        Self {
            kind,
            selector,
            frequency: CORRUPTION_FREQUENCY,
            specification,
            registry,
            pending: None,
        }
    }

    pub fn with_frequency(mut self, frequency: f64) -> Self {
        self.frequency = frequency.clamp(0.0, 1.0);
        self
    }

    fn target(&self, rng: &mut ChaCha8Rng) -> Option<usize> {
        match self.selector {
            FieldSelector::RandomField if !self.specification.fields.is_empty() => {
                Some(rng.random_range(0..self.specification.fields.len()))
            }
            FieldSelector::RandomField => None,
            FieldSelector::SequenceNumber => self.specification.sequence_field(),
        }
    }
}

impl FilterStage for Corruptor {
    fn name(&self) -> &'static str {
        self.kind.name()
    }

    fn prepare(&mut self) -> bool {
        match self.selector {
            FieldSelector::RandomField => !self.specification.fields.is_empty(),
            FieldSelector::SequenceNumber => self.specification.sequence_field().is_some(),
        }
    }

    fn sink(&mut self, record: &Record) -> bool {
        self.pending = Some(record.clone());
        true
    }

    fn next(&mut self, rng: &mut ChaCha8Rng, sequence: u64) -> Result<Record, GenerationError> {
        let mut record = self.pending.take().ok_or_else(|| {
            GenerationError::Invalid(format!(
                "{} has no record for sequence {}",
                self.kind, sequence
            ))
        })?;

        if rng.random::<f64>() >= self.frequency {
            return Ok(record);
        }
        let Some(index) = self.target(rng) else {
            return Ok(record);
        };
        let field = &self.specification.fields[index];
        let generator = self
            .registry
            .resolve(field)
            .map_err(|_| GenerationError::NoGenerator(field.name.clone()))?;
        record.values[index] = generator
            .generate(rng, &GeneratorOptions::default())
            .map_err(|e| e.for_field(&field.name))?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldKind, FieldSpec, FieldValue, SpecificationKind};

    fn registry() -> Arc<GeneratorRegistry> {
        GeneratorRegistry::shared().expect("registry should build")
    }

    #[test]
    fn test_sequence_corruptor_opts_out_without_sequence_field() {
        let spec = Arc::new(SpecificationKind::Names.specification());
        let mut filter = Corruptor::new(FilterKind::SequenceNumberCorruptor, spec, registry());
        assert!(!filter.prepare());
    }

    #[test]
    fn test_sequence_corruptor_targets_sequence_field() {
        let spec = Arc::new(Specification::new(
            "Seq",
            vec![
                FieldSpec::new("Name", FieldKind::String),
                FieldSpec::new("Id", FieldKind::UInt).sequence_number(),
            ],
        ));
        let mut filter = Corruptor::new(FilterKind::SequenceNumberCorruptor, spec, registry())
            .with_frequency(1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        assert!(filter.prepare());

        let original = Record::new(
            0,
            vec![FieldValue::Text("keep".to_string()), FieldValue::UInt(0)],
        );
        assert!(filter.sink(&original));
        let corrupted = filter.next(&mut rng, 0).expect("filter should produce a record");

        assert_eq!(corrupted.sequence, 0);
        assert_eq!(corrupted.values[0], original.values[0]);
        assert!(matches!(corrupted.values[1], FieldValue::UInt(_)));
    }

    #[test]
    fn test_zero_frequency_passes_through() {
        let spec = Arc::new(SpecificationKind::Companies.specification());
        let mut filter = Corruptor::new(FilterKind::RandomFieldCorruptor, spec, registry())
            .with_frequency(0.0);
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let record = Record::new(3, vec![FieldValue::Text("Acme".to_string())]);

        filter.sink(&record);
        assert_eq!(filter.next(&mut rng, 3).expect("should pass through"), record);
    }

    #[test]
    fn test_next_without_sink_is_an_error() {
        let spec = Arc::new(SpecificationKind::Companies.specification());
        let mut filter = Corruptor::new(FilterKind::RandomFieldCorruptor, spec, registry());
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        assert!(filter.next(&mut rng, 0).is_err());
    }
}
