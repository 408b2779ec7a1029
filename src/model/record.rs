//! Generated records.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use super::{FieldValue, Specification};

/// One synthesized record: a value per declared field, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Sequence number that drove generation of this record.
    pub sequence: u64,
    pub values: Vec<FieldValue>,
}

impl Record {
    pub fn new(sequence: u64, values: Vec<FieldValue>) -> Self {
        Self { sequence, values }
    }

    pub fn get(&self, index: usize) -> Option<&FieldValue> {
        self.values.get(index)
    }

    /// Looks up a value by field name.
    pub fn value<'a>(&'a self, spec: &Specification, name: &str) -> Option<&'a FieldValue> {
        spec.field_index(name).and_then(|i| self.values.get(i))
    }

    /// Pairs this record with its schema for keyed serialization.
    pub fn view<'a>(&'a self, spec: &'a Specification) -> RecordView<'a> {
        RecordView { spec, record: self }
    }
}

/// A record serialized as an object keyed by field name.
pub struct RecordView<'a> {
    spec: &'a Specification,
    record: &'a Record,
}

impl Serialize for RecordView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.spec.fields.len()))?;
        for (field, value) in self.spec.fields.iter().zip(&self.record.values) {
            map.serialize_entry(&field.name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldKind, FieldSpec};

    fn spec() -> Specification {
        Specification::new(
            "Pair",
            vec![
                FieldSpec::new("Id", FieldKind::UInt).sequence_number(),
                FieldSpec::new("Name", FieldKind::String),
            ],
        )
    }

    #[test]
    fn test_record_view_serializes_by_name() {
        let spec = spec();
        let record = Record::new(
            3,
            vec![FieldValue::UInt(3), FieldValue::Text("x".to_string())],
        );

        let json = serde_json::to_string(&record.view(&spec)).expect("record should serialize");
        assert_eq!(json, r#"{"Id":3,"Name":"x"}"#);
    }

    #[test]
    fn test_value_lookup() {
        let spec = spec();
        let record = Record::new(0, vec![FieldValue::UInt(0), FieldValue::Blank]);

        assert_eq!(record.value(&spec, "Id"), Some(&FieldValue::UInt(0)));
        assert_eq!(record.value(&spec, "Name"), Some(&FieldValue::Blank));
        assert!(record.value(&spec, "Missing").is_none());
    }
}
