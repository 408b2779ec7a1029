//! JSON encoding: one array of objects keyed by field name.

use std::io::{self, Write};

use super::RecordEncoder;
use crate::error::StageError;
use crate::model::{Record, Specification};

#[derive(Debug, Default)]
pub struct JsonEncoder {
    written: u64,
}

impl JsonEncoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordEncoder for JsonEncoder {
    fn kind(&self) -> &'static str {
        "json"
    }

    fn begin<W: Write>(&mut self, out: &mut W, _spec: &Specification) -> io::Result<()> {
        out.write_all(b"[")
    }

    fn encode<W: Write>(
        &mut self,
        out: &mut W,
        spec: &Specification,
        record: &Record,
    ) -> Result<(), StageError> {
        if self.written > 0 {
            out.write_all(b",")?;
        }
        out.write_all(b"\n")?;
        serde_json::to_writer(&mut *out, &record.view(spec))?;
        self.written += 1;
        Ok(())
    }

    fn end<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        out.write_all(b"\n]\n")?;
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldValue, SpecificationKind};

    #[test]
    fn test_output_is_a_json_array() {
        let spec = SpecificationKind::Companies.specification();
        let mut encoder = JsonEncoder::new();
        let mut out = Vec::new();

        encoder.begin(&mut out, &spec).expect("begin should write");
        for (i, name) in ["Oak LLC", "Pine Group"].iter().enumerate() {
            let record = Record::new(i as u64, vec![FieldValue::Text(name.to_string())]);
            encoder
                .encode(&mut out, &spec, &record)
                .expect("record should write");
        }
        encoder.end(&mut out).expect("end should write");

        let parsed: serde_json::Value =
            serde_json::from_slice(&out).expect("output should be valid json");
        let rows = parsed.as_array().expect("output should be an array");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["Company"], "Pine Group");
    }

    #[test]
    fn test_empty_output_is_valid() {
        let spec = SpecificationKind::Companies.specification();
        let mut encoder = JsonEncoder::new();
        let mut out = Vec::new();
        encoder.begin(&mut out, &spec).expect("begin should write");
        encoder.end(&mut out).expect("end should write");

        let parsed: serde_json::Value =
            serde_json::from_slice(&out).expect("output should be valid json");
        assert_eq!(parsed, serde_json::json!([]));
    }
}
