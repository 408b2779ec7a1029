//! Plain-text encoding: a numbered block of `Name: value` lines per record.

use std::io::{self, Write};

use super::RecordEncoder;
use crate::error::StageError;
use crate::model::{Record, Specification};

#[derive(Debug, Default)]
pub struct TextEncoder;

impl TextEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl RecordEncoder for TextEncoder {
    fn kind(&self) -> &'static str {
        "txt"
    }

    fn begin<W: Write>(&mut self, _out: &mut W, _spec: &Specification) -> io::Result<()> {
        Ok(())
    }

    fn encode<W: Write>(
        &mut self,
        out: &mut W,
        spec: &Specification,
        record: &Record,
    ) -> Result<(), StageError> {
        writeln!(out, "--- #{} ---", record.sequence)?;
        for (field, value) in spec.fields.iter().zip(&record.values) {
            writeln!(out, "{}: {}", field.name, value)?;
        }
        writeln!(out)?;
        Ok(())
    }

    fn end<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        out.flush()
    }
}
