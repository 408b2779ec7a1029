//! CSV encoding.
//!
//! The header row holds each field's output name. Booleans are written as
//! `1`/`0` and blanks as empty cells. Quoting is left to [`csv::Writer`].

use std::borrow::Cow;
use std::io::{self, Write};

use csv::{QuoteStyle, Terminator, WriterBuilder};

use super::RecordEncoder;
use crate::error::StageError;
use crate::model::{FieldValue, Record, Specification};

#[derive(Debug)]
pub struct CsvEncoder {
    builder: WriterBuilder,
}

impl Default for CsvEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvEncoder {
    pub fn new() -> Self {
        let mut builder = WriterBuilder::new();
        builder
            .has_headers(false)
            .quote_style(QuoteStyle::Necessary)
            .terminator(Terminator::Any(b'\n'));
        Self { builder }
    }

    fn write_row<I, T, W>(&self, out: &mut W, cells: I) -> Result<(), csv::Error>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
        W: Write,
    {
        let mut writer = self.builder.from_writer(out);
        writer.write_record(cells)?;
        writer.flush()?;
        Ok(())
    }
}

fn cell(value: &FieldValue) -> Cow<'_, str> {
    match value {
        FieldValue::Bool(true) => Cow::Borrowed("1"),
        FieldValue::Bool(false) => Cow::Borrowed("0"),
        FieldValue::Text(text) => Cow::Borrowed(text),
        other => Cow::Owned(other.to_string()),
    }
}

impl RecordEncoder for CsvEncoder {
    fn kind(&self) -> &'static str {
        "csv"
    }

    fn begin<W: Write>(&mut self, out: &mut W, spec: &Specification) -> io::Result<()> {
        self.write_row(out, spec.fields.iter().map(|f| f.output_name.as_bytes()))
            .map_err(io::Error::from)
    }

    fn encode<W: Write>(
        &mut self,
        out: &mut W,
        _spec: &Specification,
        record: &Record,
    ) -> Result<(), StageError> {
        let cells: Vec<Cow<'_, str>> = record.values.iter().map(cell).collect();
        self.write_row(out, cells.iter().map(|c| c.as_bytes()))?;
        Ok(())
    }

    fn end<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        out.flush()
    }
}
