//! Declarative per-field metadata.
//!
//! A [`FieldSpec`] describes how a single column of a specification is
//! produced: its semantic type, the options handed to its generator, an
//! optional generator override, an optional link to an earlier field and
//! whether it carries the record's sequence number.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Semantic type of a field. Every kind has exactly one default generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Int,
    UInt,
    Float,
    Decimal,
    Bool,
    Timestamp,
    String,
    Uuid,
}

impl FieldKind {
    /// All supported field kinds.
    pub const ALL: [FieldKind; 8] = [
        FieldKind::Int,
        FieldKind::UInt,
        FieldKind::Float,
        FieldKind::Decimal,
        FieldKind::Bool,
        FieldKind::Timestamp,
        FieldKind::String,
        FieldKind::Uuid,
    ];
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Int => "int",
            FieldKind::UInt => "uint",
            FieldKind::Float => "float",
            FieldKind::Decimal => "decimal",
            FieldKind::Bool => "bool",
            FieldKind::Timestamp => "timestamp",
            FieldKind::String => "string",
            FieldKind::Uuid => "uuid",
        };
        write!(f, "{}", name)
    }
}

/// Explicit generator overrides a field may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorKind {
    Name,
    Address,
    ExtraAddress,
    BusinessName,
    City,
    State,
    Title,
    ZipCode,
    PhoneNumber,
    Ssn,
    Email,
    Gender,
    DateString,
    AlwaysTrue,
}

impl GeneratorKind {
    pub const ALL: [GeneratorKind; 14] = [
        GeneratorKind::Name,
        GeneratorKind::Address,
        GeneratorKind::ExtraAddress,
        GeneratorKind::BusinessName,
        GeneratorKind::City,
        GeneratorKind::State,
        GeneratorKind::Title,
        GeneratorKind::ZipCode,
        GeneratorKind::PhoneNumber,
        GeneratorKind::Ssn,
        GeneratorKind::Email,
        GeneratorKind::Gender,
        GeneratorKind::DateString,
        GeneratorKind::AlwaysTrue,
    ];
}

/// Linkers that derive a field from an earlier field of the same record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkerKind {
    Duplicate,
    YearsSinceDate,
    TimeEmployed,
    EnabledInteger,
    EnabledDecimal,
    PlusAddressedEmail,
}

impl LinkerKind {
    pub const ALL: [LinkerKind; 6] = [
        LinkerKind::Duplicate,
        LinkerKind::YearsSinceDate,
        LinkerKind::TimeEmployed,
        LinkerKind::EnabledInteger,
        LinkerKind::EnabledDecimal,
        LinkerKind::PlusAddressedEmail,
    ];
}

/// Options handed to a generator or linker for one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeneratorOptions {
    /// Inclusive lower bound for numeric generators.
    pub min_value: i64,
    /// Exclusive upper bound for numeric generators.
    pub max_value: i64,
    /// Percentage of records left blank. Zero disables blanking.
    pub blank_frequency: u8,
    /// Maximum length of generated text, or digits of generated integers.
    pub length_limit: usize,
    /// Decimal places kept by floating point and decimal generators.
    pub round_to: u32,
    /// Restrict generated text to ASCII digits.
    pub numeric: bool,
    /// Allow printable punctuation in generated text.
    pub allow_unsafe_chars: bool,
    /// Generator-specific variant tag (e.g. `first` for names).
    pub variant: Option<String>,
    /// Generator-specific format string (chrono format for dates).
    pub format_string: Option<String>,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            min_value: 0,
            max_value: i32::MAX as i64,
            blank_frequency: 0,
            length_limit: 10,
            round_to: 2,
            numeric: false,
            allow_unsafe_chars: false,
            variant: None,
            format_string: None,
        }
    }
}

impl GeneratorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_range(mut self, min: i64, max: i64) -> Self {
        self.min_value = min;
        self.max_value = max;
        self
    }

    pub fn with_blank_frequency(mut self, percent: u8) -> Self {
        self.blank_frequency = percent.min(100);
        self
    }

    pub fn with_length_limit(mut self, limit: usize) -> Self {
        self.length_limit = limit;
        self
    }

    pub fn with_round_to(mut self, places: u32) -> Self {
        self.round_to = places;
        self
    }

    pub fn numeric(mut self) -> Self {
        self.numeric = true;
        self
    }

    pub fn allow_unsafe_chars(mut self) -> Self {
        self.allow_unsafe_chars = true;
        self
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format_string = Some(format.into());
        self
    }
}

/// Link from one field to an earlier field of the same record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSpec {
    /// Name of the field whose generated value feeds the linker.
    pub source: String,
    pub linker: LinkerKind,
}

/// Declaration of a single generated field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name, used as the JSON key and plain-text label.
    pub name: String,
    /// Column name used by tabular outputs.
    pub output_name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub options: GeneratorOptions,
    #[serde(default)]
    pub generator: Option<GeneratorKind>,
    #[serde(default)]
    pub link: Option<LinkSpec>,
    /// Whether the field receives the record's sequence number.
    #[serde(default)]
    pub sequence: bool,
}

impl FieldSpec {
    /// Creates a field whose output name matches its name.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        let name = name.into();
        Self {
            output_name: name.clone(),
            name,
            kind,
            options: GeneratorOptions::default(),
            generator: None,
            link: None,
            sequence: false,
        }
    }

    pub fn with_output_name(mut self, output_name: impl Into<String>) -> Self {
        self.output_name = output_name.into();
        self
    }

    pub fn with_options(mut self, options: GeneratorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_generator(mut self, generator: GeneratorKind) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn linked_to(mut self, source: impl Into<String>, linker: LinkerKind) -> Self {
        self.link = Some(LinkSpec {
            source: source.into(),
            linker,
        });
        self
    }

    pub fn sequence_number(mut self) -> Self {
        self.sequence = true;
        self
    }
}
