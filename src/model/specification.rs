//! Named record schemas.
//!
//! A [`Specification`] is an ordered list of [`FieldSpec`]s. The built-in
//! schemas are enumerated by [`SpecificationKind`] and looked up by name,
//! case-insensitively.
//!
//! # Example
//!
//! ```ignore
//! use recordforge::model::SpecificationKind;
//!
//! let kind = SpecificationKind::from_name("censusdata").expect("known specification");
//! let spec = kind.specification();
//! assert_eq!(spec.abbreviation(), "CEN");
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use super::field::{FieldKind, FieldSpec, GeneratorKind, GeneratorOptions, LinkerKind};

/// Chrono format used by date-string fields.
pub const DEFAULT_DATE_FORMAT: &str = "%m/%d/%Y";

/// An ordered, named schema of fields to generate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Specification {
    pub name: String,
    pub fields: Vec<FieldSpec>,
}

impl Specification {
    pub fn new(name: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// First three letters of the name, upper-cased.
    pub fn abbreviation(&self) -> String {
        self.name.chars().take(3).collect::<String>().to_uppercase()
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Index of the field flagged as carrying the sequence number.
    pub fn sequence_field(&self) -> Option<usize> {
        self.fields.iter().position(|f| f.sequence)
    }
}

/// The built-in specifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecificationKind {
    CensusData,
    PlayerProfile,
    Names,
    Companies,
    Addresses,
    ContactInfo,
    Passwords,
}

impl SpecificationKind {
    pub const ALL: [SpecificationKind; 7] = [
        SpecificationKind::CensusData,
        SpecificationKind::PlayerProfile,
        SpecificationKind::Names,
        SpecificationKind::Companies,
        SpecificationKind::Addresses,
        SpecificationKind::ContactInfo,
        SpecificationKind::Passwords,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SpecificationKind::CensusData => "CensusData",
            SpecificationKind::PlayerProfile => "PlayerProfile",
            SpecificationKind::Names => "Names",
            SpecificationKind::Companies => "Companies",
            SpecificationKind::Addresses => "Addresses",
            SpecificationKind::ContactInfo => "ContactInfo",
            SpecificationKind::Passwords => "Passwords",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Builds the schema for this specification.
    pub fn specification(&self) -> Specification {
        let fields = match self {
            SpecificationKind::CensusData => census_data(),
            SpecificationKind::PlayerProfile => player_profile(),
            SpecificationKind::Names => names(),
            SpecificationKind::Companies => companies(),
            SpecificationKind::Addresses => addresses(),
            SpecificationKind::ContactInfo => contact_info(),
            SpecificationKind::Passwords => passwords(),
        };
        Specification::new(self.name(), fields)
    }
}

impl fmt::Display for SpecificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn text(name: &str, generator: GeneratorKind) -> FieldSpec {
    FieldSpec::new(name, FieldKind::String).with_generator(generator)
}

fn person_name(name: &str, variant: &str) -> FieldSpec {
    text(name, GeneratorKind::Name).with_options(
        GeneratorOptions::new()
            .with_variant(variant)
            .with_length_limit(32),
    )
}

fn date_string(name: &str) -> FieldSpec {
    text(name, GeneratorKind::DateString)
        .with_options(GeneratorOptions::new().with_format(DEFAULT_DATE_FORMAT))
}

fn blank(field: FieldSpec, percent: u8) -> FieldSpec {
    let options = field.options.clone().with_blank_frequency(percent);
    field.with_options(options)
}

fn city(name: &str) -> FieldSpec {
    text(name, GeneratorKind::City).with_options(GeneratorOptions::new().with_length_limit(24))
}

fn census_data() -> Vec<FieldSpec> {
    vec![
        FieldSpec::new("UniqueIdentifier", FieldKind::UInt)
            .sequence_number()
            .with_output_name("seq id"),
        FieldSpec::new("TrackingId", FieldKind::Uuid).with_output_name("track id"),
        text("Title", GeneratorKind::Title).with_output_name("title"),
        person_name("FirstName", "first").with_output_name("first"),
        person_name("MiddleName", "middle").with_output_name("middle"),
        person_name("LastName", "last").with_output_name("last"),
        person_name("Suffix", "suffix").with_output_name("suf"),
        text("BusinessName", GeneratorKind::BusinessName).with_output_name("business name"),
        text("Address1", GeneratorKind::Address).with_output_name("street 1"),
        blank(text("Address2", GeneratorKind::ExtraAddress), 50).with_output_name("street 2"),
        blank(text("ExtraAddress", GeneratorKind::ExtraAddress), 80)
            .with_output_name("extra address"),
        city("City").with_output_name("city"),
        text("State", GeneratorKind::State).with_output_name("state"),
        text("Zip5", GeneratorKind::ZipCode).with_output_name("zip5"),
        text("Zip4", GeneratorKind::ZipCode)
            .with_options(GeneratorOptions::new().with_length_limit(4))
            .with_output_name("zip4"),
        date_string("BirthDate").with_output_name("birth date"),
        blank(date_string("DeathDate"), 95).with_output_name("death date"),
        text("EmailAddress", GeneratorKind::Email).with_output_name("email address"),
        text("SSN", GeneratorKind::Ssn).with_output_name("ssn"),
        FieldSpec::new("Age", FieldKind::Int)
            .with_options(GeneratorOptions::new().with_range(18, 100))
            .linked_to("BirthDate", LinkerKind::YearsSinceDate)
            .with_output_name("age"),
        FieldSpec::new("Income", FieldKind::Int)
            .with_options(GeneratorOptions::new().with_range(5_000, 250_000))
            .with_output_name("income"),
        blank(text("Gender", GeneratorKind::Gender), 10).with_output_name("gender"),
        blank(text("Employer", GeneratorKind::BusinessName), 30).with_output_name("employer"),
        FieldSpec::new("TimeEmployedYears", FieldKind::Int)
            .with_options(GeneratorOptions::new().with_range(1, 40))
            .linked_to("Employer", LinkerKind::TimeEmployed)
            .with_output_name("time employed years"),
        FieldSpec::new("DebtToIncomeRatio", FieldKind::Decimal)
            .with_options(GeneratorOptions::new().with_range(0, 100))
            .with_output_name("debt to income ratio"),
        FieldSpec::new("HasSecondaryIncome", FieldKind::Bool)
            .with_output_name("has secondary income"),
        FieldSpec::new("SecondaryIncome", FieldKind::Decimal)
            .with_options(GeneratorOptions::new().with_range(250, 75_000))
            .linked_to("HasSecondaryIncome", LinkerKind::EnabledDecimal)
            .with_output_name("secondary income"),
        text("PhoneNumber", GeneratorKind::PhoneNumber).with_output_name("phone number"),
    ]
}

fn player_profile() -> Vec<FieldSpec> {
    vec![
        FieldSpec::new("Id", FieldKind::Uuid),
        text("Title", GeneratorKind::Title),
        person_name("FirstName", "first"),
        person_name("MiddleInitial", "middle"),
        person_name("LastName", "last"),
        person_name("NameSuffix", "suffix"),
        text("Company", GeneratorKind::BusinessName),
        text("StreetAddress1", GeneratorKind::Address),
        blank(text("StreetAddress2", GeneratorKind::ExtraAddress), 50),
        city("City"),
        text("State", GeneratorKind::State),
        text("ZipCode", GeneratorKind::ZipCode),
        date_string("DateOfBirth"),
        text("HomePhoneNumber", GeneratorKind::PhoneNumber),
        text("MobilePhoneNumber", GeneratorKind::PhoneNumber),
        text("EmailAddress", GeneratorKind::Email),
        text("PlayerId", GeneratorKind::Ssn),
        FieldSpec::new("Password", FieldKind::String).with_options(
            GeneratorOptions::new()
                .allow_unsafe_chars()
                .with_length_limit(32),
        ),
        FieldSpec::new("CurrentCredits", FieldKind::Int)
            .with_options(GeneratorOptions::new().with_range(500, 5_000_000)),
        blank(
            FieldSpec::new("MemberName", FieldKind::String)
                .with_options(GeneratorOptions::new().with_length_limit(24)),
            30,
        ),
        date_string("MemberJoinDate"),
        date_string("MemberStartDate"),
        blank(date_string("MemberQuitDate"), 95),
        FieldSpec::new("MemberAge", FieldKind::Int)
            .with_options(GeneratorOptions::new().with_range(18, 100))
            .linked_to("DateOfBirth", LinkerKind::YearsSinceDate),
        blank(
            FieldSpec::new("LinkedShortCode", FieldKind::String)
                .with_options(GeneratorOptions::new().numeric().with_length_limit(6)),
            40,
        ),
        FieldSpec::new("SequenceNumber", FieldKind::UInt).sequence_number(),
    ]
}

fn names() -> Vec<FieldSpec> {
    vec![
        person_name("First", "first"),
        person_name("Middle", "middle"),
        person_name("Last", "last"),
    ]
}

fn companies() -> Vec<FieldSpec> {
    vec![text("Company", GeneratorKind::BusinessName)]
}

fn addresses() -> Vec<FieldSpec> {
    vec![
        text("Address", GeneratorKind::Address),
        blank(text("Extra", GeneratorKind::ExtraAddress), 50),
        city("City"),
        text("State", GeneratorKind::State),
        text("Zip", GeneratorKind::ZipCode),
    ]
}

fn contact_info() -> Vec<FieldSpec> {
    vec![
        person_name("FirstName", "first"),
        person_name("LastName", "last"),
        text("Company", GeneratorKind::BusinessName),
        text("Address1", GeneratorKind::Address),
        blank(text("Address2", GeneratorKind::ExtraAddress), 50),
        city("City"),
        text("State", GeneratorKind::State),
        text("ZipCode", GeneratorKind::ZipCode),
        date_string("DateOfBirth"),
        text("Phone", GeneratorKind::PhoneNumber),
        text("Email", GeneratorKind::Email),
    ]
}

fn passwords() -> Vec<FieldSpec> {
    vec![FieldSpec::new("Password", FieldKind::String).with_options(
        GeneratorOptions::new()
            .allow_unsafe_chars()
            .with_length_limit(32),
    )]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_is_case_insensitive() {
        assert_eq!(
            SpecificationKind::from_name("censusdata"),
            Some(SpecificationKind::CensusData)
        );
        assert_eq!(
            SpecificationKind::from_name(" Passwords "),
            Some(SpecificationKind::Passwords)
        );
        assert!(SpecificationKind::from_name("Planets").is_none());
    }

    #[test]
    fn test_abbreviation() {
        let spec = SpecificationKind::CensusData.specification();
        assert_eq!(spec.abbreviation(), "CEN");
        assert_eq!(Specification::new("ab", vec![]).abbreviation(), "AB");
    }

    #[test]
    fn test_builtin_links_point_backwards() {
        for kind in SpecificationKind::ALL {
            let spec = kind.specification();
            for (index, field) in spec.fields.iter().enumerate() {
                if let Some(link) = &field.link {
                    let source = spec
                        .field_index(&link.source)
                        .expect("link source should exist");
                    assert!(source < index, "{}.{} links forward", spec.name, field.name);
                }
            }
        }
    }

    #[test]
    fn test_builtin_sequence_fields_are_unsigned() {
        for kind in SpecificationKind::ALL {
            let spec = kind.specification();
            let sequence_fields: Vec<_> = spec.fields.iter().filter(|f| f.sequence).collect();
            assert!(sequence_fields.len() <= 1);
            for field in sequence_fields {
                assert_eq!(field.kind, FieldKind::UInt);
                assert!(field.link.is_none());
            }
        }
    }

    #[test]
    fn test_census_column_names() {
        let spec = SpecificationKind::CensusData.specification();
        assert_eq!(spec.fields[0].output_name, "seq id");
        assert_eq!(spec.sequence_field(), Some(0));
        assert_eq!(spec.fields.last().map(|f| f.output_name.as_str()), Some("phone number"));
    }
}
