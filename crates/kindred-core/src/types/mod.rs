//! # Core Type Definitions
//!
//! This module contains the data model the engine consumes:
//! - Identifiers (`PersonId`, `RelationshipId`)
//! - Person records (`Person`, `Name`, `Gender`, `Fact`)
//! - Relationship records (`Relationship`, `RelationshipType`)
//! - Error types (`KindredError`)
//!
//! Persons and relationships are created by loaders and never mutated by the
//! engine. Everything the engine derives (families, generations, ages) lives
//! outside these records.
//!
//! ## Serialization
//!
//! All types derive serde traits. JSON uses camelCase field names so a
//! GEDCOM-X shaped document maps directly onto them. The same derives feed
//! postcard for the binary formats, so no field may be skipped on
//! serialization.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Stable identifier of a person in the dataset.
///
/// `PersonId(0)` is reserved for the synthetic "unknown person".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PersonId(pub u64);

impl PersonId {
    /// Sentinel id of the synthetic unknown person.
    pub const UNKNOWN: Self = Self(0);

    /// Check if this is the unknown sentinel.
    #[must_use]
    pub const fn is_unknown(self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for PersonId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identifier of a relationship in the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RelationshipId(pub u64);

// =============================================================================
// GENDER
// =============================================================================

/// Recorded gender of a person.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "camelCase")]
pub enum Gender {
    Male,
    Female,
    Intersex,
    #[default]
    Unknown,
}

impl Gender {
    /// Display string handed to the render layer.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Intersex => "intersex",
            Gender::Unknown => "unknown",
        }
    }
}

// =============================================================================
// NAMES
// =============================================================================

/// Kind of a recorded name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NameType {
    BirthName,
    MarriedName,
    AlsoKnownAs,
    Nickname,
}

/// One recorded name of a person.
///
/// A name may carry several full-text forms (e.g. transliterations); the
/// first non-blank form is the one displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Name {
    #[serde(default)]
    pub name_type: Option<NameType>,
    /// BCP 47 language tag of this name.
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub preferred: bool,
    pub forms: Vec<String>,
}

impl Name {
    /// Create a name with a single full-text form.
    #[must_use]
    pub fn new(full_text: impl Into<String>) -> Self {
        Self {
            name_type: None,
            lang: None,
            preferred: false,
            forms: vec![full_text.into()],
        }
    }

    /// Set the language tag.
    #[must_use]
    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    /// Mark this name as preferred.
    #[must_use]
    pub fn preferred(mut self) -> Self {
        self.preferred = true;
        self
    }

    /// First non-blank full-text form.
    #[must_use]
    pub fn display_form(&self) -> Option<&str> {
        self.forms
            .iter()
            .map(|form| form.trim())
            .find(|form| !form.is_empty())
    }

    fn matches_lang(&self, lang: &str) -> bool {
        self.lang
            .as_deref()
            .is_some_and(|own| own.eq_ignore_ascii_case(lang))
    }
}

// =============================================================================
// FACTS
// =============================================================================

/// Kind of a fact attached to a person or relationship.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FactType {
    Birth,
    Christening,
    Death,
    Burial,
    Marriage,
    Divorce,
    /// Precomputed generation number (value holds the integer).
    Generation,
    /// Explicit living marker (value `"false"` marks a deceased person).
    Living,
    /// Recorded age in years (value holds the integer).
    Age,
    Custom(String),
}

/// A dated or valued fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fact {
    pub fact_type: FactType,
    /// Formal date string (`+1901-04-12`, `+1901`, `12 APR 1901`).
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

impl Fact {
    /// Create an undated fact without value.
    #[must_use]
    pub fn new(fact_type: FactType) -> Self {
        Self {
            fact_type,
            date: None,
            value: None,
        }
    }

    /// Attach a date.
    #[must_use]
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    /// Attach a value.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

// =============================================================================
// PERSON
// =============================================================================

/// Sentinel display name for persons without any usable name.
pub const UNKNOWN_NAME: &str = "?";

/// A person record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: PersonId,
    #[serde(default)]
    pub names: Vec<Name>,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub facts: Vec<Fact>,
}

impl Person {
    /// Create a person without names or facts.
    #[must_use]
    pub fn new(id: PersonId) -> Self {
        Self {
            id,
            names: Vec::new(),
            gender: Gender::Unknown,
            facts: Vec::new(),
        }
    }

    /// The synthetic placeholder for a referenced but missing person.
    #[must_use]
    pub fn unknown() -> Self {
        Self::new(PersonId::UNKNOWN)
    }

    /// Append a name.
    #[must_use]
    pub fn with_name(mut self, name: Name) -> Self {
        self.names.push(name);
        self
    }

    /// Set the gender.
    #[must_use]
    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = gender;
        self
    }

    /// Append a fact.
    #[must_use]
    pub fn with_fact(mut self, fact: Fact) -> Self {
        self.facts.push(fact);
        self
    }

    /// First fact of the given type.
    #[must_use]
    pub fn fact(&self, fact_type: &FactType) -> Option<&Fact> {
        self.facts.iter().find(|fact| &fact.fact_type == fact_type)
    }

    /// Generation number recorded in a Generation fact, if any.
    #[must_use]
    pub fn generation(&self) -> Option<i32> {
        self.fact(&FactType::Generation)?
            .value
            .as_deref()?
            .trim()
            .parse()
            .ok()
    }

    /// True unless a Death fact or an explicit living=false marker exists.
    #[must_use]
    pub fn is_living(&self) -> bool {
        if self.fact(&FactType::Death).is_some() {
            return false;
        }
        match self
            .fact(&FactType::Living)
            .and_then(|fact| fact.value.as_deref())
        {
            Some(marker) => !matches!(
                marker.trim().to_ascii_lowercase().as_str(),
                "false" | "no" | "n" | "0"
            ),
            None => true,
        }
    }

    /// Birth date string, if recorded.
    #[must_use]
    pub fn birth_date(&self) -> Option<&str> {
        self.fact(&FactType::Birth)?.date.as_deref()
    }

    /// Death date string, if recorded.
    #[must_use]
    pub fn death_date(&self) -> Option<&str> {
        self.fact(&FactType::Death)?.date.as_deref()
    }

    /// Resolve the display name.
    ///
    /// Order: preferred name in `lang`, any name in `lang`, first name with a
    /// usable form, then [`UNKNOWN_NAME`].
    #[must_use]
    pub fn full_name(&self, lang: Option<&str>) -> String {
        let usable = || self.names.iter().filter(|name| name.display_form().is_some());

        let resolved = lang
            .and_then(|lang| {
                usable()
                    .find(|name| name.preferred && name.matches_lang(lang))
                    .or_else(|| usable().find(|name| name.matches_lang(lang)))
            })
            .or_else(|| usable().next())
            .and_then(Name::display_form);

        resolved.unwrap_or(UNKNOWN_NAME).to_string()
    }
}

// =============================================================================
// RELATIONSHIP
// =============================================================================

/// Relationship kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationshipType {
    /// Partners; direction carries no meaning.
    Couple,
    /// `person1` is the parent, `person2` the child.
    ParentChild,
    Other,
}

impl RelationshipType {
    /// Stable tag used as a storage key component.
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            RelationshipType::Couple => 0,
            RelationshipType::ParentChild => 1,
            RelationshipType::Other => 2,
        }
    }
}

/// A typed edge between two persons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: RelationshipId,
    #[serde(rename = "type")]
    pub rel_type: RelationshipType,
    pub person1: PersonId,
    pub person2: PersonId,
    #[serde(default)]
    pub facts: Vec<Fact>,
}

impl Relationship {
    /// Create a relationship of any type.
    #[must_use]
    pub fn new(
        id: RelationshipId,
        rel_type: RelationshipType,
        person1: PersonId,
        person2: PersonId,
    ) -> Self {
        Self {
            id,
            rel_type,
            person1,
            person2,
            facts: Vec::new(),
        }
    }

    /// Create a couple relationship.
    #[must_use]
    pub fn couple(id: u64, a: u64, b: u64) -> Self {
        Self::new(
            RelationshipId(id),
            RelationshipType::Couple,
            PersonId(a),
            PersonId(b),
        )
    }

    /// Create a parent-child relationship.
    #[must_use]
    pub fn parent_child(id: u64, parent: u64, child: u64) -> Self {
        Self::new(
            RelationshipId(id),
            RelationshipType::ParentChild,
            PersonId(parent),
            PersonId(child),
        )
    }

    /// Append a fact.
    #[must_use]
    pub fn with_fact(mut self, fact: Fact) -> Self {
        self.facts.push(fact);
        self
    }

    /// Check if the person takes part in this relationship.
    #[must_use]
    pub fn involves(&self, person: PersonId) -> bool {
        self.person1 == person || self.person2 == person
    }

    /// The other participant, if `person` takes part.
    #[must_use]
    pub fn partner_of(&self, person: PersonId) -> Option<PersonId> {
        if self.person1 == person {
            Some(self.person2)
        } else if self.person2 == person {
            Some(self.person1)
        } else {
            None
        }
    }

    /// Date of the first Marriage fact.
    #[must_use]
    pub fn marriage_date(&self) -> Option<&str> {
        self.facts
            .iter()
            .find(|fact| fact.fact_type == FactType::Marriage)
            .and_then(|fact| fact.date.as_deref())
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Kindred engine.
///
/// Data inconsistencies (conflicting generations, dangling references) are
/// not errors: they are logged and processing continues.
#[derive(Debug, Error)]
pub enum KindredError {
    /// The dataset contains no persons.
    #[error("Dataset is empty")]
    EmptyDataset,

    /// A person required as an entry point does not exist.
    #[error("Person not found: {0}")]
    PersonNotFound(PersonId),

    /// A dataset document failed validation.
    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// An I/O or storage error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================
