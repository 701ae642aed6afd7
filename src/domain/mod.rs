//! Typed, immutable records produced by the transformers

use serde::{Deserialize, Serialize};

use crate::error::EntityError;
use crate::timestamp::is_canonical_timestamp;

/// Construction-time checks shared by every record kind
pub trait Validate {
    fn validate(&self) -> Result<(), EntityError>;
}

// Wraps a record struct so it can only be built through `Validate`
macro_rules! entity {
    ($(#[$meta:meta])* $name:ident, $record:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
        #[serde(transparent)]
        pub struct $name($record);

        impl $name {
            pub fn new(record: $record) -> Result<Self, crate::error::EntityError> {
                crate::domain::Validate::validate(&record)?;
                Ok(Self(record))
            }

            pub fn record(&self) -> &$record {
                &self.0
            }

            pub fn into_record(self) -> $record {
                self.0
            }

            pub fn provenance(&self) -> &crate::domain::Provenance {
                &self.0.provenance
            }
        }
    };
}

pub mod manuscript;
pub mod person;
pub mod provenance;

pub use manuscript::{
    derive_version_id, Manuscript, ManuscriptRecord, ManuscriptVersion, ManuscriptVersionRecord,
    OverallStage,
};
pub use person::{
    generate_person_id, is_generated_person_id, Person, PersonRecord, PersonV2, PersonV2Record,
};
pub use provenance::Provenance;

pub(crate) fn require_source(provenance: &Provenance) -> Result<(), EntityError> {
    if provenance.source_filename.trim().is_empty() {
        return Err(EntityError::MissingSourceFilename);
    }
    Ok(())
}

pub(crate) fn require_non_empty(value: &str, error: EntityError) -> Result<(), EntityError> {
    if value.trim().is_empty() {
        return Err(error);
    }
    Ok(())
}

pub(crate) fn require_canonical(field: &'static str, value: Option<&str>) -> Result<(), EntityError> {
    match value {
        Some(value) if !is_canonical_timestamp(value) => Err(EntityError::NonCanonicalTimestamp {
            field,
            value: value.to_string(),
        }),
        _ => Ok(()),
    }
}

/// Record kinds, one output sink each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Person,
    PersonV2,
    Manuscript,
    ManuscriptVersion,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Person,
        EntityKind::PersonV2,
        EntityKind::Manuscript,
        EntityKind::ManuscriptVersion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Person => "person",
            EntityKind::PersonV2 => "person_v2",
            EntityKind::Manuscript => "manuscript",
            EntityKind::ManuscriptVersion => "manuscript_version",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    Person(Person),
    PersonV2(PersonV2),
    Manuscript(Manuscript),
    ManuscriptVersion(ManuscriptVersion),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Person(_) => EntityKind::Person,
            Entity::PersonV2(_) => EntityKind::PersonV2,
            Entity::Manuscript(_) => EntityKind::Manuscript,
            Entity::ManuscriptVersion(_) => EntityKind::ManuscriptVersion,
        }
    }

    pub fn provenance(&self) -> &Provenance {
        match self {
            Entity::Person(person) => person.provenance(),
            Entity::PersonV2(person) => person.provenance(),
            Entity::Manuscript(manuscript) => manuscript.provenance(),
            Entity::ManuscriptVersion(version) => version.provenance(),
        }
    }

    pub fn to_json_value(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            Entity::Person(person) => serde_json::to_value(person),
            Entity::PersonV2(person) => serde_json::to_value(person),
            Entity::Manuscript(manuscript) => serde_json::to_value(manuscript),
            Entity::ManuscriptVersion(version) => serde_json::to_value(version),
        }
    }
}

impl From<Person> for Entity {
    fn from(value: Person) -> Self {
        Entity::Person(value)
    }
}

impl From<PersonV2> for Entity {
    fn from(value: PersonV2) -> Self {
        Entity::PersonV2(value)
    }
}

impl From<Manuscript> for Entity {
    fn from(value: Manuscript) -> Self {
        Entity::Manuscript(value)
    }
}

impl From<ManuscriptVersion> for Entity {
    fn from(value: ManuscriptVersion) -> Self {
        Entity::ManuscriptVersion(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_canonical_accepts_absent_values() {
        assert!(require_canonical("field", None).is_ok());
        assert!(require_canonical("field", Some("2018-01-02T03:04:05Z")).is_ok());
        assert!(require_canonical("field", Some("yesterday")).is_err());
    }

    #[test]
    fn test_blank_source_filename_is_rejected() {
        let provenance = Provenance::new(" ", None);
        assert_eq!(
            require_source(&provenance),
            Err(EntityError::MissingSourceFilename)
        );
    }

    #[test]
    fn test_entity_kind_names() {
        let names: Vec<&str> = EntityKind::ALL.iter().map(EntityKind::as_str).collect();
        assert_eq!(
            names,
            vec!["person", "person_v2", "manuscript", "manuscript_version"]
        );
    }
}
