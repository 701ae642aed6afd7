use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{require_canonical, require_non_empty, require_source, Provenance, Validate};
use crate::constants::GENERATED_PERSON_ID_PREFIX;
use crate::error::EntityError;
use crate::timestamp::parse_canonical;

pub fn generate_person_id(source_filename: &str, node_index: usize) -> String {
    format!("{GENERATED_PERSON_ID_PREFIX}{source_filename}-{node_index}")
}

pub fn is_generated_person_id(person_id: &str) -> bool {
    person_id.starts_with(GENERATED_PERSON_ID_PREFIX)
}

// Person records embedded in manuscript documents

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PersonMembership {
    pub reference_type: Option<String>,
    pub reference_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PersonRole {
    pub role_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PersonAddress {
    pub address_type: Option<String>,
    pub country: Option<String>,
    pub area: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub department: Option<String>,
    pub address_line_1: Option<String>,
    pub address_line_2: Option<String>,
    pub start_timestamp: Option<String>,
    pub end_timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRecord {
    pub person_id: String,
    pub provenance: Provenance,
    pub modified_timestamp: Option<String>,
    pub title: Option<String>,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub institution: Option<String>,
    pub email: Option<String>,
    pub secondary_email: Option<String>,
    pub external_references: Vec<PersonMembership>,
    pub roles: Vec<PersonRole>,
    pub addresses: Vec<PersonAddress>,
}

impl Validate for PersonRecord {
    fn validate(&self) -> Result<(), EntityError> {
        require_source(&self.provenance)?;
        require_non_empty(&self.person_id, EntityError::MissingPersonId)?;
        require_canonical("modified_timestamp", self.modified_timestamp.as_deref())
    }
}

// Person records from flat person documents

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PersonV2Membership {
    pub is_enabled: bool,
    pub reference_type: Option<String>,
    pub reference_value: Option<String>,
    pub start_timestamp: Option<String>,
    pub end_timestamp: Option<String>,
    pub modified_timestamp: Option<String>,
    pub modified_by_person_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PersonV2Address {
    pub is_enabled: bool,
    pub address_type: Option<String>,
    pub country: Option<String>,
    pub area: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub organization: Option<String>,
    pub department: Option<String>,
    pub division: Option<String>,
    pub laboratory: Option<String>,
    pub job_title: Option<String>,
    pub email: Option<String>,
    pub telephone: Option<String>,
    pub address_line_1: Option<String>,
    pub address_line_2: Option<String>,
    pub address_line_3: Option<String>,
    pub start_timestamp: Option<String>,
    pub end_timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PersonV2Organization {
    pub organization_id: Option<String>,
    pub organization_name: Option<String>,
    pub organization_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PersonV2Role {
    pub role_name: Option<String>,
    pub is_enabled: bool,
    pub start_timestamp: Option<String>,
    pub end_timestamp: Option<String>,
    pub modified_timestamp: Option<String>,
    pub modified_by_person_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PersonV2DatesNotAvailable {
    pub start_timestamp: Option<String>,
    pub end_timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonV2Record {
    pub provenance: Provenance,
    pub person_id: String,
    pub modified_timestamp: Option<String>,
    pub status: Option<String>,
    pub title: Option<String>,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub native_name: Option<String>,
    pub institution: Option<String>,
    pub email: Option<String>,
    pub secondary_email: Option<String>,
    pub external_references: Vec<PersonV2Membership>,
    pub addresses: Vec<PersonV2Address>,
    pub organizations: Vec<PersonV2Organization>,
    pub roles: Vec<PersonV2Role>,
    pub dates_not_available: Vec<PersonV2DatesNotAvailable>,
    pub keywords: Vec<String>,
    pub person_tags: Vec<String>,
    pub merged_into_person_ids: Vec<String>,
    pub research_organisms: Vec<String>,
    pub subject_areas: Vec<String>,
}

impl Validate for PersonV2Record {
    fn validate(&self) -> Result<(), EntityError> {
        require_source(&self.provenance)?;
        require_non_empty(&self.person_id, EntityError::MissingPersonId)?;
        require_canonical("modified_timestamp", self.modified_timestamp.as_deref())
    }
}

entity!(
    /// Person referenced by a manuscript document
    Person,
    PersonRecord
);

impl Person {
    pub fn person_id(&self) -> &str {
        &self.0.person_id
    }

    pub fn modified_timestamp(&self) -> Option<DateTime<Utc>> {
        self.0.modified_timestamp.as_deref().and_then(parse_canonical)
    }
}

entity!(
    /// Person from a flat person document; the id may be synthetic
    PersonV2,
    PersonV2Record
);

impl PersonV2 {
    pub fn person_id(&self) -> &str {
        &self.0.person_id
    }

    pub fn has_generated_person_id(&self) -> bool {
        is_generated_person_id(&self.0.person_id)
    }

    pub fn modified_timestamp(&self) -> Option<DateTime<Utc>> {
        self.0.modified_timestamp.as_deref().and_then(parse_canonical)
    }
}
