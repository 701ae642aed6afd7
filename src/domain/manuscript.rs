use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{require_canonical, require_non_empty, require_source, Provenance, Validate};
use crate::error::EntityError;
use crate::timestamp::parse_canonical;

/// `{manuscript_id}/{created_timestamp}`, or the literal `NotAcceptable` form
/// when the version never entered a stage
pub fn derive_version_id(manuscript_id: &str, created_timestamp: Option<&str>) -> String {
    match created_timestamp {
        Some(created) if !created.is_empty() => format!("{manuscript_id}/{created}"),
        _ => format!("NotAcceptable {manuscript_id}/None"),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverallStage {
    #[serde(rename = "Initial Submission")]
    InitialSubmission,
    #[serde(rename = "Full Submission")]
    FullSubmission,
}

impl OverallStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverallStage::InitialSubmission => "Initial Submission",
            OverallStage::FullSubmission => "Full Submission",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManuscriptRecord {
    pub provenance: Provenance,
    pub manuscript_id: String,
    pub long_manuscript_identifier: String,
    pub modified_timestamp: String,
    pub country: Option<String>,
    pub doi: Option<String>,
}

impl Validate for ManuscriptRecord {
    fn validate(&self) -> Result<(), EntityError> {
        require_source(&self.provenance)?;
        require_non_empty(&self.manuscript_id, EntityError::MissingManuscriptId)?;
        require_canonical("modified_timestamp", Some(&self.modified_timestamp))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VersionStage {
    pub stage_timestamp: Option<String>,
    pub stage_name: Option<String>,
    pub person_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VersionAuthor {
    pub person_id: Option<String>,
    pub sequence: Option<i64>,
    pub is_corresponding_author: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VersionReviewer {
    pub person_id: Option<String>,
    pub sequence: Option<i64>,
    pub started_timestamp: Option<String>,
    pub due_timestamp: Option<String>,
    pub next_chase_timestamp: Option<String>,
    pub received_timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VersionReviewingEditor {
    pub person_id: Option<String>,
    pub assigned_timestamp: Option<String>,
    pub due_timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VersionSeniorEditor {
    pub person_id: Option<String>,
    pub assigned_timestamp: Option<String>,
}

/// Suggested reviewer, reviewing editor or senior editor
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VersionPotentialPerson {
    pub person_id: Option<String>,
    pub suggested_to_include: Option<bool>,
    pub suggested_to_exclude: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VersionAuthorFunding {
    pub author_person_id: Option<String>,
    pub sequence: Option<i64>,
    pub funding_title: Option<String>,
    pub grant_reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VersionSubjectArea {
    pub subject_area_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VersionResearchOrganism {
    pub research_organism_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VersionKeyword {
    pub keyword: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VersionEmail {
    pub from_email: Option<String>,
    pub to_email: Option<String>,
    pub cc_email: Option<String>,
    pub bcc_email: Option<String>,
    pub email_timestamp: Option<String>,
    pub email_status: Option<String>,
    pub subject: Option<String>,
    pub from_person_id: Option<String>,
    pub to_person_id: Option<String>,
    pub triggered_by_person_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManuscriptVersionRecord {
    pub provenance: Provenance,
    pub created_timestamp: Option<String>,
    pub modified_timestamp: String,
    pub manuscript_id: String,
    pub long_manuscript_identifier: String,
    pub full_manuscript_type: Option<String>,
    pub manuscript_type: Option<String>,
    pub version_id: String,
    pub manuscript_title: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub overall_stage: OverallStage,
    pub decision: Option<String>,
    pub decision_timestamp: Option<String>,
    pub stages: Vec<VersionStage>,
    pub authors: Vec<VersionAuthor>,
    pub reviewers: Vec<VersionReviewer>,
    pub reviewing_editors: Vec<VersionReviewingEditor>,
    pub senior_editors: Vec<VersionSeniorEditor>,
    pub potential_reviewers: Vec<VersionPotentialPerson>,
    pub potential_reviewing_editors: Vec<VersionPotentialPerson>,
    pub potential_senior_editors: Vec<VersionPotentialPerson>,
    pub author_funding: Vec<VersionAuthorFunding>,
    pub subject_areas: Vec<VersionSubjectArea>,
    pub research_organisms: Vec<VersionResearchOrganism>,
    pub keywords: Vec<VersionKeyword>,
    pub emails: Vec<VersionEmail>,
}

impl Validate for ManuscriptVersionRecord {
    fn validate(&self) -> Result<(), EntityError> {
        require_source(&self.provenance)?;
        require_non_empty(&self.manuscript_id, EntityError::MissingManuscriptId)?;
        require_canonical("created_timestamp", self.created_timestamp.as_deref())?;
        require_canonical("modified_timestamp", Some(&self.modified_timestamp))?;
        require_canonical("decision_timestamp", self.decision_timestamp.as_deref())?;
        let expected = derive_version_id(&self.manuscript_id, self.created_timestamp.as_deref());
        if self.version_id != expected {
            return Err(EntityError::InconsistentVersionId {
                version_id: self.version_id.clone(),
                expected,
            });
        }
        Ok(())
    }
}

entity!(
    /// The one manuscript-level record per manuscript document
    Manuscript,
    ManuscriptRecord
);

impl Manuscript {
    pub fn manuscript_id(&self) -> &str {
        &self.0.manuscript_id
    }

    pub fn modified_timestamp(&self) -> Option<DateTime<Utc>> {
        parse_canonical(&self.0.modified_timestamp)
    }
}

entity!(ManuscriptVersion, ManuscriptVersionRecord);

impl ManuscriptVersion {
    pub fn manuscript_id(&self) -> &str {
        &self.0.manuscript_id
    }

    pub fn version_id(&self) -> &str {
        &self.0.version_id
    }

    pub fn created_timestamp(&self) -> Option<DateTime<Utc>> {
        self.0.created_timestamp.as_deref().and_then(parse_canonical)
    }

    pub fn modified_timestamp(&self) -> Option<DateTime<Utc>> {
        parse_canonical(&self.0.modified_timestamp)
    }
}
