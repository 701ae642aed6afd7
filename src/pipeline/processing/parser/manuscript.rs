use std::path::Path;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::constants::INITIAL_SUBMISSION_TYPE_PREFIX;
use crate::domain::manuscript::{
    VersionAuthor, VersionAuthorFunding, VersionEmail, VersionKeyword, VersionPotentialPerson,
    VersionResearchOrganism, VersionReviewer, VersionReviewingEditor, VersionSeniorEditor,
    VersionStage, VersionSubjectArea,
};
use crate::domain::person::{PersonAddress, PersonMembership, PersonRole};
use crate::domain::{
    derive_version_id, Manuscript, ManuscriptRecord, ManuscriptVersion, ManuscriptVersionRecord,
    OverallStage, Person, PersonRecord, Provenance,
};
use crate::error::{TimestampFormatError, TransformError};
use crate::timestamp::{to_iso_string, TimestampNormalizer};
use crate::xml::{extract_list, get_and_decode_xml_child_text, try_extract_list, Element};

static MANUSCRIPT_NUMBER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^.*\D-(\d{3,})\D?.*$").unwrap());

/// Everything extracted from one manuscript document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedManuscriptDocument {
    pub provenance: Provenance,
    pub persons: Vec<Person>,
    pub manuscript: Manuscript,
    pub versions: Vec<ManuscriptVersion>,
}

/// Short manuscript id from a submission code such as `01-02-2018-RA-eLife-12345`.
/// Codes without a numeric suffix are returned whole.
pub fn manuscript_id_from(manuscript_number: &str) -> Result<String, TransformError> {
    debug!("manuscript_number: {}", manuscript_number);
    if manuscript_number.trim().is_empty() {
        return Err(TransformError::BlankManuscriptNumber);
    }
    match MANUSCRIPT_NUMBER_PATTERN
        .captures(manuscript_number)
        .and_then(|captures| captures.get(1))
    {
        Some(id) => Ok(id.as_str().to_string()),
        None => {
            warn!(
                "unrecognised manuscript-number format: {} (falling back to full manuscript number)",
                manuscript_number
            );
            Ok(manuscript_number.to_string())
        }
    }
}

/// Member filename without directory or extension
pub fn filename_to_manuscript_number(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn overall_stage_and_manuscript_type(full_manuscript_type: &str) -> (OverallStage, String) {
    match full_manuscript_type.strip_prefix(INITIAL_SUBMISSION_TYPE_PREFIX) {
        Some(short_type) => (OverallStage::InitialSubmission, short_type.trim().to_string()),
        None => (
            OverallStage::FullSubmission,
            full_manuscript_type.to_string(),
        ),
    }
}

pub fn to_bool(value: Option<&str>) -> Option<bool> {
    match value {
        Some("true") => Some(true),
        Some("false") => Some(false),
        _ => None,
    }
}

pub fn parse_yes_no(value: Option<&str>) -> Option<bool> {
    let value = value?.to_lowercase();
    match value.as_str() {
        "yes" => Some(true),
        "no" => Some(false),
        _ => None,
    }
}

/// Blank is absent; anything non-numeric is logged and dropped
pub fn to_int(value: Option<&str>) -> Option<i64> {
    let value = value?.trim();
    if value.is_empty() {
        return None;
    }
    match value.parse::<i64>() {
        Ok(number) => Some(number),
        Err(_) => {
            warn!("ignoring non-numeric sequence value: {:?}", value);
            None
        }
    }
}

fn text(node: &Element, path: &str) -> Option<String> {
    get_and_decode_xml_child_text(node, path, None)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

/// Turns a manuscript document (`<xml>` root) into Person, Manuscript and
/// ManuscriptVersion records.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManuscriptTransformer {
    timestamps: TimestampNormalizer,
}

impl ManuscriptTransformer {
    pub fn new(timestamps: TimestampNormalizer) -> Self {
        Self { timestamps }
    }

    pub fn parse_document(
        &self,
        root: &Element,
        modified_timestamp: &DateTime<Utc>,
        provenance: &Provenance,
    ) -> Result<ParsedManuscriptDocument, TransformError> {
        let modified = to_iso_string(modified_timestamp);
        let source_filename = provenance.source_filename.as_str();

        let versions = try_extract_list(root, "manuscript/version", |node| {
            self.version(node, &modified, provenance)
        })?;

        let (manuscript_id, long_manuscript_identifier) = match versions.first() {
            Some(first) => (
                first.manuscript_id().to_string(),
                first.record().long_manuscript_identifier.clone(),
            ),
            None => {
                let number = filename_to_manuscript_number(source_filename);
                (manuscript_id_from(&number)?, number)
            }
        };
        for version in versions.iter().skip(1) {
            if version.manuscript_id() != manuscript_id {
                warn!(
                    "{}: version manuscript id {} differs from {}",
                    source_filename,
                    version.manuscript_id(),
                    manuscript_id
                );
            }
        }

        let manuscript_node = root.find("manuscript");
        let manuscript = Manuscript::new(ManuscriptRecord {
            provenance: provenance.clone(),
            manuscript_id,
            long_manuscript_identifier,
            modified_timestamp: modified.clone(),
            country: manuscript_node.and_then(|node| text(node, "country")),
            doi: manuscript_node
                .and_then(|node| text(node, "production-data/production-data-doi")),
        })?;

        let persons = try_extract_list(root, "people/person", |node| {
            self.person(node, &modified, provenance)
        })?;

        debug!(
            "{}: {} persons, {} versions",
            source_filename,
            persons.len(),
            versions.len()
        );

        Ok(ParsedManuscriptDocument {
            provenance: provenance.clone(),
            persons,
            manuscript,
            versions,
        })
    }

    fn iso(&self, value: Option<String>) -> Result<Option<String>, TimestampFormatError> {
        self.timestamps.format_to_iso_timestamp(value.as_deref())
    }

    fn person(
        &self,
        node: &Element,
        modified: &str,
        provenance: &Provenance,
    ) -> Result<Person, TransformError> {
        let person_id = text(node, "person-id");
        self.person_record(node, person_id.clone(), modified, provenance)
            .and_then(|record| Person::new(record).map_err(TransformError::from))
            .map_err(|source| TransformError::Person {
                person_id,
                source: Box::new(source),
            })
    }

    fn person_record(
        &self,
        node: &Element,
        person_id: Option<String>,
        modified: &str,
        provenance: &Provenance,
    ) -> Result<PersonRecord, TransformError> {
        let profile_modified =
            non_blank(text(node, "profile-modify-date")).unwrap_or_else(|| modified.to_string());
        Ok(PersonRecord {
            person_id: person_id.unwrap_or_default(),
            provenance: provenance.clone(),
            modified_timestamp: self.iso(Some(profile_modified))?,
            title: text(node, "title"),
            first_name: text(node, "first-name"),
            middle_name: text(node, "middle-name"),
            last_name: text(node, "last-name"),
            institution: text(node, "institution"),
            email: text(node, "email"),
            secondary_email: text(node, "secondary_email"),
            external_references: extract_list(node, "memberships/membership", |membership| {
                PersonMembership {
                    reference_type: text(membership, "member-type"),
                    reference_value: text(membership, "member-id"),
                }
            }),
            roles: extract_list(node, "roles/role", |role| PersonRole {
                role_name: text(role, "role-type"),
            }),
            addresses: try_extract_list(node, "addresses/address", |address| {
                self.person_address(address)
            })?,
        })
    }

    fn person_address(&self, node: &Element) -> Result<PersonAddress, TimestampFormatError> {
        Ok(PersonAddress {
            address_type: text(node, "address-type"),
            country: text(node, "address-country"),
            area: text(node, "address-state-province"),
            city: text(node, "address-city"),
            postal_code: text(node, "address-zip-postal-code"),
            department: text(node, "address-department"),
            address_line_1: text(node, "address-street-address-1"),
            address_line_2: text(node, "address-street-address-2"),
            start_timestamp: self.iso(text(node, "address-start-date"))?,
            end_timestamp: self.iso(text(node, "address-end-date"))?,
        })
    }

    fn manuscript_id_and_number(
        &self,
        node: &Element,
        source_filename: &str,
    ) -> Result<(String, String), TransformError> {
        let number = text(node, "manuscript-number").unwrap_or_default();
        if !number.trim().is_empty() {
            return Ok((manuscript_id_from(&number)?, number));
        }
        let number = filename_to_manuscript_number(source_filename);
        debug!(
            "blank manuscript-number, using filename {}: {}",
            source_filename, number
        );
        Ok((manuscript_id_from(&number)?, number))
    }

    fn version(
        &self,
        node: &Element,
        modified: &str,
        provenance: &Provenance,
    ) -> Result<ManuscriptVersion, TransformError> {
        let stages = try_extract_list(node, "history/stage", |stage| self.stage(stage))?;
        let created_timestamp = stages
            .first()
            .and_then(|stage| stage.stage_timestamp.clone());

        let (manuscript_id, long_manuscript_identifier) =
            self.manuscript_id_and_number(node, &provenance.source_filename)?;

        let full_manuscript_type = text(node, "manuscript-type");
        let (overall_stage, manuscript_type) = match full_manuscript_type.as_deref() {
            Some(full) => {
                let (stage, short) = overall_stage_and_manuscript_type(full);
                (stage, Some(short))
            }
            None => (OverallStage::FullSubmission, None),
        };

        let decision_timestamp = match non_blank(text(node, "decision-date")) {
            Some(value) => self.iso(Some(value))?,
            None => None,
        };

        let mut reviewers =
            try_extract_list(node, "referees/referee", |n| self.reviewer(n, "referee-"))?;
        reviewers.extend(try_extract_list(node, "reviewers/reviewer", |n| {
            self.reviewer(n, "reviewer-")
        })?);

        let mut reviewing_editors =
            try_extract_list(node, "editors/editor", |n| self.reviewing_editor(n, "editor-"))?;
        reviewing_editors.extend(try_extract_list(
            node,
            "reviewing-editors/reviewing-editor",
            |n| self.reviewing_editor(n, "reviewing-editor-"),
        )?);

        let mut potential_reviewers = extract_list(
            node,
            "potential-referees/potential-referee",
            |n| potential_person(n, "potential-referee-"),
        );
        potential_reviewers.extend(extract_list(
            node,
            "potential-reviewers/potential-reviewer",
            |n| potential_person(n, "potential-reviewer-"),
        ));

        let version_id = derive_version_id(&manuscript_id, created_timestamp.as_deref());

        let record = ManuscriptVersionRecord {
            provenance: provenance.clone(),
            created_timestamp,
            modified_timestamp: modified.to_string(),
            manuscript_id,
            long_manuscript_identifier,
            full_manuscript_type,
            manuscript_type,
            version_id,
            manuscript_title: text(node, "title"),
            abstract_text: text(node, "abstract"),
            overall_stage,
            decision: text(node, "decision"),
            decision_timestamp,
            stages,
            authors: extract_list(node, "authors/author", |author| VersionAuthor {
                person_id: text(author, "author-person-id"),
                sequence: to_int(text(author, "author-seq").as_deref()),
                is_corresponding_author: to_bool(text(author, "is-corr").as_deref()),
            }),
            reviewers,
            reviewing_editors,
            senior_editors: try_extract_list(node, "senior-editors/senior-editor", |n| {
                self.senior_editor(n)
            })?,
            potential_reviewers,
            potential_reviewing_editors: extract_list(
                node,
                "potential-reviewing-editors/potential-reviewing-editor",
                |n| potential_person(n, "potential-reviewing-editor-"),
            ),
            potential_senior_editors: extract_list(
                node,
                "potential-senior-editors/potential-senior-editor",
                |n| potential_person(n, "potential-senior-editor-"),
            ),
            author_funding: extract_list(node, "author-funding/author-funding", |funding| {
                VersionAuthorFunding {
                    author_person_id: text(funding, "author-person-id"),
                    sequence: to_int(text(funding, "funding-seq").as_deref()),
                    funding_title: text(funding, "funding-title"),
                    grant_reference: text(funding, "grant-reference-number"),
                }
            }),
            subject_areas: extract_list(node, "themes/theme", |theme| VersionSubjectArea {
                subject_area_name: text(theme, "theme"),
            }),
            research_organisms: extract_list(node, "subject-areas/subject-area", |area| {
                VersionResearchOrganism {
                    research_organism_name: text(area, "subject-area"),
                }
            }),
            keywords: extract_list(node, "keywords/keywords", |keyword| VersionKeyword {
                keyword: text(keyword, "word"),
            }),
            emails: try_extract_list(node, "emails/email", |email| self.email(email))?,
        };
        Ok(ManuscriptVersion::new(record)?)
    }

    fn stage(&self, node: &Element) -> Result<VersionStage, TimestampFormatError> {
        Ok(VersionStage {
            stage_timestamp: self.iso(text(node, "start-date"))?,
            stage_name: text(node, "stage-name"),
            person_id: text(node, "stage-affective-person-id"),
        })
    }

    fn reviewer(&self, node: &Element, prefix: &str) -> Result<VersionReviewer, TimestampFormatError> {
        let field = |name: &str| text(node, &format!("{prefix}{name}"));
        Ok(VersionReviewer {
            person_id: field("person-id"),
            sequence: to_int(field("sequence").as_deref()),
            started_timestamp: self.iso(field("started-date"))?,
            due_timestamp: self.iso(field("due-date"))?,
            next_chase_timestamp: self.iso(field("next-chase-date"))?,
            received_timestamp: self.iso(field("received-date"))?,
        })
    }

    fn reviewing_editor(
        &self,
        node: &Element,
        prefix: &str,
    ) -> Result<VersionReviewingEditor, TimestampFormatError> {
        let field = |name: &str| text(node, &format!("{prefix}{name}"));
        Ok(VersionReviewingEditor {
            person_id: field("person-id"),
            assigned_timestamp: self.iso(field("assigned-date"))?,
            due_timestamp: self.iso(field("decision-due-date"))?,
        })
    }

    fn senior_editor(&self, node: &Element) -> Result<VersionSeniorEditor, TimestampFormatError> {
        Ok(VersionSeniorEditor {
            person_id: text(node, "senior-editor-person-id"),
            assigned_timestamp: self.iso(text(node, "senior-editor-assigned-date"))?,
        })
    }

    fn email(&self, node: &Element) -> Result<VersionEmail, TimestampFormatError> {
        Ok(VersionEmail {
            from_email: text(node, "email-from"),
            to_email: text(node, "email-to"),
            cc_email: text(node, "email-cc"),
            bcc_email: text(node, "email-bcc"),
            email_timestamp: self.iso(text(node, "email-date"))?,
            email_status: text(node, "email-draft"),
            subject: text(node, "email-subject"),
            from_person_id: text(node, "email-sender-person-id"),
            to_person_id: text(node, "email-recipient-person-id"),
            triggered_by_person_id: text(node, "email-triggered-by-person-id"),
        })
    }
}

fn potential_person(node: &Element, prefix: &str) -> VersionPotentialPerson {
    let field = |name: &str| text(node, &format!("{prefix}{name}"));
    VersionPotentialPerson {
        person_id: field("person-id"),
        suggested_to_include: parse_yes_no(field("suggested-to-include").as_deref()),
        suggested_to_exclude: parse_yes_no(field("suggested-to-exclude").as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EntityError;

    const MODIFIED: &str = "2018-02-01T00:00:00Z";
    const FILENAME: &str = "archive.zip/01-02-2018-RA-eLife-12345.xml";

    fn modified() -> DateTime<Utc> {
        crate::timestamp::parse_canonical(MODIFIED).unwrap()
    }

    fn provenance() -> Provenance {
        Provenance::new(FILENAME, Some("2018-03-01T00:00:00Z".to_string()))
    }

    fn child(name: &str, value: &str) -> Element {
        Element::new(name).with_text(value)
    }

    fn version_node() -> Element {
        Element::new("version")
            .with_child(child("manuscript-number", "01-02-2018-RA-eLife-12345"))
            .with_child(child("manuscript-type", "Initial Submission: Research Article"))
            .with_child(
                Element::new("history")
                    .with_child(
                        Element::new("stage")
                            .with_child(child("start-date", "2018-01-02T03:04:05Z"))
                            .with_child(child("stage-name", "Preliminary Manuscript Data Submitted")),
                    )
                    .with_child(
                        Element::new("stage")
                            .with_child(child("start-date", "2018-01-05T03:04:05Z")),
                    ),
            )
    }

    fn parse(root: &Element) -> ParsedManuscriptDocument {
        ManuscriptTransformer::default()
            .parse_document(root, &modified(), &provenance())
            .unwrap()
    }

    #[test]
    fn test_manuscript_id_from_submission_code() {
        assert_eq!(manuscript_id_from("01-02-2018-RA-eLife-12345").unwrap(), "12345");
        assert_eq!(manuscript_id_from("01-02-2018-RA-eLife-12345.R1").unwrap(), "12345");
    }

    #[test]
    fn test_manuscript_id_falls_back_to_full_code() {
        assert_eq!(manuscript_id_from("other").unwrap(), "other");
    }

    #[test]
    fn test_blank_manuscript_number_is_an_error() {
        assert!(matches!(
            manuscript_id_from("  "),
            Err(TransformError::BlankManuscriptNumber)
        ));
    }

    #[test]
    fn test_filename_to_manuscript_number() {
        assert_eq!(
            filename_to_manuscript_number("archive.zip/dir/01-02-2018-RA-eLife-12345.xml"),
            "01-02-2018-RA-eLife-12345"
        );
    }

    #[test]
    fn test_overall_stage_and_manuscript_type() {
        assert_eq!(
            overall_stage_and_manuscript_type("Initial Submission: Research Article"),
            (OverallStage::InitialSubmission, "Research Article".to_string())
        );
        assert_eq!(
            overall_stage_and_manuscript_type("Research Article"),
            (OverallStage::FullSubmission, "Research Article".to_string())
        );
    }

    #[test]
    fn test_bool_parsing() {
        assert_eq!(to_bool(Some("true")), Some(true));
        assert_eq!(to_bool(Some("false")), Some(false));
        assert_eq!(to_bool(Some("TRUE")), None);
        assert_eq!(parse_yes_no(Some("Yes")), Some(true));
        assert_eq!(parse_yes_no(Some("NO")), Some(false));
        assert_eq!(parse_yes_no(Some("")), None);
        assert_eq!(parse_yes_no(None), None);
    }

    #[test]
    fn test_to_int() {
        assert_eq!(to_int(Some("3")), Some(3));
        assert_eq!(to_int(Some("")), None);
        assert_eq!(to_int(Some("x")), None);
    }

    #[test]
    fn test_version_created_timestamp_and_id() {
        let root = Element::new("xml").with_child(Element::new("manuscript").with_child(version_node()));
        let document = parse(&root);
        assert_eq!(document.versions.len(), 1);
        let version = document.versions[0].record();
        assert_eq!(version.manuscript_id, "12345");
        assert_eq!(version.created_timestamp.as_deref(), Some("2018-01-02T03:04:05Z"));
        assert_eq!(version.version_id, "12345/2018-01-02T03:04:05Z");
        assert_eq!(version.overall_stage, OverallStage::InitialSubmission);
        assert_eq!(version.manuscript_type.as_deref(), Some("Research Article"));
        assert_eq!(version.modified_timestamp, MODIFIED);
        assert_eq!(document.manuscript.manuscript_id(), "12345");
        assert_eq!(
            document.manuscript.record().long_manuscript_identifier,
            "01-02-2018-RA-eLife-12345"
        );
    }

    #[test]
    fn test_version_without_stages_is_not_acceptable() {
        let root = Element::new("xml").with_child(
            Element::new("manuscript").with_child(
                Element::new("version").with_child(child("manuscript-number", "eLife-12345")),
            ),
        );
        let version = parse(&root).versions[0].record().clone();
        assert_eq!(version.created_timestamp, None);
        assert_eq!(version.version_id, "NotAcceptable 12345/None");
    }

    #[test]
    fn test_blank_version_manuscript_number_uses_filename() {
        let root = Element::new("xml").with_child(
            Element::new("manuscript")
                .with_child(Element::new("version").with_child(child("manuscript-number", ""))),
        );
        let document = parse(&root);
        assert_eq!(document.versions[0].manuscript_id(), "12345");
        assert_eq!(
            document.versions[0].record().long_manuscript_identifier,
            "01-02-2018-RA-eLife-12345"
        );
    }

    #[test]
    fn test_no_versions_derives_manuscript_from_filename() {
        let root = Element::new("xml").with_child(
            Element::new("manuscript").with_child(
                Element::new("production-data").with_child(child("production-data-doi", "10.7554/eLife.12345")),
            ),
        );
        let document = parse(&root);
        assert!(document.versions.is_empty());
        assert_eq!(document.manuscript.manuscript_id(), "12345");
        assert_eq!(
            document.manuscript.record().doi.as_deref(),
            Some("10.7554/eLife.12345")
        );
    }

    #[test]
    fn test_decision_timestamp_only_when_present() {
        let root = Element::new("xml").with_child(
            Element::new("manuscript").with_child(
                version_node()
                    .with_child(child("decision", "Accept Full Submission"))
                    .with_child(child("decision-date", "2018-01-02 03:04:05")),
            ),
        );
        let version = parse(&root).versions[0].record().clone();
        assert_eq!(version.decision.as_deref(), Some("Accept Full Submission"));
        assert_eq!(version.decision_timestamp.as_deref(), Some("2018-01-02T08:04:05Z"));

        let root = Element::new("xml")
            .with_child(Element::new("manuscript").with_child(version_node().with_child(child("decision-date", ""))));
        assert_eq!(parse(&root).versions[0].record().decision_timestamp, None);
    }

    #[test]
    fn test_reviewers_from_both_vocabularies() {
        let root = Element::new("xml").with_child(
            Element::new("manuscript").with_child(
                version_node()
                    .with_child(Element::new("referees").with_child(
                        Element::new("referee")
                            .with_child(child("referee-person-id", "r1"))
                            .with_child(child("referee-sequence", "1")),
                    ))
                    .with_child(Element::new("reviewers").with_child(
                        Element::new("reviewer")
                            .with_child(child("reviewer-person-id", "r2"))
                            .with_child(child("reviewer-due-date", "2018-01-02T03:04:05Z")),
                    ))
                    .with_child(Element::new("editors").with_child(
                        Element::new("editor").with_child(child("editor-person-id", "e1")),
                    ))
                    .with_child(Element::new("reviewing-editors").with_child(
                        Element::new("reviewing-editor")
                            .with_child(child("reviewing-editor-person-id", "e2")),
                    ))
                    .with_child(Element::new("potential-referees").with_child(
                        Element::new("potential-referee")
                            .with_child(child("potential-referee-person-id", "p1"))
                            .with_child(child("potential-referee-suggested-to-include", "yes")),
                    ))
                    .with_child(Element::new("potential-reviewers").with_child(
                        Element::new("potential-reviewer")
                            .with_child(child("potential-reviewer-person-id", "p2"))
                            .with_child(child("potential-reviewer-suggested-to-exclude", "No")),
                    )),
            ),
        );
        let version = parse(&root).versions[0].record().clone();
        let reviewer_ids: Vec<_> = version.reviewers.iter().map(|r| r.person_id.clone()).collect();
        assert_eq!(reviewer_ids, vec![Some("r1".to_string()), Some("r2".to_string())]);
        assert_eq!(version.reviewers[0].sequence, Some(1));
        assert_eq!(
            version.reviewers[1].due_timestamp.as_deref(),
            Some("2018-01-02T03:04:05Z")
        );
        let editor_ids: Vec<_> = version
            .reviewing_editors
            .iter()
            .map(|e| e.person_id.clone())
            .collect();
        assert_eq!(editor_ids, vec![Some("e1".to_string()), Some("e2".to_string())]);
        assert_eq!(version.potential_reviewers.len(), 2);
        assert_eq!(version.potential_reviewers[0].suggested_to_include, Some(true));
        assert_eq!(version.potential_reviewers[1].suggested_to_exclude, Some(false));
    }

    #[test]
    fn test_author_and_lists() {
        let root = Element::new("xml").with_child(
            Element::new("manuscript").with_child(
                version_node()
                    .with_child(Element::new("authors").with_child(
                        Element::new("author")
                            .with_child(child("author-person-id", "a1"))
                            .with_child(child("author-seq", "2"))
                            .with_child(child("is-corr", "true")),
                    ))
                    .with_child(Element::new("themes").with_child(
                        Element::new("theme").with_child(child("theme", "Neuroscience")),
                    ))
                    .with_child(Element::new("keywords").with_child(
                        Element::new("keywords").with_child(child("word", "mouse &amp; rat")),
                    ))
                    .with_child(Element::new("emails").with_child(
                        Element::new("email")
                            .with_child(child("email-subject", "Decision"))
                            .with_child(child("email-date", "2018-01-02 03:04:05")),
                    )),
            ),
        );
        let version = parse(&root).versions[0].record().clone();
        assert_eq!(
            version.authors,
            vec![VersionAuthor {
                person_id: Some("a1".to_string()),
                sequence: Some(2),
                is_corresponding_author: Some(true),
            }]
        );
        assert_eq!(
            version.subject_areas[0].subject_area_name.as_deref(),
            Some("Neuroscience")
        );
        assert_eq!(version.keywords[0].keyword.as_deref(), Some("mouse & rat"));
        assert_eq!(
            version.emails[0].email_timestamp.as_deref(),
            Some("2018-01-02T08:04:05Z")
        );
    }

    #[test]
    fn test_person_uses_profile_modify_date_when_present() {
        let root = Element::new("xml").with_child(
            Element::new("people")
                .with_child(
                    Element::new("person")
                        .with_child(child("person-id", "p1"))
                        .with_child(child("profile-modify-date", "2018-01-02 03:04:05"))
                        .with_child(Element::new("roles").with_child(
                            Element::new("role").with_child(child("role-type", "Author")),
                        )),
                )
                .with_child(Element::new("person").with_child(child("person-id", "p2"))),
        );
        let document = parse(&root);
        assert_eq!(document.persons.len(), 2);
        let first = document.persons[0].record();
        assert_eq!(first.modified_timestamp.as_deref(), Some("2018-01-02T08:04:05Z"));
        assert_eq!(first.roles[0].role_name.as_deref(), Some("Author"));
        assert_eq!(
            document.persons[1].record().modified_timestamp.as_deref(),
            Some(MODIFIED)
        );
    }

    #[test]
    fn test_person_failure_names_the_person() {
        let root = Element::new("xml").with_child(
            Element::new("people").with_child(
                Element::new("person")
                    .with_child(child("person-id", "p1"))
                    .with_child(child("profile-modify-date", "not a date")),
            ),
        );
        let err = ManuscriptTransformer::default()
            .parse_document(&root, &modified(), &provenance())
            .unwrap_err();
        match err {
            TransformError::Person { person_id, .. } => assert_eq!(person_id.as_deref(), Some("p1")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_person_without_id_is_rejected() {
        let root = Element::new("xml")
            .with_child(Element::new("people").with_child(Element::new("person")));
        let err = ManuscriptTransformer::default()
            .parse_document(&root, &modified(), &provenance())
            .unwrap_err();
        match err {
            TransformError::Person { source, .. } => assert!(matches!(
                *source,
                TransformError::Entity(EntityError::MissingPersonId)
            )),
            other => panic!("unexpected error: {other}"),
        }
    }
}
