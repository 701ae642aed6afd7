use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::constants::{
    MISSING_PERSON_ID_EXAMPLE_COUNT, RESEARCH_ORGANISM_LIST_NAME, SUBJECT_AREA_LIST_NAME,
};
use crate::domain::person::{
    PersonV2Address, PersonV2DatesNotAvailable, PersonV2Membership, PersonV2Organization,
    PersonV2Role,
};
use crate::domain::{generate_person_id, PersonV2, PersonV2Record, Provenance};
use crate::error::{TimestampFormatError, TransformError};
use crate::observability::metrics::MetricName;
use crate::timestamp::{to_iso_string, TimestampNormalizer};
use crate::xml::{
    extract_list, get_and_decode_xml_child_text, get_and_decode_xml_text, get_xml_attribute,
    try_extract_list, Element,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPersonDocument {
    pub provenance: Provenance,
    pub persons: Vec<PersonV2>,
}

fn text(node: &Element, path: &str) -> Option<String> {
    get_and_decode_xml_child_text(node, path, None)
}

fn is_active(node: &Element) -> bool {
    get_xml_attribute(node, "active_ind") == "1"
}

fn optional(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

/// Decoded, non-empty text of every node at `path`
fn text_list(node: &Element, path: &str) -> Vec<String> {
    node.find_all(path)
        .into_iter()
        .filter_map(|item| get_and_decode_xml_text(Some(item), None))
        .collect()
}

/// Turns a flat person document (`<persons>` root) into PersonV2 records.
/// Nodes without a person id get a positional synthetic one.
#[derive(Debug, Clone, Copy, Default)]
pub struct PersonTransformer {
    timestamps: TimestampNormalizer,
}

impl PersonTransformer {
    pub fn new(timestamps: TimestampNormalizer) -> Self {
        Self { timestamps }
    }

    pub fn parse_document(
        &self,
        root: &Element,
        modified_timestamp: &DateTime<Utc>,
        provenance: &Provenance,
    ) -> Result<ParsedPersonDocument, TransformError> {
        let modified = to_iso_string(modified_timestamp);
        let person_nodes = root.find_all("person");

        let mut persons = Vec::with_capacity(person_nodes.len());
        for (node_index, node) in person_nodes.iter().enumerate() {
            persons.push(self.person(node, node_index, &modified, provenance)?);
        }

        let generated: Vec<&Element> = person_nodes
            .iter()
            .zip(&persons)
            .filter(|(_, person)| person.has_generated_person_id())
            .map(|(node, _)| *node)
            .collect();
        if !generated.is_empty() {
            log_missing_person_id_summary(&generated, person_nodes.len());
            MetricName::GeneratedPersonIds.increment_by(generated.len() as u64);
        }
        info!("number of extracted person records: {}", persons.len());

        Ok(ParsedPersonDocument {
            provenance: provenance.clone(),
            persons,
        })
    }

    fn iso(&self, value: Option<String>) -> Result<Option<String>, TimestampFormatError> {
        self.timestamps.format_to_iso_timestamp(value.as_deref())
    }

    fn person(
        &self,
        node: &Element,
        node_index: usize,
        modified: &str,
        provenance: &Provenance,
    ) -> Result<PersonV2, TransformError> {
        let person_id = text(node, "person-id").filter(|id| !id.is_empty());
        self.person_record(node, node_index, person_id.clone(), modified, provenance)
            .and_then(|record| PersonV2::new(record).map_err(TransformError::from))
            .map_err(|source| TransformError::Person {
                person_id,
                source: Box::new(source),
            })
    }

    fn person_record(
        &self,
        node: &Element,
        node_index: usize,
        person_id: Option<String>,
        modified: &str,
        provenance: &Provenance,
    ) -> Result<PersonV2Record, TransformError> {
        let person_id = person_id
            .unwrap_or_else(|| generate_person_id(&provenance.source_filename, node_index));
        let profile_modified = text(node, "profile-modify-date")
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| modified.to_string());

        Ok(PersonV2Record {
            provenance: provenance.with_node_index(node_index),
            person_id,
            modified_timestamp: self.iso(Some(profile_modified))?,
            status: text(node, "status"),
            title: text(node, "title"),
            first_name: text(node, "first-name"),
            middle_name: text(node, "middle_nm"),
            last_name: text(node, "last-name"),
            native_name: text(node, "native_nm"),
            institution: text(node, "institution"),
            email: text(node, "email"),
            secondary_email: text(node, "secondary-email"),
            external_references: try_extract_list(node, "memberships/membership", |n| {
                self.membership(n)
            })?,
            addresses: try_extract_list(node, "addresses/address", |n| self.address(n))?,
            organizations: extract_list(node, "organizations/organization", |n| {
                PersonV2Organization {
                    organization_id: text(n, "org-id"),
                    organization_name: text(n, "org-name"),
                    organization_type: text(n, "org-type"),
                }
            }),
            roles: try_extract_list(node, "roles/role", |n| self.role(n))?,
            dates_not_available: try_extract_list(node, "dates-not-available/dna", |n| {
                Ok::<_, TimestampFormatError>(PersonV2DatesNotAvailable {
                    start_timestamp: self.iso(text(n, "dna-start-date"))?,
                    end_timestamp: self.iso(text(n, "dna-end-date"))?,
                })
            })?,
            keywords: text_list(node, "keywords/keyword"),
            person_tags: text_list(node, "person-tags/person-tag"),
            merged_into_person_ids: text_list(node, "merge-info/merged-into-person-id"),
            research_organisms: text_list(
                node,
                &format!(r#"subject-area-list[@name="{RESEARCH_ORGANISM_LIST_NAME}"]/subject-area"#),
            ),
            subject_areas: text_list(
                node,
                &format!(r#"subject-area-list[@name="{SUBJECT_AREA_LIST_NAME}"]/subject-area"#),
            ),
        })
    }

    fn membership(&self, node: &Element) -> Result<PersonV2Membership, TimestampFormatError> {
        Ok(PersonV2Membership {
            is_enabled: is_active(node),
            reference_type: optional(get_xml_attribute(node, "member_id_type_cde")),
            reference_value: text(node, "member_id"),
            start_timestamp: self.iso(text(node, "start_dt"))?,
            end_timestamp: self.iso(text(node, "end_dt"))?,
            modified_timestamp: self.iso(text(node, "last_update_dt"))?,
            modified_by_person_id: text(node, "last_update_p_id"),
        })
    }

    fn address(&self, node: &Element) -> Result<PersonV2Address, TimestampFormatError> {
        Ok(PersonV2Address {
            is_enabled: is_active(node),
            address_type: optional(get_xml_attribute(node, "addr_type")),
            country: text(node, "country"),
            area: text(node, "state"),
            city: text(node, "city"),
            postal_code: text(node, "zip"),
            organization: text(node, "organization"),
            department: text(node, "department"),
            division: text(node, "division"),
            laboratory: text(node, "laboratory"),
            job_title: text(node, "job_title"),
            email: text(node, "e_mail"),
            telephone: text(node, "telephone"),
            address_line_1: text(node, "addr1"),
            address_line_2: text(node, "addr2"),
            address_line_3: text(node, "addr3"),
            start_timestamp: self.iso(text(node, "start_dt"))?,
            end_timestamp: self.iso(text(node, "end_dt"))?,
        })
    }

    fn role(&self, node: &Element) -> Result<PersonV2Role, TimestampFormatError> {
        Ok(PersonV2Role {
            role_name: optional(get_xml_attribute(node, "role_nm")),
            is_enabled: is_active(node),
            start_timestamp: self.iso(Some(get_xml_attribute(node, "start_dt")))?,
            end_timestamp: self.iso(Some(get_xml_attribute(node, "end_dt")))?,
            modified_timestamp: self.iso(text(node, "update_dt"))?,
            modified_by_person_id: text(node, "update_p_id"),
        })
    }
}

fn log_missing_person_id_summary(nodes: &[&Element], total_count: usize) {
    let examples: Vec<String> = nodes
        .iter()
        .take(MISSING_PERSON_ID_EXAMPLE_COUNT)
        .map(|node| node.to_xml_string())
        .collect();
    let percentage = 100.0 * nodes.len() as f64 / total_count as f64;
    warn!(
        "xml contains {} of {} ({} percent) person entries without person ids, e.g. {:?}",
        nodes.len(),
        total_count,
        percentage,
        examples
    );
}
