pub mod manuscript;
pub mod person;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::constants::{MANUSCRIPT_ROOT_TAG, PERSON_ROOT_TAG};
use crate::domain::{Entity, Provenance};
use crate::error::{DocumentParseError, TransformError, UnrecognisedDocumentError};
use crate::observability::metrics::MetricName;
use crate::timestamp::TimestampNormalizer;
use crate::xml::Element;

pub use manuscript::{ManuscriptTransformer, ParsedManuscriptDocument};
pub use person::{ParsedPersonDocument, PersonTransformer};

/// Document families, told apart by the root tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Manuscript,
    Person,
}

impl DocumentKind {
    pub fn from_root_tag(tag: &str) -> Option<Self> {
        match tag {
            MANUSCRIPT_ROOT_TAG => Some(DocumentKind::Manuscript),
            PERSON_ROOT_TAG => Some(DocumentKind::Person),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Manuscript => "manuscript",
            DocumentKind::Person => "person",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedDocument {
    Manuscript(ParsedManuscriptDocument),
    Person(ParsedPersonDocument),
}

impl ParsedDocument {
    pub fn kind(&self) -> DocumentKind {
        match self {
            ParsedDocument::Manuscript(_) => DocumentKind::Manuscript,
            ParsedDocument::Person(_) => DocumentKind::Person,
        }
    }

    pub fn provenance(&self) -> &Provenance {
        match self {
            ParsedDocument::Manuscript(document) => &document.provenance,
            ParsedDocument::Person(document) => &document.provenance,
        }
    }

    /// Persons first, then the manuscript, then its versions
    pub fn into_entities(self) -> Vec<Entity> {
        match self {
            ParsedDocument::Manuscript(document) => {
                let mut entities: Vec<Entity> =
                    document.persons.into_iter().map(Entity::from).collect();
                entities.push(Entity::from(document.manuscript));
                entities.extend(document.versions.into_iter().map(Entity::from));
                entities
            }
            ParsedDocument::Person(document) => {
                document.persons.into_iter().map(Entity::from).collect()
            }
        }
    }
}

/// One document family's conversion from XML tree to records
pub trait DocumentTransformer {
    fn transform(
        &self,
        root: &Element,
        modified_timestamp: &DateTime<Utc>,
        provenance: &Provenance,
    ) -> Result<ParsedDocument, TransformError>;
}

impl DocumentTransformer for ManuscriptTransformer {
    fn transform(
        &self,
        root: &Element,
        modified_timestamp: &DateTime<Utc>,
        provenance: &Provenance,
    ) -> Result<ParsedDocument, TransformError> {
        self.parse_document(root, modified_timestamp, provenance)
            .map(ParsedDocument::Manuscript)
    }
}

impl DocumentTransformer for PersonTransformer {
    fn transform(
        &self,
        root: &Element,
        modified_timestamp: &DateTime<Utc>,
        provenance: &Provenance,
    ) -> Result<ParsedDocument, TransformError> {
        self.parse_document(root, modified_timestamp, provenance)
            .map(ParsedDocument::Person)
    }
}

/// Routes a parsed tree to the transformer for its root tag. Every failure,
/// including an unknown tag, comes back as a [`DocumentParseError`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentDispatcher {
    manuscript: ManuscriptTransformer,
    person: PersonTransformer,
}

impl DocumentDispatcher {
    pub fn new(timestamps: TimestampNormalizer) -> Self {
        Self {
            manuscript: ManuscriptTransformer::new(timestamps),
            person: PersonTransformer::new(timestamps),
        }
    }

    pub fn parse_document(
        &self,
        root: &Element,
        modified_timestamp: &DateTime<Utc>,
        provenance: &Provenance,
    ) -> Result<ParsedDocument, DocumentParseError> {
        let Some(kind) = DocumentKind::from_root_tag(root.name()) else {
            MetricName::DocumentsFailed.increment();
            return Err(DocumentParseError::new(
                provenance.clone(),
                UnrecognisedDocumentError {
                    provenance: provenance.clone(),
                    tag: root.name().to_string(),
                },
            ));
        };
        debug!("parsing {} document: {}", kind.as_str(), provenance);

        let transformer: &dyn DocumentTransformer = match kind {
            DocumentKind::Manuscript => &self.manuscript,
            DocumentKind::Person => &self.person,
        };
        match transformer.transform(root, modified_timestamp, provenance) {
            Ok(document) => {
                MetricName::DocumentsParsed.increment_for(kind.as_str());
                Ok(document)
            }
            Err(err) => {
                MetricName::DocumentsFailed.increment();
                Err(DocumentParseError::new(provenance.clone(), err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EntityKind;
    use crate::error::DocumentParseCause;

    fn modified() -> DateTime<Utc> {
        crate::timestamp::parse_canonical("2018-02-01T00:00:00Z").unwrap()
    }

    fn provenance() -> Provenance {
        Provenance::new("archive.zip/01-02-2018-RA-eLife-12345.xml", None)
    }

    #[test]
    fn test_root_tag_selects_document_kind() {
        assert_eq!(DocumentKind::from_root_tag("xml"), Some(DocumentKind::Manuscript));
        assert_eq!(DocumentKind::from_root_tag("persons"), Some(DocumentKind::Person));
        assert_eq!(DocumentKind::from_root_tag("other"), None);
    }

    #[test]
    fn test_unknown_root_tag_is_unrecognised() {
        let err = DocumentDispatcher::default()
            .parse_document(&Element::new("other"), &modified(), &provenance())
            .unwrap_err();
        assert!(err.is_unrecognised_document());
        assert_eq!(err.provenance, provenance());
        match err.cause {
            DocumentParseCause::Unrecognised(cause) => assert_eq!(cause.tag, "other"),
            other => panic!("unexpected cause: {other}"),
        }
    }

    #[test]
    fn test_transform_failure_is_wrapped_with_provenance() {
        let root = Element::new("persons").with_child(
            Element::new("person")
                .with_child(Element::new("person-id").with_text("p1"))
                .with_child(Element::new("profile-modify-date").with_text("garbage")),
        );
        let err = DocumentDispatcher::default()
            .parse_document(&root, &modified(), &provenance())
            .unwrap_err();
        assert!(!err.is_unrecognised_document());
        assert!(err.to_string().starts_with("failed to process archive.zip/"));
    }

    #[test]
    fn test_manuscript_entities_are_ordered() {
        let root = Element::new("xml")
            .with_child(
                Element::new("people").with_child(
                    Element::new("person").with_child(Element::new("person-id").with_text("p1")),
                ),
            )
            .with_child(
                Element::new("manuscript").with_child(
                    Element::new("version")
                        .with_child(Element::new("manuscript-number").with_text("eLife-12345")),
                ),
            );
        let document = DocumentDispatcher::default()
            .parse_document(&root, &modified(), &provenance())
            .unwrap();
        assert_eq!(document.kind(), DocumentKind::Manuscript);
        let kinds: Vec<EntityKind> = document.into_entities().iter().map(Entity::kind).collect();
        assert_eq!(
            kinds,
            vec![
                EntityKind::Person,
                EntityKind::Manuscript,
                EntityKind::ManuscriptVersion
            ]
        );
    }
}
