use thiserror::Error;

use crate::domain::Provenance;

/// A non-blank date string that matches none of the accepted formats
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unable to parse timestamp {value:?}")]
pub struct TimestampFormatError {
    pub value: String,
}

impl TimestampFormatError {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

/// Raw syntax failure reported by the XML reader, located by byte offset and line
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (line {line_number})")]
pub struct XmlSyntaxError {
    pub message: String,
    pub position: usize,
    pub line_number: usize,
}

/// Malformed XML inside an archive member, enriched with the offending line.
/// `provenance` carries the qualified `archive/member` name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to parse xml {member} line {line_number}=[{line}] due to {cause}")]
pub struct ArchiveMemberSyntaxError {
    pub provenance: Provenance,
    pub member: String,
    pub line_number: usize,
    pub line: String,
    #[source]
    pub cause: XmlSyntaxError,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unrecognised xml tag {tag} (filename: {provenance})")]
pub struct UnrecognisedDocumentError {
    pub provenance: Provenance,
    pub tag: String,
}

/// Violations caught while constructing a typed record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntityError {
    #[error("provenance source_filename must not be empty")]
    MissingSourceFilename,

    #[error("person_id must not be empty")]
    MissingPersonId,

    #[error("manuscript_id must not be empty")]
    MissingManuscriptId,

    #[error("{field} is not a canonical UTC timestamp: {value:?}")]
    NonCanonicalTimestamp { field: &'static str, value: String },

    #[error("version_id {version_id:?} does not match derived {expected:?}")]
    InconsistentVersionId { version_id: String, expected: String },
}

/// Failures raised by the manuscript and person transformers
#[derive(Error, Debug)]
pub enum TransformError {
    #[error(transparent)]
    Timestamp(#[from] TimestampFormatError),

    #[error(transparent)]
    Entity(#[from] EntityError),

    #[error("manuscript number must not be empty")]
    BlankManuscriptNumber,

    #[error("failed to process person {person_id:?} due to {source}")]
    Person {
        person_id: Option<String>,
        #[source]
        source: Box<TransformError>,
    },
}

#[derive(Error, Debug)]
pub enum DocumentParseCause {
    #[error(transparent)]
    Unrecognised(#[from] UnrecognisedDocumentError),

    #[error(transparent)]
    Transform(#[from] TransformError),
}

/// The single failure kind observed by callers of the document dispatcher
#[derive(Error, Debug)]
#[error("failed to process {provenance} due to {cause}")]
pub struct DocumentParseError {
    pub provenance: Provenance,
    #[source]
    pub cause: DocumentParseCause,
}

impl DocumentParseError {
    pub fn new(provenance: Provenance, cause: impl Into<DocumentParseCause>) -> Self {
        Self {
            provenance,
            cause: cause.into(),
        }
    }

    pub fn is_unrecognised_document(&self) -> bool {
        matches!(self.cause, DocumentParseCause::Unrecognised(_))
    }
}

/// Errors surfaced while walking one archive
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid manifest {member}: {message}")]
    Manifest { member: String, message: String },

    #[error("Invalid exclusion pattern: {0}")]
    ExclusionPattern(#[from] regex::Error),

    #[error(transparent)]
    Timestamp(#[from] TimestampFormatError),

    #[error(transparent)]
    MemberSyntax(#[from] ArchiveMemberSyntaxError),

    #[error(transparent)]
    Document(#[from] DocumentParseError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Unknown reference timezone {0:?}")]
    Timezone(String),

    #[error("Invalid exclusion pattern: {0}")]
    ExclusionPattern(#[from] regex::Error),
}

pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_parse_error_mentions_source_and_tag() {
        let provenance = Provenance::new("archive.zip/file.xml", None);
        let err = DocumentParseError::new(
            provenance.clone(),
            UnrecognisedDocumentError {
                provenance,
                tag: "other".to_string(),
            },
        );
        let message = err.to_string();
        assert!(err.is_unrecognised_document());
        assert!(message.contains("archive.zip/file.xml"));
        assert!(message.contains("other"));
    }

    #[test]
    fn test_member_syntax_error_includes_line_text() {
        let err = ArchiveMemberSyntaxError {
            provenance: Provenance::new("archive.zip/file.xml", None),
            member: "file.xml".to_string(),
            line_number: 2,
            line: "<broken".to_string(),
            cause: XmlSyntaxError {
                message: "unexpected end of input".to_string(),
                position: 10,
                line_number: 2,
            },
        };
        assert!(err.to_string().contains("line 2=[<broken]"));
    }
}
