use std::io::{Cursor, Read};
use std::iter::FusedIterator;

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::{debug, error, info, info_span, warn, Span};
use zip::ZipArchive;

use crate::constants::{
    MANIFEST_CREATE_DATE_ATTRIBUTE, MANIFEST_FILENAME, MANIFEST_FILENAME_ELEMENT,
};
use crate::domain::Provenance;
use crate::error::{ArchiveMemberSyntaxError, IngestError, Result};
use crate::observability::metrics::MetricName;
use crate::pipeline::processing::parser::{DocumentDispatcher, ParsedDocument};
use crate::timestamp::{to_iso_string, TimestampNormalizer};
use crate::xml::{get_xml_text, parse_document, Element};

/// Contents of `go.xml`: export time and the authoritative member order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipManifest {
    pub modified_timestamp: DateTime<Utc>,
    pub filenames: Vec<String>,
}

pub fn parse_manifest(root: &Element, timestamps: &TimestampNormalizer) -> Result<ZipManifest> {
    let create_date = root
        .attribute(MANIFEST_CREATE_DATE_ATTRIBUTE)
        .ok_or_else(|| IngestError::Manifest {
            member: MANIFEST_FILENAME.to_string(),
            message: format!("missing {MANIFEST_CREATE_DATE_ATTRIBUTE} attribute"),
        })?;
    let modified_timestamp =
        timestamps
            .parse_timestamp(create_date)?
            .ok_or_else(|| IngestError::Manifest {
                member: MANIFEST_FILENAME.to_string(),
                message: format!("blank {MANIFEST_CREATE_DATE_ATTRIBUTE} attribute"),
            })?;
    let filenames = root
        .find_all(MANIFEST_FILENAME_ELEMENT)
        .into_iter()
        .filter_map(|node| get_xml_text(Some(node), None))
        .collect();
    Ok(ZipManifest {
        modified_timestamp,
        filenames,
    })
}

pub fn join_zip_and_xml_filename(zip_filename: &str, xml_filename: &str) -> String {
    format!("{zip_filename}/{xml_filename}")
}

/// Per-walk settings
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    exclusion_pattern: Option<Regex>,
    pub timestamps: TimestampNormalizer,
}

impl WalkOptions {
    pub fn new(timestamps: TimestampNormalizer) -> Self {
        Self {
            exclusion_pattern: None,
            timestamps,
        }
    }

    /// Members whose filename matches `pattern` from its first character are
    /// skipped. A blank pattern excludes nothing.
    pub fn with_exclusion_pattern(self, pattern: Option<&str>) -> Result<Self> {
        let regex = match pattern.map(str::trim) {
            Some(pattern) if !pattern.is_empty() => Some(compile_exclusion_pattern(pattern)?),
            _ => None,
        };
        Ok(self.with_exclusion_regex(regex))
    }

    /// Takes a pattern already built by [`compile_exclusion_pattern`]
    pub fn with_exclusion_regex(mut self, regex: Option<Regex>) -> Self {
        self.exclusion_pattern = regex;
        self
    }

    pub fn is_excluded(&self, filename: &str) -> bool {
        self.exclusion_pattern
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(filename))
    }
}

pub fn compile_exclusion_pattern(pattern: &str) -> std::result::Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})"))
}

/// Lazily walks the documents of one archive in manifest order.
///
/// The walker owns the archive bytes and drops them once the walk is over,
/// whether it ran to the end, hit an error or was dropped early. After the
/// first error it yields nothing more.
pub struct ArchiveWalker {
    archive: Option<ZipArchive<Cursor<Vec<u8>>>>,
    archive_name: String,
    manifest_modified_timestamp: DateTime<Utc>,
    imported_timestamp: String,
    filenames: std::vec::IntoIter<String>,
    options: WalkOptions,
    dispatcher: DocumentDispatcher,
    span: Span,
}

impl ArchiveWalker {
    pub fn open(bytes: Vec<u8>, archive_name: &str, options: &WalkOptions) -> Result<Self> {
        Self::open_with_imported_timestamp(bytes, archive_name, options, Utc::now())
    }

    pub fn open_with_imported_timestamp(
        bytes: Vec<u8>,
        archive_name: &str,
        options: &WalkOptions,
        imported_timestamp: DateTime<Utc>,
    ) -> Result<Self> {
        let span = info_span!("archive", archive = %archive_name);
        let _enter = span.enter();

        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let manifest_provenance = Provenance::new(
            join_zip_and_xml_filename(archive_name, MANIFEST_FILENAME),
            None,
        );
        let manifest_root = parse_member(&mut archive, MANIFEST_FILENAME, &manifest_provenance)?;
        let manifest = parse_manifest(&manifest_root, &options.timestamps)?;
        info!(
            "manifest lists {} members, created {}",
            manifest.filenames.len(),
            to_iso_string(&manifest.modified_timestamp)
        );
        drop(_enter);

        Ok(Self {
            archive: Some(archive),
            archive_name: archive_name.to_string(),
            manifest_modified_timestamp: manifest.modified_timestamp,
            imported_timestamp: to_iso_string(&imported_timestamp),
            filenames: manifest.filenames.into_iter(),
            options: options.clone(),
            dispatcher: DocumentDispatcher::new(options.timestamps),
            span,
        })
    }

    pub fn archive_name(&self) -> &str {
        &self.archive_name
    }

    pub fn manifest_modified_timestamp(&self) -> DateTime<Utc> {
        self.manifest_modified_timestamp
    }

    pub fn imported_timestamp(&self) -> &str {
        &self.imported_timestamp
    }

    pub fn is_finished(&self) -> bool {
        self.archive.is_none()
    }

    fn release(&mut self) {
        if self.archive.take().is_some() {
            debug!("released archive {}", self.archive_name);
        }
    }

    fn parse_next(&mut self, filename: &str) -> Result<ParsedDocument> {
        let Some(archive) = self.archive.as_mut() else {
            return Err(IngestError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "archive already released",
            )));
        };
        let provenance = Provenance::new(
            join_zip_and_xml_filename(&self.archive_name, filename),
            Some(self.imported_timestamp.clone()),
        );
        let root = parse_member(archive, filename, &provenance)?;
        Ok(self
            .dispatcher
            .parse_document(&root, &self.manifest_modified_timestamp, &provenance)?)
    }
}

impl Iterator for ArchiveWalker {
    type Item = Result<ParsedDocument>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.archive.is_none() {
            return None;
        }
        let span = self.span.clone();
        let _enter = span.enter();

        loop {
            let Some(filename) = self.filenames.next() else {
                self.release();
                return None;
            };
            if self.options.is_excluded(&filename) {
                debug!("skipping excluded member {}", filename);
                MetricName::MembersExcluded.increment();
                continue;
            }

            let result = self.parse_next(&filename);
            if let Err(err) = &result {
                error!("stopping walk at {}: {}", filename, err);
                self.release();
            }
            return Some(result);
        }
    }
}

impl FusedIterator for ArchiveWalker {}

impl Drop for ArchiveWalker {
    fn drop(&mut self) {
        if self.archive.is_some() {
            debug!("archive {} dropped before the walk finished", self.archive_name);
        }
        self.release();
    }
}

/// Opens `zip_filename` and returns a walker over its documents
pub fn iter_parse_xml_in_zip(
    bytes: Vec<u8>,
    zip_filename: &str,
    xml_filename_exclusion_regex_pattern: Option<&str>,
    timestamps: TimestampNormalizer,
) -> Result<ArchiveWalker> {
    let options =
        WalkOptions::new(timestamps).with_exclusion_pattern(xml_filename_exclusion_regex_pattern)?;
    ArchiveWalker::open(bytes, zip_filename, &options)
}

fn read_member(archive: &mut ZipArchive<Cursor<Vec<u8>>>, name: &str) -> Result<Vec<u8>> {
    let mut file = archive.by_name(name)?;
    // The declared size comes from the archive header and is not trusted
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(bytes)
}

fn parse_member(
    archive: &mut ZipArchive<Cursor<Vec<u8>>>,
    name: &str,
    provenance: &Provenance,
) -> Result<Element> {
    let bytes = read_member(archive, name)?;
    parse_document(&bytes).map_err(|cause| {
        let line = offending_line(&bytes, cause.line_number);
        warn!("failed to parse xml {} line=[{}]", provenance, line);
        IngestError::MemberSyntax(ArchiveMemberSyntaxError {
            provenance: provenance.clone(),
            member: name.to_string(),
            line_number: cause.line_number,
            line,
            cause,
        })
    })
}

fn offending_line(bytes: &[u8], line_number: usize) -> String {
    bytes
        .split(|b| *b == b'\n')
        .nth(line_number.saturating_sub(1))
        .map(|line| String::from_utf8_lossy(line).trim_end_matches('\r').to_string())
        .unwrap_or_default()
}
