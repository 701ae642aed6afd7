// Pipeline ingestion: archive manifest and lazy member walk

pub mod archive;

pub use archive::{iter_parse_xml_in_zip, ArchiveWalker, WalkOptions, ZipManifest};
