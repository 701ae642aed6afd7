pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod timestamp;
pub mod xml;

// Domain records shared across layers
pub mod domain;

pub mod observability;
pub mod pipeline;

// Layered boundaries for application and infrastructure
pub mod app;
pub mod infra;

pub use domain::{Entity, EntityKind, Provenance};
pub use error::{IngestError, Result};
pub use pipeline::ingestion::archive::iter_parse_xml_in_zip;
pub use pipeline::processing::parser::{DocumentKind, ParsedDocument};
pub use pipeline::processing::prune::remove_key_with_null_value;
pub use timestamp::TimestampNormalizer;
