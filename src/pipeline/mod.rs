// Archive pipeline: ingestion (zip walking) and processing (document transforms, pruning)

pub mod ingestion;
pub mod processing;
pub mod tasks;

pub use processing::parser;
