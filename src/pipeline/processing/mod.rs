// Pipeline processing: document parsing and record serialization

pub mod parser;
pub mod prune;
