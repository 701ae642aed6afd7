pub mod archive_store;
pub mod record_output_adapter;
