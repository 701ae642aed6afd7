use anyhow::Result;

use crate::domain::Entity;

/// Where archive bytes come from, addressed by object key
pub trait ArchiveSourcePort: Send + Sync {
    fn fetch(&self, object_key: &str) -> Result<Vec<u8>>;
}

/// Where transformed records go. One sink per run; `finish` is called once
/// after the last record of a successful walk.
pub trait RecordOutputPort: Send {
    fn write_entity(&mut self, entity: &Entity) -> Result<()>;

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}
