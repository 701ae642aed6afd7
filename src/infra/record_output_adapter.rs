use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use tracing::{debug, info};

use crate::app::ports::RecordOutputPort;
use crate::config::OutputFilesConfig;
use crate::domain::{Entity, EntityKind};
use crate::pipeline::processing::prune::to_pruned_json_line;

/// Writes each record as one pruned JSON line to the writer for its kind
pub struct JsonLinesRecordOutput<W: Write + Send> {
    writers: BTreeMap<EntityKind, W>,
    counts: BTreeMap<EntityKind, usize>,
}

impl<W: Write + Send> JsonLinesRecordOutput<W> {
    pub fn new(writers: BTreeMap<EntityKind, W>) -> Self {
        Self {
            writers,
            counts: BTreeMap::new(),
        }
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn flush(&mut self) -> Result<()> {
        for writer in self.writers.values_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    pub fn into_writers(self) -> BTreeMap<EntityKind, W> {
        self.writers
    }
}

impl<W: Write + Send> RecordOutputPort for JsonLinesRecordOutput<W> {
    fn write_entity(&mut self, entity: &Entity) -> Result<()> {
        let kind = entity.kind();
        let writer = self
            .writers
            .get_mut(&kind)
            .ok_or_else(|| anyhow!("no output configured for {} records", kind))?;
        let line = to_pruned_json_line(entity)
            .with_context(|| format!("Failed to serialize {} record from {}", kind, entity.provenance()))?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        *self.counts.entry(kind).or_insert(0) += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.flush()
    }
}

/// One newline-delimited JSON file per record kind under a directory.
/// Files still empty when the run finishes are removed.
pub struct FileRecordOutput {
    inner: JsonLinesRecordOutput<BufWriter<File>>,
    paths: BTreeMap<EntityKind, PathBuf>,
}

impl FileRecordOutput {
    pub fn create(directory: &Path, files: &OutputFilesConfig) -> Result<Self> {
        fs::create_dir_all(directory)
            .with_context(|| format!("Failed to create {}", directory.display()))?;

        let mut writers = BTreeMap::new();
        let mut paths = BTreeMap::new();
        for kind in EntityKind::ALL {
            let path = directory.join(files.file_for(kind));
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            debug!("{} records -> {}", kind, path.display());
            writers.insert(kind, BufWriter::new(file));
            paths.insert(kind, path);
        }
        Ok(Self {
            inner: JsonLinesRecordOutput::new(writers),
            paths,
        })
    }

    pub fn path(&self, kind: EntityKind) -> Option<&Path> {
        self.paths.get(&kind).map(PathBuf::as_path)
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        self.inner.count(kind)
    }
}

impl RecordOutputPort for FileRecordOutput {
    fn write_entity(&mut self, entity: &Entity) -> Result<()> {
        self.inner.write_entity(entity)
    }

    fn finish(&mut self) -> Result<()> {
        self.inner.flush()?;
        for (kind, path) in &self.paths {
            let count = self.inner.count(*kind);
            if count == 0 {
                fs::remove_file(path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
                debug!("removed empty {}", path.display());
            } else {
                info!("wrote {} {} records to {}", count, kind, path.display());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Provenance;
    use crate::pipeline::processing::parser::PersonTransformer;
    use crate::timestamp::parse_canonical;
    use crate::xml::Element;

    fn person(person_id: &str) -> Entity {
        let root = Element::new("persons").with_child(
            Element::new("person")
                .with_child(Element::new("person-id").with_text(person_id))
                .with_child(Element::new("first-name").with_text("Jane")),
        );
        let document = PersonTransformer::default()
            .parse_document(
                &root,
                &parse_canonical("2018-01-01T00:00:00Z").unwrap(),
                &Provenance::new("archive.zip/persons.xml", None),
            )
            .unwrap();
        Entity::from(document.persons.into_iter().next().unwrap())
    }

    #[test]
    fn test_lines_are_pruned_and_routed_by_kind() {
        let mut writers = BTreeMap::new();
        writers.insert(EntityKind::PersonV2, Vec::new());
        let mut output = JsonLinesRecordOutput::new(writers);

        output.write_entity(&person("p1")).unwrap();
        output.write_entity(&person("p2")).unwrap();
        output.finish().unwrap();
        assert_eq!(output.count(EntityKind::PersonV2), 2);

        let text = String::from_utf8(output.into_writers().remove(&EntityKind::PersonV2).unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["person_id"], "p1");
        assert!(first.get("last_name").is_none());
    }

    #[test]
    fn test_missing_writer_is_an_error() {
        let mut output: JsonLinesRecordOutput<Vec<u8>> = JsonLinesRecordOutput::new(BTreeMap::new());
        assert!(output.write_entity(&person("p1")).is_err());
    }

    #[test]
    fn test_empty_files_are_removed_on_finish() {
        let dir = tempfile::tempdir().unwrap();
        let mut output = FileRecordOutput::create(dir.path(), &OutputFilesConfig::default()).unwrap();
        output.write_entity(&person("p1")).unwrap();
        output.finish().unwrap();

        assert!(dir.path().join("PersonV2.json").exists());
        assert!(!dir.path().join("Person.json").exists());
        assert!(!dir.path().join("Manuscript.json").exists());
        assert!(!dir.path().join("ManuscriptVersion.json").exists());
        let text = fs::read_to_string(dir.path().join("PersonV2.json")).unwrap();
        assert_eq!(text.lines().count(), 1);
    }
}
