#![allow(dead_code)]

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;

pub const CREATE_DATE: &str = "2018-01-01 03:04:05";

/// Builds an archive whose `go.xml` lists `listed` in order. Members are
/// written in the order given by `members`, which may differ.
pub fn archive_with_manifest(listed: &[&str], members: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    let filenames: String = listed
        .iter()
        .map(|name| format!("\n  <file_nm>{name}</file_nm>"))
        .collect();
    writer.start_file("go.xml", options).unwrap();
    write!(
        writer,
        "<?xml version=\"1.0\"?>\n<file_list create_date=\"{CREATE_DATE}\">{filenames}\n</file_list>\n"
    )
    .unwrap();

    for (name, content) in members {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

pub fn archive(members: &[(&str, &str)]) -> Vec<u8> {
    let listed: Vec<&str> = members.iter().map(|(name, _)| *name).collect();
    archive_with_manifest(&listed, members)
}

pub const PERSONS_XML: &str = r#"<?xml version="1.0"?>
<persons>
  <person>
    <person-id>p1</person-id>
    <first-name>Jane</first-name>
    <last-name>Doe</last-name>
  </person>
  <person>
    <first-name>No</first-name>
    <last-name>Id</last-name>
  </person>
</persons>
"#;

pub const MANUSCRIPT_XML: &str = r#"<?xml version="1.0"?>
<xml>
  <people>
    <person>
      <person-id>a1</person-id>
      <first-name>Ann</first-name>
    </person>
  </people>
  <manuscript>
    <country>UK</country>
    <version>
      <manuscript-number>eLife-12345</manuscript-number>
      <manuscript-type>Initial Submission: Research Article</manuscript-type>
      <title>A title &amp; more</title>
      <history>
        <stage>
          <stage-name>Initial QC Started</stage-name>
          <start-date>2018-01-02 10:00:00</start-date>
        </stage>
      </history>
    </version>
  </manuscript>
</xml>
"#;
