#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use sheet_validate::{ColumnMap, GridSource, RecordSchema};
use tempfile::{TempDir, tempdir};

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}

/// Header row plus three people; `ages` fills the Age column top to bottom.
pub fn people_grid(ages: [&str; 3]) -> GridSource {
    GridSource::from_rows([
        vec!["Name", "Age"],
        vec!["Ann", ages[0]],
        vec!["Bob", ages[1]],
        vec!["Cid", ages[2]],
    ])
}

pub fn people_columns() -> ColumnMap {
    ColumnMap::new([("Name", "name"), ("Age", "age")]).expect("column map")
}

pub fn people_schema() -> RecordSchema {
    RecordSchema::builder()
        .text("name")
        .integer("age")
        .build()
        .expect("schema")
}
