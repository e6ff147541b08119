use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use mapverify_classfile::ClassFile;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::write_class;

/// Writes `classes` into a jar at `path`, one `<internal name>.class` entry per class, plus any
/// `extra` raw entries.
pub fn write_jar(path: &Path, classes: &[ClassFile], extra: &[(&str, &[u8])]) -> io::Result<()> {
    let mut zip = ZipWriter::new(File::create(path)?);
    let options = SimpleFileOptions::default();
    for class in classes {
        zip.start_file(format!("{}.class", class.this_class), options)?;
        zip.write_all(&write_class(class))?;
    }
    for (name, bytes) in extra {
        zip.start_file(*name, options)?;
        zip.write_all(bytes)?;
    }
    zip.finish()?;
    Ok(())
}

/// Lays `classes` out as an exploded class directory rooted at `root`.
pub fn write_class_dir(root: &Path, classes: &[ClassFile]) -> io::Result<()> {
    for class in classes {
        let path = root.join(format!("{}.class", class.this_class));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, write_class(class))?;
    }
    Ok(())
}

/// A jar in a temporary directory that is removed on drop.
pub struct TempJar {
    _dir: TempDir,
    path: PathBuf,
}

impl TempJar {
    pub fn new(classes: &[ClassFile]) -> io::Result<Self> {
        Self::with_entries(classes, &[])
    }

    pub fn with_entries(classes: &[ClassFile], extra: &[(&str, &[u8])]) -> io::Result<Self> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("fixture.jar");
        write_jar(&path, classes, extra)?;
        Ok(Self { _dir: dir, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
