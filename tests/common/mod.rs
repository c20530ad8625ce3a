//! Common test utilities for webcrawl integration tests

#![allow(dead_code)]

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use webcrawl::Config;

/// Config rooted in `dir` for inputs, outputs and the error log
pub fn config_in(dir: &Path) -> Config {
    Config {
        input_dir: dir.to_path_buf(),
        output_dir: dir.to_path_buf(),
        error_log: dir.join("webcrawl.log"),
        quiet: true,
        ..Default::default()
    }
}

/// Write `lines` as the source `<name>.txt` and return its path
pub fn write_source(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
    let path = dir.join(format!("{name}.txt"));
    let mut body = lines.join("\n");
    body.push('\n');
    std::fs::write(&path, body).expect("write source");
    path
}

/// Names of every entry in `archive`, in archive order
pub fn archive_entries(archive: &Path) -> Vec<String> {
    let mut zip = zip::ZipArchive::new(File::open(archive).expect("open archive"))
        .expect("read archive");
    (0..zip.len())
        .map(|i| zip.by_index(i).expect("entry").name().to_string())
        .collect()
}

/// Text of `entry` inside `archive`
pub fn archive_text(archive: &Path, entry: &str) -> String {
    let mut zip = zip::ZipArchive::new(File::open(archive).expect("open archive"))
        .expect("read archive");
    let mut file = zip.by_name(entry).expect("entry present");
    let mut text = String::new();
    file.read_to_string(&mut text).expect("utf-8 entry");
    text
}
