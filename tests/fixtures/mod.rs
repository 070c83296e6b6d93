//! Shared fixtures for the integration tests
//!
//! Header fixtures live under tests/fixtures/headers and are shaped like
//! the go_asm.h files the compiler writes.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use go_sizeof::tool::{MockBuild, MockGoTool};
use serde_json::json;

/// Path to a header fixture
pub fn header_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/headers")
        .join(name)
}

/// Contents of a header fixture
pub fn header(name: &str) -> String {
    fs::read_to_string(header_path(name))
        .unwrap_or_else(|e| panic!("reading fixture {}: {}", name, e))
}

/// Mock go command for a package living in `dir`
pub fn package_in(
    dir: &Path,
    import_path: &str,
    stale: bool,
    s_files: &[&str],
    header: &str,
) -> MockGoTool {
    let name = import_path.rsplit('/').next().unwrap_or(import_path);
    MockGoTool::new(json!({
        "Dir": dir,
        "ImportPath": import_path,
        "Name": name,
        "Stale": stale,
        "SFiles": s_files,
    }))
    .with_build(MockBuild::Header(header.to_string()))
}

/// Run output as a string
pub fn text(out: Vec<u8>) -> String {
    String::from_utf8(out).expect("utf-8 output")
}
