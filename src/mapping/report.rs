//! Plain-text mapping report
//!
//! ```text
//! res dir mapping:
//!     res/drawable-hdpi -> res/a
//!
//! res id mapping:
//!     0x7f010000 : app:drawable/icon -> app:drawable/a
//!
//! res entries path mapping:
//!     0x7f010000 : base/res/drawable-hdpi/icon.png -> res/a/a.png
//!
//! res image mapping:
//!     base/res/drawable-hdpi/icon.png -> res/a/a.png (7,3) of (w:48,h:48) ...
//!
//! res document mapping:
//!     base/res/layout/main.xml -> res/b/a.xml xmlns:guard42=... ...
//! ```
//!
//! Entry lines are tab-indented. Only the first three sections are read back
//! when seeding a run; audit sections describe the run that wrote them.

use std::fmt::Write as _;

use super::store::MappingStore;
use crate::error::{Error, Result};

pub const DIR_SECTION: &str = "res dir mapping:";
pub const NAME_SECTION: &str = "res id mapping:";
pub const PATH_SECTION: &str = "res entries path mapping:";
pub const IMAGE_SECTION: &str = "res image mapping:";
pub const DOCUMENT_SECTION: &str = "res document mapping:";

const UNKNOWN_ID: &str = "-";

#[derive(Clone, Copy, PartialEq)]
enum Section {
    Dir,
    Name,
    Path,
    Audit,
}

/// Render the full report
pub fn render(store: &MappingStore) -> String {
    let mut out = String::new();

    out.push_str(DIR_SECTION);
    out.push('\n');
    for (raw, obfuscated) in store.dirs.iter() {
        let _ = writeln!(out, "\t{} -> {}", raw, obfuscated);
    }
    out.push_str("\n\n");

    out.push_str(NAME_SECTION);
    out.push('\n');
    for (raw, obfuscated) in store.names.iter() {
        let id = store.name_id(raw).unwrap_or(UNKNOWN_ID);
        let _ = writeln!(out, "\t{} : {} -> {}", id, raw, obfuscated);
    }
    out.push_str("\n\n");

    out.push_str(PATH_SECTION);
    out.push('\n');
    for (raw, obfuscated) in store.paths.iter() {
        let id = store.path_id(raw).unwrap_or(UNKNOWN_ID);
        let _ = writeln!(out, "\t{} : {} -> {}", id, raw, obfuscated);
    }
    out.push_str("\n\n");

    out.push_str(IMAGE_SECTION);
    out.push('\n');
    for entry in store.image_audit() {
        let _ = writeln!(out, "\t{} -> {}", entry.path, entry.describe());
    }
    out.push_str("\n\n");

    out.push_str(DOCUMENT_SECTION);
    out.push('\n');
    for entry in store.document_audit() {
        let _ = writeln!(out, "\t{} -> {}", entry.path, entry.describe());
    }

    out
}

/// Parse a report into a fresh store
pub fn parse(text: &str) -> Result<MappingStore> {
    let mut store = MappingStore::new();
    let mut section: Option<Section> = None;

    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        if line.trim().is_empty() {
            continue;
        }

        if !line.starts_with(char::is_whitespace) {
            section = Some(match line.trim_end() {
                DIR_SECTION => Section::Dir,
                NAME_SECTION => Section::Name,
                PATH_SECTION => Section::Path,
                IMAGE_SECTION | DOCUMENT_SECTION => Section::Audit,
                other => {
                    return Err(Error::invalid_mapping(
                        line_no,
                        format!("unknown section '{}'", other),
                    ))
                }
            });
            continue;
        }

        let body = line.trim();
        match section {
            None => {
                return Err(Error::invalid_mapping(line_no, "entry before any section"));
            }
            Some(Section::Audit) => {}
            Some(Section::Dir) => {
                let (raw, obfuscated) = split_arrow(body, line_no)?;
                store
                    .put_dir_mapping(raw, obfuscated)
                    .map_err(|e| Error::invalid_mapping(line_no, e.to_string()))?;
            }
            Some(Section::Name) => {
                let (id, rest) = split_id(body);
                let (raw, obfuscated) = split_arrow(rest, line_no)?;
                store
                    .put_resource_mapping(raw, obfuscated)
                    .map_err(|e| Error::invalid_mapping(line_no, e.to_string()))?;
                if let Some(id) = id {
                    store.record_name_id(raw, id);
                }
            }
            Some(Section::Path) => {
                let (id, rest) = split_id(body);
                let (raw, obfuscated) = split_arrow(rest, line_no)?;
                store
                    .put_entry_file_mapping(raw, obfuscated)
                    .map_err(|e| Error::invalid_mapping(line_no, e.to_string()))?;
                if let Some(id) = id {
                    store.record_path_id(raw, id);
                }
            }
        }
    }

    Ok(store)
}

fn split_arrow(body: &str, line_no: usize) -> Result<(&str, &str)> {
    let (raw, obfuscated) = body
        .split_once(" -> ")
        .ok_or_else(|| Error::invalid_mapping(line_no, format!("missing '->' in '{}'", body)))?;
    let (raw, obfuscated) = (raw.trim(), obfuscated.trim());
    if raw.is_empty() || obfuscated.is_empty() {
        return Err(Error::invalid_mapping(line_no, "empty mapping side"));
    }
    Ok((raw, obfuscated))
}

fn split_id(body: &str) -> (Option<&str>, &str) {
    match body.split_once(" : ") {
        Some((id, rest)) => {
            let id = id.trim();
            let id = (id != UNKNOWN_ID && id != "null").then_some(id);
            (id, rest)
        }
        None => (None, body),
    }
}
