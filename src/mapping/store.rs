//! Renaming tables for one run

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use super::audit::{MutationAuditEntry, Strategy};
use super::report;
use crate::error::{Error, Result};
use crate::model::is_under_resource_root;

/// Which injective table a mapping belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Table {
    Dir,
    Name,
    Path,
}

/// Injective `raw -> obfuscated` table with a reverse index
#[derive(Debug, Clone, Default)]
pub(crate) struct Bimap {
    forward: BTreeMap<String, String>,
    reverse: HashMap<String, String>,
}

impl Bimap {
    fn insert(
        &mut self,
        table: Table,
        raw: &str,
        obfuscated: &str,
        allow_same: bool,
    ) -> Result<()> {
        if let Some(existing) = self.reverse.get(obfuscated) {
            if allow_same && existing == raw {
                return Ok(());
            }
            let (raw, obfuscated, existing) =
                (raw.to_string(), obfuscated.to_string(), existing.clone());
            return Err(match table {
                Table::Dir => Error::DirCollision {
                    raw,
                    obfuscated,
                    existing,
                },
                Table::Name => Error::NameCollision {
                    raw,
                    obfuscated,
                    existing,
                },
                Table::Path => Error::PathCollision {
                    raw,
                    obfuscated,
                    existing,
                },
            });
        }
        if let Some(previous) = self.forward.insert(raw.to_string(), obfuscated.to_string()) {
            self.reverse.remove(&previous);
        }
        self.reverse.insert(obfuscated.to_string(), raw.to_string());
        Ok(())
    }

    fn remove(&mut self, raw: &str) -> Option<String> {
        let obfuscated = self.forward.remove(raw)?;
        self.reverse.remove(&obfuscated);
        Some(obfuscated)
    }

    pub(crate) fn get(&self, raw: &str) -> Option<&str> {
        self.forward.get(raw).map(String::as_str)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.forward.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn len(&self) -> usize {
        self.forward.len()
    }
}

/// All renaming tables, provenance and mutation audit of one run
///
/// Mutated only through the `put_*`/`remove_*` methods, which enforce that no
/// two raw keys share an obfuscated value. Nothing reaches disk until
/// [`serialize`](Self::serialize).
#[derive(Debug, Clone, Default)]
pub struct MappingStore {
    pub(crate) dirs: Bimap,
    pub(crate) names: Bimap,
    pub(crate) paths: Bimap,
    pub(crate) name_ids: HashMap<String, String>,
    pub(crate) path_ids: HashMap<String, String>,
    pub(crate) image_audit: BTreeMap<String, MutationAuditEntry>,
    pub(crate) document_audit: BTreeMap<String, MutationAuditEntry>,
    native_audit: Vec<MutationAuditEntry>,
}

impl MappingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from a previous report, or start empty when there is none
    pub fn load(source: Option<&Path>) -> Result<Self> {
        let path = match source {
            Some(p) if p.exists() => p,
            Some(p) => {
                tracing::info!("No previous mapping at {:?}, starting empty", p);
                return Ok(Self::new());
            }
            None => return Ok(Self::new()),
        };

        let text = fs::read_to_string(path)?;
        let store = report::parse(&text)?;
        store.check_dir_roots()?;
        tracing::info!(
            "Loaded mapping from {:?}: {} dirs, {} names, {} paths",
            path,
            store.dirs.len(),
            store.names.len(),
            store.paths.len()
        );
        Ok(store)
    }

    /// Every obfuscated directory must sit under the resource root
    pub fn check_dir_roots(&self) -> Result<()> {
        for (index, (raw, obfuscated)) in self.dirs.iter().enumerate() {
            if !is_under_resource_root(obfuscated) {
                return Err(Error::invalid_mapping(
                    index + 1,
                    format!(
                        "directory {} -> {} is outside the resource root",
                        raw, obfuscated
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Fails only when `obfuscated` is bound to a different directory
    pub fn put_dir_mapping(&mut self, raw: &str, obfuscated: &str) -> Result<()> {
        self.dirs.insert(Table::Dir, raw, obfuscated, true)
    }

    pub fn put_resource_mapping(&mut self, raw: &str, obfuscated: &str) -> Result<()> {
        self.names.insert(Table::Name, raw, obfuscated, false)
    }

    /// Re-asserting an identical pair is a no-op
    pub fn put_entry_file_mapping(&mut self, raw: &str, obfuscated: &str) -> Result<()> {
        self.paths.insert(Table::Path, raw, obfuscated, true)
    }

    /// Drop a resource mapping (resource became whitelisted)
    pub fn remove_resource_mapping(&mut self, raw: &str) -> Option<String> {
        self.name_ids.remove(raw);
        self.names.remove(raw)
    }

    pub fn dir_mapping(&self, raw: &str) -> Option<&str> {
        self.dirs.get(raw)
    }

    pub fn resource_mapping(&self, raw: &str) -> Option<&str> {
        self.names.get(raw)
    }

    pub fn entry_file_mapping(&self, raw: &str) -> Option<&str> {
        self.paths.get(raw)
    }

    pub fn dir_mappings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.dirs.iter()
    }

    pub fn resource_mappings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.names.iter()
    }

    pub fn entry_file_mappings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.paths.iter()
    }

    /// Note which resource id a name belongs to (report only)
    pub fn record_name_id(&mut self, name: &str, id: &str) {
        self.name_ids.insert(name.to_string(), id.to_string());
    }

    /// Note which resource id a file path belongs to (report only)
    pub fn record_path_id(&mut self, path: &str, id: &str) {
        self.path_ids.insert(path.to_string(), id.to_string());
    }

    pub fn name_id(&self, name: &str) -> Option<&str> {
        self.name_ids.get(name).map(String::as_str)
    }

    pub fn path_id(&self, path: &str) -> Option<&str> {
        self.path_ids.get(path).map(String::as_str)
    }

    /// File an audit entry under its strategy
    pub fn record_audit(&mut self, entry: MutationAuditEntry) {
        match entry.strategy {
            Strategy::Image => {
                self.image_audit.insert(entry.path.clone(), entry);
            }
            Strategy::Document => {
                self.document_audit.insert(entry.path.clone(), entry);
            }
            Strategy::Native => self.native_audit.push(entry),
        }
    }

    pub fn image_audit(&self) -> impl Iterator<Item = &MutationAuditEntry> {
        self.image_audit.values()
    }

    pub fn document_audit(&self) -> impl Iterator<Item = &MutationAuditEntry> {
        self.document_audit.values()
    }

    pub fn native_audit(&self) -> &[MutationAuditEntry] {
        &self.native_audit
    }

    /// Write the five-section report in one go
    pub fn serialize(&self, destination: &Path) -> Result<()> {
        let text = report::render(self);
        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(destination, text)?;
        tracing::info!("Mapping written to {:?}", destination);
        Ok(())
    }
}
