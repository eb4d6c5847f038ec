//! Resource file path assignment

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::mapping::MappingStore;
use crate::model::{self, ModuleEntry};
use crate::naming::ScopeSet;
use crate::rules::Whitelist;

/// Assigns obfuscated paths to files under the resource root
///
/// One naming scope per obfuscated directory; file stems already present in
/// the store are claimed up front.
pub struct FileRenameEngine<'a> {
    whitelist: &'a Whitelist,
    dir_scopes: ScopeSet,
}

impl<'a> FileRenameEngine<'a> {
    pub fn new(whitelist: &'a Whitelist, store: &MappingStore) -> Self {
        let mut dir_scopes = ScopeSet::new();
        for (_, obfuscated) in store.entry_file_mappings() {
            if let Some(dir) = model::parent_dir(obfuscated) {
                dir_scopes.scope(dir).claim(model::file_stem(obfuscated));
            }
        }
        Self {
            whitelist,
            dir_scopes,
        }
    }

    /// Map every resource file of a module
    ///
    /// Returns `<module>/<raw path> -> obfuscated path` for the files that
    /// move. Whitelisted files are absent and keep their path. Directories
    /// must already be mapped; a file whose directory is not is an error.
    pub fn assign_paths(
        &mut self,
        store: &mut MappingStore,
        module_name: &str,
        entries: &[ModuleEntry],
    ) -> Result<BTreeMap<String, String>> {
        let mut renamed = BTreeMap::new();

        for entry in entries.iter().filter(|e| e.is_resource()) {
            let dir = model::parent_dir(&entry.path)
                .ok_or_else(|| Error::MissingDirectory(entry.path.clone()))?;
            let obfuscated_dir = store
                .dir_mapping(dir)
                .ok_or_else(|| Error::MissingDirectory(dir.to_string()))?
                .to_string();

            let raw = format!("{}/{}", module_name, entry.path);
            if let Some(existing) = store.entry_file_mapping(&raw) {
                renamed.insert(raw, existing.to_string());
                continue;
            }

            if self.whitelist.matches(&raw) {
                tracing::debug!("[whitelist] keeping file {}", raw);
                continue;
            }

            let stem = self.dir_scopes.scope(&obfuscated_dir).allocate();
            let obfuscated = format!(
                "{}/{}{}",
                obfuscated_dir,
                stem,
                model::file_suffix(&entry.path)
            );
            store.put_entry_file_mapping(&raw, &obfuscated)?;
            renamed.insert(raw, obfuscated);
        }

        tracing::debug!("{}: {} resource files renamed", module_name, renamed.len());
        Ok(renamed)
    }
}
