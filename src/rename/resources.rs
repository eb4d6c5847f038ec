//! Resource name and directory assignment

use crate::error::Result;
use crate::mapping::MappingStore;
use crate::model::{self, ResourceTable, RESOURCE_ROOT};
use crate::naming::{NameScope, ScopeSet};
use crate::rules::{is_platform_name, Whitelist};

/// How a resource name is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Platform namespace, never mapped
    Excluded,
    /// Matches a whitelist rule, never mapped
    Whitelisted,
    /// Gets a short name
    Obfuscate,
}

/// Counts of what [`RenameEngine::assign_names`] did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NameStats {
    pub excluded: usize,
    pub whitelisted: usize,
    pub removed: usize,
    pub reused: usize,
    pub allocated: usize,
}

/// Assigns directory and resource-name mappings for one module
///
/// Scopes are rebuilt from the store on construction, so names handed out
/// by earlier modules or earlier runs are never reused or shortened.
pub struct RenameEngine<'a> {
    whitelist: &'a Whitelist,
    dir_scope: NameScope,
    type_scopes: ScopeSet,
}

impl<'a> RenameEngine<'a> {
    pub fn new(whitelist: &'a Whitelist, store: &MappingStore) -> Self {
        let mut dir_scope = NameScope::default();
        for (_, obfuscated) in store.dir_mappings() {
            dir_scope.claim(model::file_name(obfuscated));
        }

        let mut type_scopes = ScopeSet::new();
        for (_, obfuscated) in store.resource_mappings() {
            type_scopes
                .scope(model::type_name(obfuscated))
                .claim(model::leaf_name(obfuscated));
        }

        Self {
            whitelist,
            dir_scope,
            type_scopes,
        }
    }

    pub fn classify(&self, full_name: &str) -> Classification {
        if is_platform_name(full_name) {
            Classification::Excluded
        } else if self.whitelist.matches(full_name) {
            Classification::Whitelisted
        } else {
            Classification::Obfuscate
        }
    }

    /// Give every unmapped directory referenced by the table a short name
    /// under the resource root
    pub fn assign_directories(
        &mut self,
        store: &mut MappingStore,
        table: &ResourceTable,
    ) -> Result<usize> {
        let mut assigned = 0;
        for path in table.file_references() {
            let Some(dir) = model::parent_dir(path) else {
                continue;
            };
            if store.dir_mapping(dir).is_some() {
                continue;
            }
            let obfuscated = format!("{}/{}", RESOURCE_ROOT, self.dir_scope.allocate());
            tracing::debug!("Directory {} -> {}", dir, obfuscated);
            store.put_dir_mapping(dir, &obfuscated)?;
            assigned += 1;
        }
        Ok(assigned)
    }

    /// Classify every entry and create, reuse or drop its name mapping
    pub fn assign_names(
        &mut self,
        store: &mut MappingStore,
        table: &ResourceTable,
    ) -> Result<NameStats> {
        let mut stats = NameStats::default();

        for entry in &table.entries {
            let full_name = entry.full_name();
            let existing = store.resource_mapping(&full_name).map(str::to_string);

            match (self.classify(&full_name), existing) {
                (Classification::Excluded, _) => stats.excluded += 1,
                (Classification::Whitelisted, Some(_)) => {
                    tracing::info!(
                        "[whitelist] dropping previous mapping of {} ({})",
                        full_name,
                        entry.id_string()
                    );
                    store.remove_resource_mapping(&full_name);
                    stats.removed += 1;
                    stats.whitelisted += 1;
                }
                (Classification::Whitelisted, None) => {
                    tracing::debug!("[whitelist] keeping {} ({})", full_name, entry.id_string());
                    stats.whitelisted += 1;
                }
                (Classification::Obfuscate, Some(obfuscated)) => {
                    self.type_scopes
                        .scope(&entry.type_name)
                        .claim(model::leaf_name(&obfuscated));
                    store.record_name_id(&full_name, &entry.id_string());
                    stats.reused += 1;
                }
                (Classification::Obfuscate, None) => {
                    let leaf = self.type_scopes.scope(&entry.type_name).allocate();
                    let obfuscated = model::full_name(&entry.package, &entry.type_name, &leaf);
                    store.put_resource_mapping(&full_name, &obfuscated)?;
                    store.record_name_id(&full_name, &entry.id_string());
                    stats.allocated += 1;
                }
            }
        }

        tracing::debug!("Name assignment: {:?}", stats);
        Ok(stats)
    }

    /// Copy of the table with mapped names and file paths substituted
    ///
    /// Only the leaf of a name changes; package and type are kept. File
    /// paths are looked up under `<module>/<path>`.
    pub fn rewrite_table(
        &self,
        store: &mut MappingStore,
        module_name: &str,
        table: &ResourceTable,
    ) -> ResourceTable {
        let mut rewritten = table.clone();

        for entry in &mut rewritten.entries {
            let full_name = entry.full_name();
            let id = entry.id_string();

            if let Some(obfuscated) = store.resource_mapping(&full_name) {
                entry.name = model::leaf_name(obfuscated).to_string();
            }

            for value in &mut entry.config_values {
                let Some(ref path) = value.file_path else {
                    continue;
                };
                let raw = format!("{}/{}", module_name, path);
                if let Some(obfuscated) = store.entry_file_mapping(&raw).map(str::to_string) {
                    store.record_path_id(&raw, &id);
                    value.file_path = Some(obfuscated);
                }
            }
        }

        rewritten
    }
}
