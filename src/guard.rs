//! Run driver
//!
//! Walks every module of a bundle in order: directories, resource names and
//! file paths are assigned first, then the resource table is rewritten and
//! every file goes through the content mutator under its final path.

use std::path::Path;

use crate::error::{Error, Result};
use crate::mapping::MappingStore;
use crate::model::{Bundle, BundleModule, ModuleEntry};
use crate::mutate::{ContentMutator, Placement, ProcessBridge, ToolBridge};
use crate::rename::{FileRenameEngine, RenameEngine};
use crate::rules::Whitelist;
use crate::GuardConfig;

/// One obfuscation run
///
/// Owns the mapping store for the run. Use [`ResGuard::write_report`] at the
/// end to persist it for the next incremental build.
pub struct ResGuard<B: ToolBridge = ProcessBridge> {
    whitelist: Whitelist,
    store: MappingStore,
    mutator: ContentMutator<B>,
}

impl ResGuard<ProcessBridge> {
    /// Run with the object-copy tool invoked as a child process
    pub fn new(config: &GuardConfig) -> Result<Self> {
        Self::with_bridge(config, ProcessBridge)
    }
}

impl<B: ToolBridge> ResGuard<B> {
    /// Seed from `config.mapping_path` when it points at an existing report
    pub fn with_bridge(config: &GuardConfig, bridge: B) -> Result<Self> {
        let store = MappingStore::load(config.mapping_path.as_deref())?;
        Self::with_store(config, store, bridge)
    }

    pub fn with_store(config: &GuardConfig, store: MappingStore, bridge: B) -> Result<Self> {
        store.check_dir_roots()?;
        let whitelist = config.whitelist()?;
        tracing::debug!("{} whitelist rules active", whitelist.len());
        Ok(Self {
            whitelist,
            store,
            mutator: ContentMutator::new(config, bridge),
        })
    }

    pub fn store(&self) -> &MappingStore {
        &self.store
    }

    pub fn mutator_mut(&mut self) -> &mut ContentMutator<B> {
        &mut self.mutator
    }

    pub fn into_store(self) -> MappingStore {
        self.store
    }

    /// Rename and mutate every module
    ///
    /// Collision and missing-directory errors abort the run; content
    /// mutation failures only show up in the audit trail.
    pub fn obfuscate(&mut self, bundle: Bundle) -> Result<Bundle> {
        tracing::info!("Obfuscating bundle with {} modules", bundle.modules.len());
        let modules = bundle
            .modules
            .into_iter()
            .map(|module| self.obfuscate_module(module))
            .collect::<Result<Vec<_>>>()?;

        tracing::info!(
            "Done: {} dirs, {} names, {} files mapped; \
             {} images, {} documents, {} libraries audited",
            self.store.dir_mappings().count(),
            self.store.resource_mappings().count(),
            self.store.entry_file_mappings().count(),
            self.store.image_audit().count(),
            self.store.document_audit().count(),
            self.store.native_audit().len()
        );
        Ok(Bundle { modules })
    }

    /// Rename and mutate one module
    ///
    /// A module without a resource table keeps every path.
    pub fn obfuscate_module(&mut self, mut module: BundleModule) -> Result<BundleModule> {
        let entries = std::mem::take(&mut module.entries);

        let renamed = match module.resource_table.take() {
            Some(table) => {
                let mut names = RenameEngine::new(&self.whitelist, &self.store);
                let dirs = names.assign_directories(&mut self.store, &table)?;
                let stats = names.assign_names(&mut self.store, &table)?;

                let mut files = FileRenameEngine::new(&self.whitelist, &self.store);
                let renamed = files.assign_paths(&mut self.store, &module.name, &entries)?;

                let rewritten = names.rewrite_table(&mut self.store, &module.name, &table);
                module.resource_table = Some(rewritten);
                tracing::info!(
                    "Module {}: {} new dirs, {} new names, {} reused, {} whitelisted, \
                     {} files renamed",
                    module.name,
                    dirs,
                    stats.allocated,
                    stats.reused,
                    stats.whitelisted,
                    renamed.len()
                );
                renamed
            }
            None => {
                tracing::debug!("Module {} has no resource table", module.name);
                Default::default()
            }
        };

        module.entries = entries
            .into_iter()
            .map(|entry| {
                let raw = module.qualified_path(&entry.path);
                let (target, placement) = match renamed.get(&raw) {
                    Some(obfuscated) => (obfuscated.clone(), Placement::Resource),
                    None => (entry.path, Placement::Raw),
                };
                let outcome = self.mutator.mutate(&raw, &target, entry.bytes, placement);
                if let Some(audit) = outcome.audit {
                    self.store.record_audit(audit);
                }
                ModuleEntry::new(target, outcome.bytes)
            })
            .collect();

        Ok(module)
    }

    /// Persist the store; an existing file is never overwritten
    pub fn write_report(&self, destination: &Path) -> Result<()> {
        if destination.exists() {
            return Err(Error::ReportExists(destination.display().to_string()));
        }
        self.store.serialize(destination)
    }
}
