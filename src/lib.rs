//! # resguard
//!
//! Resource renaming and content mutation for packaged app bundles.
//!
//! Two builds with identical resources come out with different resource
//! names, different file paths and different content checksums, while every
//! reference in the resource table still resolves. Mappings from a previous
//! run are reused, so incremental builds stay stable.
//!
//! ## Features
//!
//! - **Short names** - `a`, `b`, ... `aa`, per resource type and per directory
//! - **Whitelist** - glob rules keep names and files untouched
//! - **Incremental** - the mapping report of one run seeds the next
//! - **Content mutation** - pixel tweak, inert namespace declaration, extra
//!   native library section; failures fall back to the original bytes
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use resguard::{Bundle, GuardConfig, ResGuard};
//! use std::path::Path;
//!
//! fn run(bundle: Bundle) -> resguard::Result<Bundle> {
//!     let config = GuardConfig {
//!         whitelist: vec!["app_name".into(), "*:drawable/ic_launcher*".into()],
//!         mapping_path: Some("build/resguard/previous.txt".into()),
//!         ..Default::default()
//!     };
//!
//!     let mut guard = ResGuard::new(&config)?;
//!     let bundle = guard.obfuscate(bundle)?;
//!     guard.write_report(Path::new("build/resguard/mapping.txt"))?;
//!     Ok(bundle)
//! }
//! ```
//!
//! ## Configuration
//!
//! ```rust,no_run
//! use resguard::GuardConfig;
//!
//! # fn main() -> resguard::Result<()> {
//! // Everything from a JSON file, missing keys take defaults
//! let config = GuardConfig::load("resguard.json")?;
//!
//! // Rename only, no content mutation
//! let quiet = GuardConfig::rename_only();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod guard;
pub mod mapping;
pub mod model;
pub mod mutate;
pub mod naming;
pub mod rename;
pub mod rules;

// Re-exports
pub use error::{Error, Result};
pub use guard::ResGuard;
pub use mapping::{MappingStore, MutationAuditEntry, Strategy};
pub use model::{Bundle, BundleModule, ConfigValue, ModuleEntry, ResourceEntry, ResourceTable};
pub use mutate::{
    ContentMutator, DocumentCodec, MutationOutcome, Placement, ProcessBridge, StructuredDocument,
    ToolBridge, ToolOutput,
};
pub use naming::NameGenerator;
pub use rename::{FileRenameEngine, RenameEngine};
pub use rules::{ContentFilter, Whitelist};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for a run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Glob rules for names and files that keep their identity
    pub whitelist: Vec<String>,
    pub use_whitelist: bool,
    /// Path suffixes exempt from content mutation
    pub filter_content: Vec<String>,
    pub use_filter_content: bool,
    /// Report of a previous run to seed from
    pub mapping_path: Option<PathBuf>,
    /// Tweak one pixel of raster images
    pub mutate_images: bool,
    /// Inject a namespace declaration into documents
    pub mutate_documents: bool,
    /// Append a section to native libraries
    pub mutate_native_libs: bool,
    /// Object-copy tool used for native libraries
    pub objcopy_path: String,
    /// Scratch root for native library staging (None = temp dir)
    pub scratch_dir: Option<PathBuf>,
    /// Name of the appended section
    pub section_name: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            whitelist: Vec::new(),
            use_whitelist: true,
            filter_content: Vec::new(),
            use_filter_content: true,
            mapping_path: None,
            mutate_images: true,
            mutate_documents: true,
            mutate_native_libs: true,
            objcopy_path: "llvm-objcopy".to_string(),
            scratch_dir: None,
            section_name: ".rgtag".to_string(),
        }
    }
}

impl GuardConfig {
    /// Rename only, no content mutation
    pub fn rename_only() -> Self {
        Self {
            mutate_images: false,
            mutate_documents: false,
            mutate_native_libs: false,
            ..Default::default()
        }
    }

    /// Read a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        let config = serde_json::from_str(&text)?;
        tracing::debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Compiled whitelist; empty when disabled
    pub fn whitelist(&self) -> Result<Whitelist> {
        if self.use_whitelist {
            Whitelist::new(self.whitelist.iter().map(String::as_str))
        } else {
            Ok(Whitelist::default())
        }
    }

    /// Content filter; empty when disabled
    pub fn content_filter(&self) -> ContentFilter {
        if self.use_filter_content {
            ContentFilter::new(self.filter_content.iter().map(String::as_str))
        } else {
            ContentFilter::default()
        }
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("resguard"))
    }
}
