//! Renaming engines
//!
//! - [`RenameEngine`] assigns directory and resource-name mappings and
//!   rewrites the resource table
//! - [`FileRenameEngine`] assigns paths to files under the resource root

pub mod files;
pub mod resources;

pub use files::FileRenameEngine;
pub use resources::{Classification, NameStats, RenameEngine};
