//! Bundle model contract
//!
//! Plain data handed to resguard by the bundle reader. Container I/O and the
//! binary resource-table schema live outside this crate; these types carry
//! only what renaming and mutation need.

/// Canonical resource root inside every module
pub const RESOURCE_ROOT: &str = "res";

/// Reserved prefix of platform-namespaced resource names
pub const PLATFORM_PREFIX: &str = "android:";

/// A packaged bundle: an ordered list of modules
#[derive(Debug, Clone, Default)]
pub struct Bundle {
    pub modules: Vec<BundleModule>,
}

/// One module of a bundle
#[derive(Debug, Clone)]
pub struct BundleModule {
    /// Module name (e.g. `base`)
    pub name: String,
    /// Resource table, absent for code-only modules
    pub resource_table: Option<ResourceTable>,
    /// Files in the module
    pub entries: Vec<ModuleEntry>,
}

impl BundleModule {
    /// Module-qualified key for a path inside this module
    pub fn qualified_path(&self, path: &str) -> String {
        format!("{}/{}", self.name, path)
    }
}

/// Resource table of one module
#[derive(Debug, Clone, Default)]
pub struct ResourceTable {
    pub entries: Vec<ResourceEntry>,
}

impl ResourceTable {
    /// Every file path referenced by a config value, in table order
    pub fn file_references(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .flat_map(|e| e.config_values.iter())
            .filter_map(|v| v.file_path.as_deref())
    }
}

/// A single resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    pub id: u32,
    pub package: String,
    pub type_name: String,
    pub name: String,
    pub config_values: Vec<ConfigValue>,
}

impl ResourceEntry {
    pub fn new(id: u32, package: &str, type_name: &str, name: &str) -> Self {
        Self {
            id,
            package: package.to_string(),
            type_name: type_name.to_string(),
            name: name.to_string(),
            config_values: Vec::new(),
        }
    }

    /// Add a config value backed by a file
    pub fn with_file(mut self, config: &str, path: &str) -> Self {
        self.config_values.push(ConfigValue {
            config: config.to_string(),
            file_path: Some(path.to_string()),
        });
        self
    }

    /// Add a config value with an inline (non-file) value
    pub fn with_value(mut self, config: &str) -> Self {
        self.config_values.push(ConfigValue {
            config: config.to_string(),
            file_path: None,
        });
        self
    }

    /// Fully-qualified name: `package:type/name`
    pub fn full_name(&self) -> String {
        full_name(&self.package, &self.type_name, &self.name)
    }

    /// Hex id as printed in reports
    pub fn id_string(&self) -> String {
        format!("0x{:08x}", self.id)
    }
}

/// One configuration variant of a resource value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValue {
    /// Configuration qualifier (e.g. `hdpi`, empty for default)
    pub config: String,
    /// Module-relative file path when the value is file-backed
    pub file_path: Option<String>,
}

/// A file inside a module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleEntry {
    pub path: String,
    pub bytes: Vec<u8>,
}

impl ModuleEntry {
    pub fn new(path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            bytes: bytes.into(),
        }
    }

    /// Whether the file lives under the resource root
    pub fn is_resource(&self) -> bool {
        is_under_resource_root(&self.path)
    }
}

/// Build a fully-qualified resource name
pub fn full_name(package: &str, type_name: &str, name: &str) -> String {
    format!("{}:{}/{}", package, type_name, name)
}

/// Leaf (entry) name of a fully-qualified resource name
pub fn leaf_name(full: &str) -> &str {
    full.rsplit('/').next().unwrap_or(full)
}

/// Type name of a fully-qualified resource name
pub fn type_name(full: &str) -> &str {
    let head = full.rsplit_once('/').map(|(h, _)| h).unwrap_or("");
    head.rsplit_once(':').map(|(_, t)| t).unwrap_or(head)
}

/// Parent directory of a `/`-separated path, if any
pub fn parent_dir(path: &str) -> Option<&str> {
    path.rsplit_once('/').map(|(dir, _)| dir).filter(|d| !d.is_empty())
}

/// File name component of a `/`-separated path
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Everything from the first `.` of the file name (`icon.9.png` -> `.9.png`)
pub fn file_suffix(path: &str) -> &str {
    let name = file_name(path);
    name.find('.').map(|i| &name[i..]).unwrap_or("")
}

/// File name without its suffix
pub fn file_stem(path: &str) -> &str {
    let name = file_name(path);
    name.find('.').map(|i| &name[..i]).unwrap_or(name)
}

/// Lowercase extension after the last `.` of the file name
pub fn extension(path: &str) -> String {
    let name = file_name(path);
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Whether a module-relative path lives under the resource root
pub fn is_under_resource_root(path: &str) -> bool {
    path.strip_prefix(RESOURCE_ROOT)
        .map(|rest| rest.starts_with('/'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name_parts() {
        let name = full_name("com.example.app", "drawable", "icon");
        assert_eq!(name, "com.example.app:drawable/icon");
        assert_eq!(leaf_name(&name), "icon");
        assert_eq!(type_name(&name), "drawable");
    }

    #[test]
    fn test_path_helpers() {
        assert_eq!(parent_dir("res/drawable-hdpi/icon.png"), Some("res/drawable-hdpi"));
        assert_eq!(parent_dir("icon.png"), None);
        assert_eq!(file_suffix("res/drawable/btn.9.png"), ".9.png");
        assert_eq!(file_stem("res/drawable/btn.9.png"), "btn");
        assert_eq!(file_suffix("res/raw/LICENSE"), "");
        assert_eq!(extension("lib/arm64-v8a/libfoo.SO"), "so");
        assert_eq!(extension("res/drawable/btn.9.png"), "png");
    }

    #[test]
    fn test_resource_root() {
        assert!(is_under_resource_root("res/layout/main.xml"));
        assert!(!is_under_resource_root("resources.pb"));
        assert!(!is_under_resource_root("assets/res/x.png"));
    }

    #[test]
    fn test_file_references() {
        let table = ResourceTable {
            entries: vec![
                ResourceEntry::new(0x7f01_0000, "app", "drawable", "icon")
                    .with_file("hdpi", "res/drawable-hdpi/icon.png")
                    .with_file("xhdpi", "res/drawable-xhdpi/icon.png"),
                ResourceEntry::new(0x7f02_0000, "app", "string", "title").with_value(""),
            ],
        };
        let refs: Vec<_> = table.file_references().collect();
        assert_eq!(
            refs,
            vec!["res/drawable-hdpi/icon.png", "res/drawable-xhdpi/icon.png"]
        );
        assert_eq!(table.entries[0].id_string(), "0x7f010000");
    }
}
