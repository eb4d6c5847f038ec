//! Best-effort content mutation
//!
//! [`ContentMutator`] picks at most one strategy per file from its lowercase
//! extension, where the file sits in the bundle, and the configured toggles
//! and filter rules. A failing strategy never surfaces as an error: the
//! original bytes come back with a failed audit entry.

pub mod document;
pub mod image;
pub mod native;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::mapping::{MutationAuditEntry, Strategy};
use crate::model;
use crate::rules::ContentFilter;
use crate::GuardConfig;

pub use self::document::{DocumentCodec, StructuredDocument, TextXmlCodec};
pub use self::image::{ImageOutcome, PixelTweak};
pub use self::native::{NativeMutator, ProcessBridge, ToolBridge, ToolOutput};

/// Extensions handled by the pixel tweak
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "bmp", "gif"];

/// Extension handled by namespace injection
pub const DOCUMENT_EXTENSION: &str = "xml";

/// Extension handled by section insertion
pub const NATIVE_EXTENSION: &str = "so";

/// Where a file ends up in the bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Renamed file under the resource root
    Resource,
    /// Anything that keeps its path: assets, libraries, whitelisted resources
    Raw,
}

impl Placement {
    fn allows(self, strategy: Strategy) -> bool {
        match self {
            Placement::Resource => matches!(strategy, Strategy::Image | Strategy::Document),
            Placement::Raw => matches!(strategy, Strategy::Image | Strategy::Native),
        }
    }
}

/// Per-strategy switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationToggles {
    pub images: bool,
    pub documents: bool,
    pub native_libs: bool,
}

impl MutationToggles {
    pub fn enabled(&self, strategy: Strategy) -> bool {
        match strategy {
            Strategy::Image => self.images,
            Strategy::Document => self.documents,
            Strategy::Native => self.native_libs,
        }
    }
}

impl Default for MutationToggles {
    fn default() -> Self {
        Self {
            images: true,
            documents: true,
            native_libs: true,
        }
    }
}

/// Bytes handed back by [`ContentMutator::mutate`]
#[derive(Debug, Clone)]
pub struct MutationOutcome {
    pub bytes: Vec<u8>,
    /// `None` when no strategy applied or the strategy chose to skip
    pub audit: Option<MutationAuditEntry>,
}

impl MutationOutcome {
    fn untouched(bytes: Vec<u8>) -> Self {
        Self { bytes, audit: None }
    }
}

/// Strategy for a lowercase extension, ignoring placement and switches
pub fn strategy_for_extension(extension: &str) -> Option<Strategy> {
    if IMAGE_EXTENSIONS.contains(&extension) {
        Some(Strategy::Image)
    } else if extension == DOCUMENT_EXTENSION {
        Some(Strategy::Document)
    } else if extension == NATIVE_EXTENSION {
        Some(Strategy::Native)
    } else {
        None
    }
}

/// Dispatches files to the image, document and native strategies
pub struct ContentMutator<B: ToolBridge = ProcessBridge> {
    rng: StdRng,
    filter: ContentFilter,
    toggles: MutationToggles,
    codec: Box<dyn DocumentCodec>,
    native: NativeMutator<B>,
}

impl<B: ToolBridge> ContentMutator<B> {
    pub fn new(config: &GuardConfig, bridge: B) -> Self {
        Self {
            rng: StdRng::from_os_rng(),
            filter: config.content_filter(),
            toggles: MutationToggles {
                images: config.mutate_images,
                documents: config.mutate_documents,
                native_libs: config.mutate_native_libs,
            },
            codec: Box::new(TextXmlCodec),
            native: NativeMutator::new(
                bridge,
                config.objcopy_path.clone(),
                config.scratch_dir(),
                config.section_name.clone(),
            ),
        }
    }

    /// Reproducible pixel, prefix and token choices
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.reseed(seed);
        self
    }

    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Replace the structured-document codec
    pub fn with_codec(mut self, codec: impl DocumentCodec + 'static) -> Self {
        self.codec = Box::new(codec);
        self
    }

    pub fn toggles(&self) -> MutationToggles {
        self.toggles
    }

    pub fn native(&self) -> &NativeMutator<B> {
        &self.native
    }

    /// Strategy that would run for `raw_path`, if any
    pub fn strategy_for(&self, raw_path: &str, placement: Placement) -> Option<Strategy> {
        let strategy = strategy_for_extension(&model::extension(raw_path))?;
        if !placement.allows(strategy) || !self.toggles.enabled(strategy) {
            return None;
        }
        if !self.filter.allows(raw_path) {
            tracing::debug!("[filter] not mutating {}", raw_path);
            return None;
        }
        Some(strategy)
    }

    /// Mutate one file
    ///
    /// `raw_path` is module-qualified, `target` is the final in-module path.
    pub fn mutate(
        &mut self,
        raw_path: &str,
        target: &str,
        bytes: Vec<u8>,
        placement: Placement,
    ) -> MutationOutcome {
        let Some(strategy) = self.strategy_for(raw_path, placement) else {
            return MutationOutcome::untouched(bytes);
        };

        let attempt = match strategy {
            Strategy::Image => match self::image::tweak_pixel(raw_path, &bytes, &mut self.rng) {
                Ok(ImageOutcome::Skipped(why)) => {
                    tracing::debug!("Skipping {}: {}", raw_path, why);
                    return MutationOutcome::untouched(bytes);
                }
                Ok(ImageOutcome::Tweaked { bytes: out, tweak }) => Ok((out, tweak.describe())),
                Err(e) => Err(e),
            },
            Strategy::Document => {
                self::document::inject_namespace(self.codec.as_ref(), &bytes, &mut self.rng)
            }
            Strategy::Native => self.native.insert_section(raw_path, &bytes, &mut self.rng),
        };

        match attempt {
            Ok((mutated, detail)) => {
                let audit = MutationAuditEntry::applied(
                    raw_path, target, strategy, &bytes, &mutated, detail,
                );
                tracing::debug!("[{}] {} -> {}", strategy, raw_path, audit.describe());
                MutationOutcome {
                    bytes: mutated,
                    audit: Some(audit),
                }
            }
            Err(e) => {
                tracing::warn!("[{}] keeping original {}: {}", strategy, raw_path, e);
                let audit =
                    MutationAuditEntry::failed(raw_path, target, strategy, &bytes, "", e.reason());
                MutationOutcome {
                    bytes,
                    audit: Some(audit),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::native::MockToolBridge;
    use super::*;
    use crate::error::Error;

    fn mutator(config: &GuardConfig) -> ContentMutator<MockToolBridge> {
        ContentMutator::new(config, MockToolBridge::new()).with_seed(11)
    }

    fn scratch_config(dir: &tempfile::TempDir) -> GuardConfig {
        GuardConfig {
            scratch_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        }
    }

    #[test]
    fn test_placement_gates_strategies() {
        let m = mutator(&GuardConfig::default());
        assert_eq!(
            m.strategy_for("base/res/layout/main.xml", Placement::Resource),
            Some(Strategy::Document)
        );
        assert_eq!(m.strategy_for("base/assets/config.xml", Placement::Raw), None);
        assert_eq!(
            m.strategy_for("base/lib/arm64-v8a/libx.so", Placement::Raw),
            Some(Strategy::Native)
        );
        assert_eq!(
            m.strategy_for("base/res/raw/libx.so", Placement::Resource),
            None
        );
        assert_eq!(
            m.strategy_for("base/assets/Banner.PNG", Placement::Raw),
            Some(Strategy::Image)
        );
        assert_eq!(m.strategy_for("base/assets/data.bin", Placement::Raw), None);
    }

    #[test]
    fn test_filter_and_toggles() {
        let config = GuardConfig {
            filter_content: vec!["keep.xml".into()],
            mutate_native_libs: false,
            ..Default::default()
        };
        let m = mutator(&config);
        assert_eq!(m.strategy_for("base/res/xml/keep.xml", Placement::Resource), None);
        assert_eq!(
            m.strategy_for("base/res/xml/other.xml", Placement::Resource),
            Some(Strategy::Document)
        );
        assert_eq!(m.strategy_for("base/lib/x86/liby.so", Placement::Raw), None);

        let off = GuardConfig {
            filter_content: vec!["keep.xml".into()],
            use_filter_content: false,
            ..Default::default()
        };
        assert_eq!(
            mutator(&off).strategy_for("base/res/xml/keep.xml", Placement::Resource),
            Some(Strategy::Document)
        );
    }

    #[test]
    fn test_unknown_extension_untouched() {
        let mut m = mutator(&GuardConfig::default());
        let out = m.mutate("base/assets/a.bin", "assets/a.bin", vec![1, 2, 3], Placement::Raw);
        assert_eq!(out.bytes, vec![1, 2, 3]);
        assert!(out.audit.is_none());
    }

    #[test]
    fn test_document_mutation_audited() {
        let mut m = mutator(&GuardConfig::default());
        let original = b"<resources>\n</resources>\n".to_vec();
        let out = m.mutate(
            "base/res/values/strings.xml",
            "res/a/a.xml",
            original.clone(),
            Placement::Resource,
        );
        let audit = out.audit.unwrap();
        assert!(audit.success);
        assert_eq!(audit.strategy, Strategy::Document);
        assert!(audit.detail.starts_with("xmlns:guard"));
        assert_ne!(out.bytes, original);
    }

    #[test]
    fn test_document_failure_keeps_bytes() {
        let mut m = mutator(&GuardConfig::default());
        let original = vec![0x03, 0x00, 0x08, 0x00, 0xff, 0xfe];
        let out = m.mutate(
            "base/res/layout/main.xml",
            "res/a/a.xml",
            original.clone(),
            Placement::Resource,
        );
        assert_eq!(out.bytes, original);
        let audit = out.audit.unwrap();
        assert!(!audit.success);
        assert_eq!(audit.before, audit.after);
        assert!(audit.failure.unwrap().starts_with("not UTF-8"));
    }

    #[test]
    fn test_native_tool_failure_keeps_bytes() {
        let scratch = tempfile::tempdir().unwrap();
        let mut bridge = MockToolBridge::new();
        bridge
            .expect_run()
            .times(1)
            .returning(|cmd, _| Err(Error::tool(cmd, "No such file or directory")));
        let mut m = ContentMutator::new(&scratch_config(&scratch), bridge).with_seed(1);

        let original = b"\x7fELF\x02\x01\x01".to_vec();
        let out = m.mutate(
            "base/lib/arm64-v8a/libfoo.so",
            "lib/arm64-v8a/libfoo.so",
            original.clone(),
            Placement::Raw,
        );
        assert_eq!(out.bytes, original);
        let audit = out.audit.unwrap();
        assert_eq!(audit.strategy, Strategy::Native);
        assert_eq!(audit.failure.as_deref(), Some("No such file or directory"));
    }

    #[test]
    fn test_image_failure_audited() {
        let mut m = mutator(&GuardConfig::default());
        let out = m.mutate(
            "base/res/drawable/icon.png",
            "res/a/a.png",
            b"not a png".to_vec(),
            Placement::Resource,
        );
        assert_eq!(out.bytes, b"not a png");
        assert!(!out.audit.unwrap().success);
    }
}
