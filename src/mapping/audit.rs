//! Per-file content mutation audit records

use sha2::{Digest, Sha256};
use std::fmt;

/// Content mutation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Raster pixel tweak
    Image,
    /// Namespace declaration injected into a structured document
    Document,
    /// Extra section appended to a native library
    Native,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Image => "image",
            Strategy::Document => "document",
            Strategy::Native => "native",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one mutation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationAuditEntry {
    /// Module-qualified raw path
    pub path: String,
    /// Final in-module path (obfuscated or unchanged)
    pub target: String,
    pub strategy: Strategy,
    pub success: bool,
    pub before: String,
    pub after: String,
    /// Strategy-specific description (pixel, declaration, section)
    pub detail: String,
    pub failure: Option<String>,
}

impl MutationAuditEntry {
    /// Record an applied mutation
    pub fn applied(
        path: &str,
        target: &str,
        strategy: Strategy,
        original: &[u8],
        mutated: &[u8],
        detail: impl Into<String>,
    ) -> Self {
        let before = checksum(original);
        let after = checksum(mutated);
        Self {
            path: path.to_string(),
            target: target.to_string(),
            strategy,
            success: before != after,
            before,
            after,
            detail: detail.into(),
            failure: None,
        }
    }

    /// Record a failed attempt; the bytes are unchanged
    pub fn failed(
        path: &str,
        target: &str,
        strategy: Strategy,
        original: &[u8],
        detail: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        let sum = checksum(original);
        Self {
            path: path.to_string(),
            target: target.to_string(),
            strategy,
            success: false,
            before: sum.clone(),
            after: sum,
            detail: detail.into(),
            failure: Some(reason.into()),
        }
    }

    /// One-line description as written after `->` in the report
    pub fn describe(&self) -> String {
        let mut line = String::new();
        if self.target != self.path {
            line.push_str(&format!("{} ", self.target));
        }
        if !self.detail.is_empty() {
            line.push_str(&format!("{} ", self.detail));
        }
        line.push_str(&format!(
            "sha256:{} -> {} result:{}",
            short(&self.before),
            short(&self.after),
            self.success
        ));
        if let Some(ref reason) = self.failure {
            line.push_str(&format!(" error:{}", reason.replace('\n', " ")));
        }
        line
    }
}

fn short(sum: &str) -> &str {
    &sum[..sum.len().min(16)]
}

/// SHA-256 hex digest of `bytes`
pub fn checksum(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_is_hex() {
        let sum = checksum(b"abc");
        assert_eq!(
            sum,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_failed_keeps_checksum() {
        let entry = MutationAuditEntry::failed(
            "base/res/a.png",
            "res/a/a.png",
            Strategy::Image,
            b"data",
            "",
            "decode failed",
        );
        assert!(!entry.success);
        assert_eq!(entry.before, entry.after);
        let line = entry.describe();
        assert!(line.starts_with("res/a/a.png "));
        assert!(line.ends_with("result:false error:decode failed"));
    }

    #[test]
    fn test_applied_success_from_checksums() {
        let entry = MutationAuditEntry::applied(
            "base/lib/libx.so",
            "lib/libx.so",
            Strategy::Native,
            b"one",
            b"two",
            "section:.rgtag",
        );
        assert!(entry.success);
        assert!(entry.describe().contains("section:.rgtag"));
    }
}
