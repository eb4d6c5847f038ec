//! Native library section insertion
//!
//! Hands the library to an object-copy tool that appends one non-loaded,
//! read-only section holding a random token and a timestamp. Two scratch
//! directories are reused for every call, so only one mutation may run at a
//! time per scratch root.

use aho_corasick::AhoCorasick;
use base64::Engine;
use rand::Rng;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};
use crate::model;

/// Exit status and captured streams of an external command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs external commands
#[cfg_attr(test, mockall::automock)]
pub trait ToolBridge {
    fn run(&self, command: &str, args: &[String]) -> Result<ToolOutput>;
}

/// [`ToolBridge`] backed by a blocking child process
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessBridge;

impl ToolBridge for ProcessBridge {
    fn run(&self, command: &str, args: &[String]) -> Result<ToolOutput> {
        tracing::debug!("Running {} {}", command, args.join(" "));
        let output = Command::new(command)
            .args(args)
            .output()
            .map_err(|e| Error::tool(command, e.to_string()))?;
        Ok(ToolOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Section insertion through an object-copy tool
pub struct NativeMutator<B: ToolBridge> {
    bridge: B,
    tool: String,
    scratch_dir: PathBuf,
    section: String,
}

impl<B: ToolBridge> NativeMutator<B> {
    pub fn new(
        bridge: B,
        tool: impl Into<String>,
        scratch_dir: impl Into<PathBuf>,
        section: impl Into<String>,
    ) -> Self {
        Self {
            bridge,
            tool: tool.into(),
            scratch_dir: scratch_dir.into(),
            section: section.into(),
        }
    }

    /// Libraries are copied here before the tool runs
    pub fn staging_dir(&self) -> PathBuf {
        self.scratch_dir.join("staging")
    }

    /// The tool writes mutated libraries here
    pub fn output_dir(&self) -> PathBuf {
        self.scratch_dir.join("output")
    }

    pub fn section(&self) -> &str {
        &self.section
    }

    pub fn bridge(&self) -> &B {
        &self.bridge
    }

    /// Append a fresh token section to `bytes`
    ///
    /// Returns the mutated bytes and a description of the section.
    pub fn insert_section<R: Rng>(
        &self,
        raw_path: &str,
        bytes: &[u8],
        rng: &mut R,
    ) -> Result<(Vec<u8>, String)> {
        check_staging_path(raw_path)?;
        let relative = model::parent_dir(raw_path).unwrap_or("");
        let name = model::file_name(raw_path);

        let staging = self.staging_dir().join(relative);
        let output = self.output_dir().join(relative);
        reset_dir(&self.staging_dir(), &staging)?;
        reset_dir(&self.output_dir(), &output)?;

        let input_file = staging.join(name);
        let output_file = output.join(name);
        fs::write(&input_file, bytes)?;

        let token = section_token(rng);
        let token_file = self.scratch_dir.join("section.txt");
        fs::write(&token_file, &token)?;

        let args = vec![
            "--add-section".to_string(),
            format!("{}={}", self.section, token_file.display()),
            "--set-section-flags".to_string(),
            format!("{}=noload,readonly", self.section),
            input_file.display().to_string(),
            output_file.display().to_string(),
        ];

        let result = self.bridge.run(&self.tool, &args)?;
        if !result.success() {
            return Err(Error::tool(
                &self.tool,
                format!(
                    "exit code {:?}: {}",
                    result.exit_code,
                    result.stderr.trim()
                ),
            ));
        }

        let mutated = fs::read(&output_file)?;
        let finder = AhoCorasick::new([token.as_bytes()])
            .map_err(|e| Error::mutation("native", e.to_string()))?;
        if !finder.is_match(&mutated) {
            return Err(Error::mutation(
                "native",
                format!("section {} not found in tool output", self.section),
            ));
        }

        tracing::debug!(
            "Inserted section {} into {} ({} -> {} bytes)",
            self.section,
            raw_path,
            bytes.len(),
            mutated.len()
        );
        Ok((mutated, format!("section:{} token:{}", self.section, token)))
    }
}

/// Staged paths must stay inside the scratch root
fn check_staging_path(raw_path: &str) -> Result<()> {
    let path = Path::new(raw_path);
    let confined = path
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !confined || path.file_name().is_none() {
        return Err(Error::mutation(
            "native",
            format!("refusing to stage {} outside the scratch directory", raw_path),
        ));
    }
    Ok(())
}

/// Best-effort clear of `root`, then create `dir`
fn reset_dir(root: &Path, dir: &Path) -> Result<()> {
    let _ = fs::remove_dir_all(root);
    fs::create_dir_all(dir)?;
    Ok(())
}

/// Random token plus a millisecond timestamp
fn section_token<R: Rng>(rng: &mut R) -> String {
    let mut raw = [0u8; 16];
    rng.fill(&mut raw);
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!(
        "{}:{}",
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(raw),
        millis
    )
}
