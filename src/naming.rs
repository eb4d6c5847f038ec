//! Short name generation
//!
//! Names are enumerated base-N style: every one-character name first, then
//! every two-character name, and so on. The first character is a lowercase
//! letter, later characters may also be digits or `_`, so every name is a
//! legal identifier and a legal file name.

use smallvec::{smallvec, SmallVec};
use std::collections::{HashMap, HashSet};

const LEADING: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const TRAILING: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789_";

/// Names some file systems refuse to create
const RESERVED: &[&str] = &["con", "prn", "aux", "nul"];

/// Enumerates short names, skipping names already used in the scope
///
/// The generator is a plain odometer. For a fixed sequence of `reset` and
/// [`next_name`](Self::next_name) calls against fixed `used` sets the output
/// is fixed.
#[derive(Debug, Clone)]
pub struct NameGenerator {
    digits: SmallVec<[u8; 6]>,
}

impl Default for NameGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl NameGenerator {
    pub fn new() -> Self {
        Self {
            digits: smallvec![0],
        }
    }

    /// Restart enumeration from `a`
    pub fn reset(&mut self) {
        self.digits.clear();
        self.digits.push(0);
    }

    /// Next name that is neither in `used` nor reserved
    pub fn next_name(&mut self, used: &HashSet<String>) -> String {
        loop {
            let candidate = self.current();
            self.advance();
            if !used.contains(&candidate) && !RESERVED.contains(&candidate.as_str()) {
                tracing::trace!("Allocated name {}", candidate);
                return candidate;
            }
        }
    }

    fn current(&self) -> String {
        self.digits
            .iter()
            .enumerate()
            .map(|(i, &d)| {
                let alphabet = if i == 0 { LEADING } else { TRAILING };
                alphabet[d as usize] as char
            })
            .collect()
    }

    fn advance(&mut self) {
        for i in (0..self.digits.len()).rev() {
            let radix = if i == 0 { LEADING.len() } else { TRAILING.len() };
            if (self.digits[i] as usize) + 1 < radix {
                self.digits[i] += 1;
                return;
            }
            self.digits[i] = 0;
        }
        // Every name of this length is spent
        self.digits.push(0);
        for d in self.digits.iter_mut() {
            *d = 0;
        }
    }
}

/// One naming scope: a generator plus the names already taken in it
#[derive(Debug, Clone, Default)]
pub struct NameScope {
    generator: NameGenerator,
    used: HashSet<String>,
}

impl NameScope {
    /// Mark a name as taken (e.g. recovered from a previous run)
    pub fn claim(&mut self, name: impl Into<String>) {
        self.used.insert(name.into());
    }

    /// Allocate and claim a fresh name
    pub fn allocate(&mut self) -> String {
        let name = self.generator.next_name(&self.used);
        self.used.insert(name.clone());
        name
    }

    pub fn is_used(&self, name: &str) -> bool {
        self.used.contains(name)
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }
}

/// Independent scopes keyed by scope name (resource type, directory, ...)
#[derive(Debug, Clone, Default)]
pub struct ScopeSet {
    scopes: HashMap<String, NameScope>,
}

impl ScopeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope for `key`, created fresh (generator at `a`) on first use
    pub fn scope(&mut self, key: &str) -> &mut NameScope {
        self.scopes.entry(key.to_string()).or_default()
    }

    pub fn get(&self, key: &str) -> Option<&NameScope> {
        self.scopes.get(key)
    }
}
