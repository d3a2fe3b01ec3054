//! Destination file names with collision-safe random disambiguators.

use std::borrow::Cow;
use std::collections::HashSet;
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Length of a disambiguator token in hex characters.
pub const TOKEN_LEN: usize = 8;

/// Source of short disambiguator tokens appended to destination names.
pub trait TokenSource {
    fn next_token(&mut self) -> String;
}

/// Random tokens taken from the first hex characters of a v4 UUID.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidTokens;

impl TokenSource for UuidTokens {
    fn next_token(&mut self) -> String {
        let mut token = uuid::Uuid::new_v4().simple().to_string();
        token.truncate(TOKEN_LEN);
        token
    }
}

/// Reproducible tokens from a seeded RNG.
#[derive(Debug, Clone)]
pub struct SeededTokens {
    rng: StdRng,
}

impl SeededTokens {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl TokenSource for SeededTokens {
    fn next_token(&mut self) -> String {
        format!("{:08x}", self.rng.random::<u32>())
    }
}

/// Counter tokens (`00000000`, `00000001`, ...).
#[derive(Debug, Default, Clone)]
pub struct SequentialTokens {
    next: u32,
}

impl TokenSource for SequentialTokens {
    fn next_token(&mut self) -> String {
        let token = format!("{:08x}", self.next);
        self.next = self.next.wrapping_add(1);
        token
    }
}

/// Parts of a destination name that stay fixed across collision retries.
#[derive(Debug, Clone)]
pub struct NameParts<'a> {
    pub label: &'a str,
    /// Lossily decoded so non-UTF-8 stems stay readable.
    pub stem: Option<Cow<'a, str>>,
    pub class_prefix: Option<usize>,
    /// Lowercased extension without the dot; empty when the source has none.
    pub extension: String,
}

impl<'a> NameParts<'a> {
    pub fn for_source(
        source: &'a Path,
        label: &'a str,
        label_index: usize,
        keep_original_stem: bool,
        prefix_class_index: bool,
    ) -> Self {
        let stem = keep_original_stem
            .then(|| source.file_stem().map(|stem| stem.to_string_lossy()))
            .flatten()
            .filter(|stem| !stem.is_empty());
        let extension = source
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        Self {
            label,
            stem,
            class_prefix: prefix_class_index.then_some(label_index),
            extension,
        }
    }

    /// Render `[{index:03}_]{label}[_{stem}]__{token}[.{ext}]`.
    pub fn render(&self, token: &str) -> String {
        let mut name = String::new();
        if let Some(index) = self.class_prefix {
            name.push_str(&format!("{index:03}_"));
        }
        name.push_str(self.label);
        if let Some(stem) = &self.stem {
            name.push('_');
            name.push_str(stem);
        }
        name.push_str("__");
        name.push_str(token);
        if !self.extension.is_empty() {
            name.push('.');
            name.push_str(&self.extension);
        }
        name
    }
}

/// Names handed out during one build, checked against the output directory.
#[derive(Debug)]
pub struct NameReserver<'a> {
    out_dir: &'a Path,
    reserved: HashSet<String>,
}

impl<'a> NameReserver<'a> {
    pub fn new(out_dir: &'a Path) -> Self {
        Self {
            out_dir,
            reserved: HashSet::new(),
        }
    }

    /// Draw tokens until the rendered name is unused, then reserve it.
    pub fn reserve(&mut self, parts: &NameParts<'_>, tokens: &mut dyn TokenSource) -> String {
        loop {
            let candidate = parts.render(&tokens.next_token());
            if self.is_taken(&candidate) {
                debug!(name = %candidate, "Destination name taken, drawing a new token");
                continue;
            }
            self.reserved.insert(candidate.clone());
            return candidate;
        }
    }

    pub fn len(&self) -> usize {
        self.reserved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reserved.is_empty()
    }

    fn is_taken(&self, candidate: &str) -> bool {
        if self.reserved.contains(candidate) {
            return true;
        }
        // symlink_metadata also sees dangling links left by earlier runs.
        std::fs::symlink_metadata(self.out_dir.join(candidate)).is_ok()
    }
}
