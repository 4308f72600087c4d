//! Pattern index loading and content-addressed writing
//!
//! Loading is fail-fast: schema mismatch, out-of-range confidence, or
//! an uncompilable regex is a `Config` error at startup, never a
//! discovery-time failure.

use std::path::Path;

use regex::RegexBuilder;
use tracing::info;

use super::types::{DetectionDescriptor, DetectionPattern, PatternIndex, SCHEMA_VERSION};
use crate::error::{Error, Result};

/// A detection pattern prepared for repeated matching
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Case-insensitive substring (stored lowercase-folded)
    Substring(String),
    Regex(regex::Regex),
}

impl Matcher {
    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Self::Substring(needle) => text.to_lowercase().contains(needle),
            Self::Regex(re) => re.is_match(text),
        }
    }
}

/// Compiled pattern with its weight and source text
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub matcher: Matcher,
    pub confidence: f64,
    pub source: String,
}

/// Compiled pre/post pattern sets for one decoder
#[derive(Debug, Clone, Default)]
pub struct CompiledDetection {
    pub pre_auth: Vec<CompiledPattern>,
    pub post_auth: Vec<CompiledPattern>,
    pub page_hint: Option<String>,
}

fn compile_pattern(raw: &DetectionPattern) -> Result<CompiledPattern> {
    if !(0.0..=1.0).contains(&raw.confidence) {
        return Err(Error::Config(format!(
            "pattern '{}' has confidence {} outside [0, 1]",
            raw.pattern, raw.confidence
        )));
    }
    let matcher = if raw.regex {
        let re = RegexBuilder::new(&raw.pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::Config(format!("bad regex '{}': {}", raw.pattern, e)))?;
        Matcher::Regex(re)
    } else {
        Matcher::Substring(raw.pattern.to_lowercase())
    };
    Ok(CompiledPattern {
        matcher,
        confidence: raw.confidence,
        source: raw.pattern.clone(),
    })
}

impl DetectionDescriptor {
    /// Compile pattern text into matchers, validating weights
    pub fn compile(&self) -> Result<CompiledDetection> {
        Ok(CompiledDetection {
            pre_auth: self
                .pre_auth
                .iter()
                .map(compile_pattern)
                .collect::<Result<_>>()?,
            post_auth: self
                .post_auth
                .iter()
                .map(compile_pattern)
                .collect::<Result<_>>()?,
            page_hint: self.page_hint.clone(),
        })
    }
}

impl PatternIndex {
    /// Parse and validate an index document from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        let index: PatternIndex = serde_json::from_str(text)?;
        index.validate()?;
        Ok(index)
    }

    /// Load the index from a file path
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read pattern index {:?}: {}", path, e)))?;
        let index = Self::from_json(&text)?;
        info!(
            path = %path.display(),
            decoders = index.decoders.len(),
            "Pattern index loaded"
        );
        Ok(index)
    }

    fn validate(&self) -> Result<()> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(Error::Config(format!(
                "pattern index schema version {} unsupported (expected {})",
                self.schema_version, SCHEMA_VERSION
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for decoder in &self.decoders {
            if !seen.insert(decoder.decoder_id.as_str()) {
                return Err(Error::Config(format!(
                    "duplicate decoder id '{}'",
                    decoder.decoder_id
                )));
            }
            // Compilation doubles as weight/regex validation
            decoder.detection.compile()?;
        }
        Ok(())
    }

    /// Semantic content of the index, with `generated_at` excluded
    fn semantic_json(&self) -> Result<serde_json::Value> {
        let mut value = serde_json::to_value(self)?;
        if let Some(obj) = value.as_object_mut() {
            obj.remove("generated_at");
        }
        Ok(value)
    }

    /// Write the index only when its semantic content differs from the
    /// committed file. Keeps regeneration from churning on the
    /// generation timestamp alone.
    ///
    /// Returns true when the file was (re)written.
    pub fn write_if_changed(&self, path: impl AsRef<Path>) -> Result<bool> {
        let path = path.as_ref();
        if let Ok(existing_text) = std::fs::read_to_string(path) {
            if let Ok(existing) = Self::from_json(&existing_text) {
                if existing.semantic_json()? == self.semantic_json()? {
                    info!(path = %path.display(), "Pattern index unchanged, skipping write");
                    return Ok(false);
                }
            }
        }
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        info!(path = %path.display(), "Pattern index written");
        Ok(true)
    }
}
