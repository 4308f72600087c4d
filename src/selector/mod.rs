//! Decoder Selector
//!
//! Ranks candidate decoders against probe evidence. Pre-auth matches
//! only gate candidacy (elimination); the score comes entirely from
//! post-auth pattern matches, so shared login boilerplate can never
//! pick a decoder on its own.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::decoder::DecoderRegistry;
use crate::pattern_index::CompiledDetection;

/// Selector tuning knobs. Defaults are pinned by tests.
#[derive(Debug, Clone)]
pub struct SelectorConfig {
    /// Added to the score of human-verified decoders to break ties in
    /// their favor
    pub verified_bonus: f64,
    /// Candidates scoring below this floor lose to the fallback
    pub min_confidence: f64,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            verified_bonus: 0.2,
            min_confidence: 0.5,
        }
    }
}

/// Outcome of decoder selection. Never absent: the fallback decoder
/// always matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserResult {
    pub decoder_id: String,
    pub confidence: f64,
    pub matched_patterns: Vec<String>,
}

/// Pages available for post-auth matching: the default authenticated
/// (or degraded unauthenticated) body, plus any fetched page hints.
pub struct EvidencePages<'a> {
    pub default_page: &'a str,
    pub hint_pages: &'a HashMap<String, String>,
}

impl<'a> EvidencePages<'a> {
    fn page_for(&self, detection: &CompiledDetection) -> &str {
        match &detection.page_hint {
            Some(hint) => self
                .hint_pages
                .get(hint)
                .map(String::as_str)
                .unwrap_or(self.default_page),
            None => self.default_page,
        }
    }
}

/// Score every registry candidate and return the best match, or the
/// designated fallback when nothing clears the floor.
pub fn select_decoder(
    registry: &DecoderRegistry,
    config: &SelectorConfig,
    unauth_body: &str,
    pages: &EvidencePages<'_>,
) -> ParserResult {
    let mut best: Option<(f64, i32, ParserResult)> = None;

    for entry in registry.entries() {
        let descriptor = &entry.descriptor;
        let detection = &entry.compiled;

        // Pre-auth gate: at least one match against the
        // unauthenticated probe (an empty set passes)
        let pre_ok = detection.pre_auth.is_empty()
            || detection.pre_auth.iter().any(|p| p.matcher.is_match(unauth_body));
        if !pre_ok {
            continue;
        }

        // Post-auth evidence decides identity
        let page = pages.page_for(detection);
        let matched: Vec<&crate::pattern_index::CompiledPattern> = detection
            .post_auth
            .iter()
            .filter(|p| p.matcher.is_match(page))
            .collect();
        if matched.is_empty() {
            continue;
        }

        let mut score: f64 = matched.iter().map(|p| p.confidence).sum();
        if descriptor.metadata.verification_status
            == crate::pattern_index::VerificationStatus::Verified
        {
            score += config.verified_bonus;
        }

        if !descriptor.metadata.verification_status.selectable() {
            warn!(
                decoder_id = %descriptor.decoder_id,
                status = ?descriptor.metadata.verification_status,
                score = score,
                "Near-miss: decoder matched but is not selectable"
            );
            continue;
        }

        debug!(
            decoder_id = %descriptor.decoder_id,
            score = score,
            matched = matched.len(),
            "Decoder candidate scored"
        );

        let candidate = ParserResult {
            decoder_id: descriptor.decoder_id.clone(),
            confidence: score,
            matched_patterns: matched.iter().map(|p| p.source.clone()).collect(),
        };

        // Strictly-better comparison keeps selection stable: ties fall
        // to lower priority, then to index insertion order.
        let priority = descriptor.metadata.priority;
        let better = match &best {
            None => true,
            Some((best_score, best_priority, _)) => {
                score > *best_score || (score == *best_score && priority < *best_priority)
            }
        };
        if better {
            best = Some((score, priority, candidate));
        }
    }

    match best {
        Some((score, _, result)) if score >= config.min_confidence => result,
        other => {
            if let Some((score, _, result)) = other {
                debug!(
                    decoder_id = %result.decoder_id,
                    score = score,
                    floor = config.min_confidence,
                    "Best candidate below confidence floor, using fallback"
                );
            }
            ParserResult {
                decoder_id: registry.fallback_id().to_string(),
                confidence: 0.0,
                matched_patterns: Vec::new(),
            }
        }
    }
}
