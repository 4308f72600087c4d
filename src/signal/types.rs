//! Signal types
//!
//! Immutable evidence units gathered while probing a device, grouped
//! into three disjoint families: paradigm, auth strategy, and content.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Signal kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    // Paradigm family
    ParadigmHtml,
    ParadigmHnap,
    ParadigmRest,
    // Auth family
    AuthNone,
    AuthBasic,
    AuthForm,
    AuthHnap,
    AuthUrlToken,
    // Content family
    ModelString,
    ManufacturerHint,
    HnapActionPrefix,
    JsonMarker,
    HtmlMarker,
    HttpStatus,
    RedirectUrl,
    ContentType,
}

/// The three paradigm kinds, in resolution order
pub const PARADIGM_KINDS: &[SignalKind] = &[
    SignalKind::ParadigmHtml,
    SignalKind::ParadigmHnap,
    SignalKind::ParadigmRest,
];

/// The five auth-strategy kinds, in resolution order
pub const AUTH_KINDS: &[SignalKind] = &[
    SignalKind::AuthNone,
    SignalKind::AuthBasic,
    SignalKind::AuthForm,
    SignalKind::AuthHnap,
    SignalKind::AuthUrlToken,
];

/// One piece of weighted evidence. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub kind: SignalKind,
    pub value: String,
    pub confidence: f64,
    /// Where the evidence came from (probe label, header name, pattern id)
    pub source: String,
    /// Optional raw payload for diagnostics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

impl Signal {
    /// Create a signal. Confidence outside [0, 1] (or NaN) is rejected.
    pub fn new(
        kind: SignalKind,
        value: impl Into<String>,
        confidence: f64,
        source: impl Into<String>,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(Error::InvalidConfidence(confidence));
        }
        Ok(Self {
            kind,
            value: value.into(),
            confidence,
            source: source.into(),
            raw: None,
        })
    }

    /// Create a signal carrying a raw diagnostic payload
    pub fn with_raw(
        kind: SignalKind,
        value: impl Into<String>,
        confidence: f64,
        source: impl Into<String>,
        raw: serde_json::Value,
    ) -> Result<Self> {
        let mut signal = Self::new(kind, value, confidence, source)?;
        signal.raw = Some(raw);
        Ok(signal)
    }
}

/// Signal collection for one discovery attempt. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryResult {
    pub host: String,
    pub started_at: DateTime<Utc>,
    signals: Vec<Signal>,
}

impl DiscoveryResult {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            started_at: Utc::now(),
            signals: Vec::new(),
        }
    }

    /// Append a signal. No dedup: repeated evidence legitimately
    /// increases aggregate confidence for callers that sum.
    pub fn add(&mut self, signal: Signal) {
        self.signals.push(signal);
    }

    /// All signals, insertion order
    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Signals of one kind, insertion order preserved
    pub fn get_by_kind(&self, kind: SignalKind) -> impl Iterator<Item = &Signal> {
        self.signals.iter().filter(move |s| s.kind == kind)
    }

    /// Highest-confidence signal among the given kinds.
    ///
    /// Stable: when two signals tie on confidence, the earlier-inserted
    /// one wins (strictly-greater comparison, never >=).
    pub fn highest_confidence(&self, kinds: &[SignalKind]) -> Option<&Signal> {
        let mut best: Option<&Signal> = None;
        for signal in self.signals.iter().filter(|s| kinds.contains(&s.kind)) {
            match best {
                Some(b) if signal.confidence > b.confidence => best = Some(signal),
                None => best = Some(signal),
                _ => {}
            }
        }
        best
    }

    /// Highest-confidence signal restricted to the paradigm family
    pub fn highest_confidence_paradigm(&self) -> Option<&Signal> {
        self.highest_confidence(PARADIGM_KINDS)
    }
}
