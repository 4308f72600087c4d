//! Startup-time decoder registry

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use super::fallback::{GenericHtmlDecoder, FALLBACK_DECODER_ID};
use super::ModemDecoder;
use crate::error::Result;
use crate::pattern_index::{CompiledDetection, DecoderDescriptor, PatternIndex};

/// One selectable candidate: the index descriptor plus its compiled
/// detection patterns
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub descriptor: DecoderDescriptor,
    pub compiled: CompiledDetection,
}

/// Read-only decoder registry, built once at startup.
///
/// Entries keep index insertion order: the selector's final tie-break
/// depends on it.
pub struct DecoderRegistry {
    entries: Vec<RegistryEntry>,
    implementations: HashMap<String, Arc<dyn ModemDecoder>>,
    fallback: Arc<dyn ModemDecoder>,
}

impl DecoderRegistry {
    /// Build the registry from a loaded pattern index. Compilation
    /// failures are fatal here (startup), never during discovery.
    pub fn from_index(index: &PatternIndex) -> Result<Self> {
        let mut entries = Vec::with_capacity(index.decoders.len());
        for descriptor in &index.decoders {
            entries.push(RegistryEntry {
                compiled: descriptor.detection.compile()?,
                descriptor: descriptor.clone(),
            });
        }
        info!(decoders = entries.len(), "Decoder registry built");
        Ok(Self {
            entries,
            implementations: HashMap::new(),
            fallback: Arc::new(GenericHtmlDecoder::default()),
        })
    }

    /// Register a concrete decoder implementation. When the id is not
    /// already indexed, the decoder's own descriptor is appended as a
    /// candidate (compile-time registration path).
    pub fn register(&mut self, decoder: Arc<dyn ModemDecoder>) -> Result<()> {
        let id = decoder.decoder_id().to_string();
        if !self.entries.iter().any(|e| e.descriptor.decoder_id == id) {
            let descriptor = DecoderDescriptor {
                decoder_id: id.clone(),
                metadata: decoder.metadata().clone(),
                detection: decoder.detection_descriptor().clone(),
            };
            self.entries.push(RegistryEntry {
                compiled: descriptor.detection.compile()?,
                descriptor,
            });
        }
        self.implementations.insert(id, decoder);
        Ok(())
    }

    /// Candidates in index insertion order
    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn entry(&self, decoder_id: &str) -> Option<&RegistryEntry> {
        self.entries
            .iter()
            .find(|e| e.descriptor.decoder_id == decoder_id)
    }

    /// Implementation for an id, or the fallback when none registered
    pub fn get(&self, decoder_id: &str) -> Arc<dyn ModemDecoder> {
        self.implementations
            .get(decoder_id)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }

    pub fn fallback(&self) -> Arc<dyn ModemDecoder> {
        self.fallback.clone()
    }

    pub fn fallback_id(&self) -> &str {
        FALLBACK_DECODER_ID
    }
}
