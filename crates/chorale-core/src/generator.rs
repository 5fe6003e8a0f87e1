//! The composition-engine boundary.
//!
//! Chorale does not generate music; an external engine does. This module
//! pins down everything the playback side needs from that collaborator:
//! the settings handed to it and the [`Generator`] trait it sits behind.
//! Engines are free to rebuild their internal state on every call; the
//! playback subsystem only ever consumes the returned immutable
//! [`EventData`] snapshot.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::events::EventData;
use crate::presets::{form_preset, FormCategory};

/// Settings for one generation run.
///
/// `seed == 0` means "pick one at random"; use [`GeneratorConfig::resolve_seed`]
/// to draw the actual seed host-side before invoking the engine, which
/// guarantees variety regardless of how the engine seeds itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Form index (see [`crate::presets`]).
    pub form: u32,
    /// Key as a pitch class, 0 = C.
    pub key: u8,
    /// Minor mode when true.
    pub is_minor: bool,
    /// Voice count; only meaningful for organ-category forms.
    pub num_voices: u8,
    /// Tempo in beats per minute.
    pub bpm: u32,
    /// Random seed; 0 requests a random one.
    pub seed: u64,
    /// Character index; only meaningful for organ-category forms.
    pub character: u32,
    /// Instrument index the engine writes into track programs.
    pub instrument: u32,
    /// Scale/length selector.
    pub scale: u32,
}

impl Default for GeneratorConfig {
    /// The toccata-and-fugue defaults: C major, four voices, 100 BPM,
    /// random seed, full scale.
    fn default() -> Self {
        Self {
            form: 4,
            key: 0,
            is_minor: false,
            num_voices: 4,
            bpm: 100,
            seed: 0,
            character: 0,
            instrument: 0,
            scale: 3,
        }
    }
}

impl GeneratorConfig {
    /// The seed to hand the engine: the configured one, or a random
    /// positive seed when the configuration says 0.
    pub fn resolve_seed(&self) -> u64 {
        if self.seed != 0 {
            self.seed
        } else {
            rand::rng().random_range(1..=i32::MAX as u64)
        }
    }

    /// Whether this configuration targets an organ-category form.
    ///
    /// Unknown form indices count as organ, mirroring the engine's own
    /// fallback.
    pub fn is_organ_form(&self) -> bool {
        form_preset(self.form)
            .map(|preset| preset.category == FormCategory::Organ)
            .unwrap_or(true)
    }

    /// Whether two configurations would produce the same musical content,
    /// ignoring the seed.
    ///
    /// Front ends use this to decide whether settings are "dirty" relative
    /// to the last generation (the seed is excluded because 0 means random
    /// and regenerating with a fresh random seed is always allowed).
    pub fn matches_ignoring_seed(&self, other: &Self) -> bool {
        self.form == other.form
            && self.key == other.key
            && self.is_minor == other.is_minor
            && self.num_voices == other.num_voices
            && self.bpm == other.bpm
            && self.character == other.character
            && self.instrument == other.instrument
            && self.scale == other.scale
    }
}

/// An external composition engine.
///
/// `generate` takes `&mut self` because real engines keep internal state
/// and may rebuild it per call; the contract only requires that the
/// returned snapshot is complete and immutable.
pub trait Generator {
    /// Produce a timeline for the given settings.
    fn generate(&mut self, config: &GeneratorConfig) -> anyhow::Result<EventData>;
}
