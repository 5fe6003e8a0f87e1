//! Static metadata for the musical forms the generator offers.
//!
//! Pure data: per-form defaults used to prefill generation settings and to
//! label the catalog in front ends. The `id` values are the generator's own
//! form indices.

/// Which family of instrumentation a form belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormCategory {
    /// Polyphonic organ works; voice count and character apply.
    Organ,
    /// Single-instrument solo works.
    Solo,
    /// Harpsichord/keyboard works.
    Keyboard,
}

/// Defaults and limits for one musical form.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FormPreset {
    /// Generator form index.
    pub id: u32,
    /// Stable machine name.
    pub name: &'static str,
    /// Catalog number of the model work.
    pub bwv: &'static str,
    /// Instrumentation family.
    pub category: FormCategory,
    /// Logical instrument name preselected for this form.
    pub default_instrument: &'static str,
    /// Suggested tempo.
    pub default_bpm: u32,
    /// Suggested voice count.
    pub default_voices: u8,
    /// Minimum supported voice count.
    pub min_voices: u8,
    /// Maximum supported voice count.
    pub max_voices: u8,
}

/// All known forms, indexed by `id`.
pub const FORM_PRESETS: [FormPreset; 10] = [
    FormPreset {
        id: 0,
        name: "fugue",
        bwv: "BWV 578",
        category: FormCategory::Organ,
        default_instrument: "organ",
        default_bpm: 85,
        default_voices: 4,
        min_voices: 2,
        max_voices: 5,
    },
    FormPreset {
        id: 1,
        name: "prelude_and_fugue",
        bwv: "BWV 543",
        category: FormCategory::Organ,
        default_instrument: "organ",
        default_bpm: 90,
        default_voices: 4,
        min_voices: 2,
        max_voices: 5,
    },
    FormPreset {
        id: 2,
        name: "trio_sonata",
        bwv: "BWV 525",
        category: FormCategory::Organ,
        default_instrument: "organ",
        default_bpm: 90,
        default_voices: 3,
        min_voices: 3,
        max_voices: 3,
    },
    FormPreset {
        id: 3,
        name: "chorale_prelude",
        bwv: "BWV 645",
        category: FormCategory::Organ,
        default_instrument: "organ",
        default_bpm: 72,
        default_voices: 4,
        min_voices: 3,
        max_voices: 5,
    },
    FormPreset {
        id: 4,
        name: "toccata_and_fugue",
        bwv: "BWV 565",
        category: FormCategory::Organ,
        default_instrument: "organ",
        default_bpm: 100,
        default_voices: 4,
        min_voices: 3,
        max_voices: 5,
    },
    FormPreset {
        id: 5,
        name: "passacaglia",
        bwv: "BWV 582",
        category: FormCategory::Organ,
        default_instrument: "organ",
        default_bpm: 76,
        default_voices: 4,
        min_voices: 3,
        max_voices: 5,
    },
    FormPreset {
        id: 6,
        name: "fantasia_and_fugue",
        bwv: "BWV 542",
        category: FormCategory::Organ,
        default_instrument: "organ",
        default_bpm: 88,
        default_voices: 4,
        min_voices: 3,
        max_voices: 5,
    },
    FormPreset {
        id: 7,
        name: "cello_prelude",
        bwv: "BWV 1007",
        category: FormCategory::Solo,
        default_instrument: "cello",
        default_bpm: 80,
        default_voices: 3,
        min_voices: 2,
        max_voices: 3,
    },
    FormPreset {
        id: 8,
        name: "chaconne",
        bwv: "BWV 1004",
        category: FormCategory::Solo,
        default_instrument: "violin",
        default_bpm: 76,
        default_voices: 3,
        min_voices: 2,
        max_voices: 4,
    },
    FormPreset {
        id: 9,
        name: "goldberg_variations",
        bwv: "BWV 988",
        category: FormCategory::Keyboard,
        default_instrument: "harpsichord",
        default_bpm: 60,
        default_voices: 2,
        min_voices: 2,
        max_voices: 4,
    },
];

/// Look up a form by generator index.
pub fn form_preset(id: u32) -> Option<&'static FormPreset> {
    FORM_PRESETS.iter().find(|preset| preset.id == id)
}

/// All forms in one instrumentation family, in catalog order.
pub fn forms_in_category(category: FormCategory) -> impl Iterator<Item = &'static FormPreset> {
    FORM_PRESETS
        .iter()
        .filter(move |preset| preset.category == category)
}
