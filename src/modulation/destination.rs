//! Destination catalog.
//!
//! Voices read the pitch, level, detune, filter and amp destinations each
//! tick. `osc1Phase`, `osc2Phase`, `filterDrive`, `pan`, `fxSend1`, `fxSend2`,
//! `wavetablePos`, `fmAmount` and `unisonDetune` are catalog-only: they accept
//! routings and evaluate through [`ModulationMatrix::get_modulated_value`]
//! and [`ModFrame::modulated`], but the backend has no node parameter for
//! them, so no voice drives them.
//!
//! [`ModulationMatrix::get_modulated_value`]: super::ModulationMatrix::get_modulated_value
//! [`ModFrame::modulated`]: super::ModFrame::modulated

pub const OSC1_PITCH: &str = "osc1Pitch";
pub const OSC2_PITCH: &str = "osc2Pitch";
pub const OSC1_LEVEL: &str = "osc1Level";
pub const OSC2_LEVEL: &str = "osc2Level";
pub const OSC1_DETUNE: &str = "osc1Detune";
pub const OSC2_DETUNE: &str = "osc2Detune";
pub const OSC1_PHASE: &str = "osc1Phase";
pub const OSC2_PHASE: &str = "osc2Phase";
pub const SUB_LEVEL: &str = "subLevel";
pub const NOISE_LEVEL: &str = "noiseLevel";
pub const FILTER_CUTOFF: &str = "filterCutoff";
pub const FILTER_RESONANCE: &str = "filterResonance";
pub const FILTER_DRIVE: &str = "filterDrive";
pub const AMP_LEVEL: &str = "ampLevel";
pub const PAN: &str = "pan";
pub const FX_SEND1: &str = "fxSend1";
pub const FX_SEND2: &str = "fxSend2";
pub const WAVETABLE_POS: &str = "wavetablePos";
pub const FM_AMOUNT: &str = "fmAmount";
pub const UNISON_DETUNE: &str = "unisonDetune";

/// A modulatable parameter and the range its output is clamped to.
#[derive(Debug, Clone, PartialEq)]
pub struct ModulationDestination {
    pub id: String,
    pub name: String,
    pub min: f32,
    pub max: f32,
}

impl ModulationDestination {
    pub fn new(id: &str, name: &str, min: f32, max: f32) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self {
            id: id.to_string(),
            name: name.to_string(),
            min,
            max,
        }
    }

    pub fn span(&self) -> f32 {
        self.max - self.min
    }

    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            return self.min;
        }
        value.clamp(self.min, self.max)
    }
}

pub fn default_destinations() -> Vec<ModulationDestination> {
    vec![
        ModulationDestination::new(OSC1_PITCH, "Osc 1 Pitch", -24.0, 24.0),
        ModulationDestination::new(OSC2_PITCH, "Osc 2 Pitch", -24.0, 24.0),
        ModulationDestination::new(OSC1_LEVEL, "Osc 1 Level", 0.0, 1.0),
        ModulationDestination::new(OSC2_LEVEL, "Osc 2 Level", 0.0, 1.0),
        ModulationDestination::new(OSC1_DETUNE, "Osc 1 Detune", -100.0, 100.0),
        ModulationDestination::new(OSC2_DETUNE, "Osc 2 Detune", -100.0, 100.0),
        ModulationDestination::new(OSC1_PHASE, "Osc 1 Phase", 0.0, 1.0),
        ModulationDestination::new(OSC2_PHASE, "Osc 2 Phase", 0.0, 1.0),
        ModulationDestination::new(SUB_LEVEL, "Sub Level", 0.0, 1.0),
        ModulationDestination::new(NOISE_LEVEL, "Noise Level", 0.0, 1.0),
        ModulationDestination::new(FILTER_CUTOFF, "Filter Cutoff", 20.0, 10_000.0),
        ModulationDestination::new(FILTER_RESONANCE, "Filter Resonance", 0.1, 30.0),
        ModulationDestination::new(FILTER_DRIVE, "Filter Drive", 0.0, 1.0),
        ModulationDestination::new(AMP_LEVEL, "Amp Level", 0.0, 1.0),
        ModulationDestination::new(PAN, "Pan", -1.0, 1.0),
        ModulationDestination::new(FX_SEND1, "FX Send 1", 0.0, 1.0),
        ModulationDestination::new(FX_SEND2, "FX Send 2", 0.0, 1.0),
        ModulationDestination::new(WAVETABLE_POS, "Wavetable Pos", 0.0, 1.0),
        ModulationDestination::new(FM_AMOUNT, "FM Amount", 0.0, 1.0),
        ModulationDestination::new(UNISON_DETUNE, "Unison Detune", 0.0, 1.0),
    ]
}
