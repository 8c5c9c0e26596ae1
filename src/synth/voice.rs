//! One sounding note as a small graph of backend nodes.
//!
//! ```text
//!   osc1 ──▶ gain ─┐
//!   osc2 ──▶ gain ─┤
//!   sub  ──▶ gain ─┼──▶ filter1 ──▶ [filter2] ──▶ vca ──▶ channel input
//!   noise ─▶ gain ─┘
//! ```
//!
//! A voice never computes audio. Each control tick it evaluates its envelopes
//! and reads the modulation frame, then ramps the node parameters toward the
//! new values by the next tick.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::backend::{AudioBackend, BackendError, NodeId, ParamKind, RampCurve};
use crate::dsp::envelope::{self, EnvelopeStage};
use crate::dsp::note::{midi_to_frequency, pitch_ratio};
use crate::modulation::destination as dest;
use crate::modulation::{ModFrame, VoiceSources};

use super::params::ParamSet;

/// Upper bound used when the frame carries no cutoff range.
const CUTOFF_CEILING: f32 = 10_000.0;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(pub u64);

/// Hard lifetime limits that guarantee teardown even if an envelope never
/// reports finished.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceLimits {
    /// Seconds after note-off.
    pub release_ceiling_secs: f64,
    /// Seconds after note-on.
    pub max_age_secs: f64,
}

impl Default for VoiceLimits {
    fn default() -> Self {
        Self {
            release_ceiling_secs: 30.0,
            max_age_secs: 600.0,
        }
    }
}

/// Everything needed to start a voice apart from the parameters.
#[derive(Debug, Clone)]
pub struct NoteRequest {
    pub id: VoiceId,
    pub instrument: String,
    pub midi: u8,
    /// Linear velocity in [0, 1].
    pub velocity: f32,
    pub start_time: f64,
    /// Auto-release after this many seconds.
    pub duration: Option<f64>,
    pub tuning: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LayerKind {
    Osc1,
    Osc2,
    Sub,
    Noise,
}

#[derive(Debug, Clone, Copy)]
struct Layer {
    kind: LayerKind,
    source: NodeId,
    gain: NodeId,
}

/// Parameter values for one evaluation.
#[derive(Debug, Clone, Copy, Default)]
struct Targets {
    osc1_freq: f32,
    osc1_detune: f32,
    osc2_freq: f32,
    osc2_detune: f32,
    sub_freq: f32,
    osc1_level: f32,
    osc2_level: f32,
    sub_level: f32,
    noise_level: f32,
    cutoff: f32,
    resonance: f32,
    cutoff2: f32,
    resonance2: f32,
    vca: f32,
}

impl Targets {
    fn compute(params: &ParamSet, frequency: f32, velocity: f32, frame: &ModFrame, src: &VoiceSources) -> Self {
        let osc1_pitch = frame.modulated(dest::OSC1_PITCH, params.osc1.semitone, src);
        let osc2_pitch = frame.modulated(dest::OSC2_PITCH, params.osc2.semitone, src);
        let osc1_detune = frame.modulated(dest::OSC1_DETUNE, params.osc1.detune, src);
        let osc2_detune = frame.modulated(dest::OSC2_DETUNE, params.osc2.detune, src);

        // Filter envelope sweeps from the base cutoff toward the top of the range.
        let (_, cutoff_max) = frame
            .range(dest::FILTER_CUTOFF)
            .unwrap_or((20.0, CUTOFF_CEILING));
        let base = params.filter1.cutoff;
        let swept = base + params.filter_env_amount * src.filter_env * (cutoff_max - base).max(0.0);

        let amp_level = frame.modulated(dest::AMP_LEVEL, 1.0, src);

        Self {
            osc1_freq: frequency * pitch_ratio(osc1_pitch, 0.0),
            osc1_detune,
            osc2_freq: frequency * pitch_ratio(osc2_pitch, 0.0),
            osc2_detune,
            sub_freq: frequency * 0.5 * pitch_ratio(osc1_pitch, 0.0),
            osc1_level: frame.modulated(dest::OSC1_LEVEL, params.osc1.level, src),
            osc2_level: frame.modulated(dest::OSC2_LEVEL, params.osc2.level, src),
            sub_level: frame.modulated(dest::SUB_LEVEL, params.sub_level, src),
            noise_level: frame.modulated(dest::NOISE_LEVEL, params.noise_level, src),
            cutoff: frame.modulated(dest::FILTER_CUTOFF, swept, src),
            resonance: frame.modulated(dest::FILTER_RESONANCE, params.filter1.resonance, src),
            // The serial filter takes the same routings but no envelope sweep.
            cutoff2: frame.modulated(dest::FILTER_CUTOFF, params.filter2.cutoff, src),
            resonance2: frame.modulated(dest::FILTER_RESONANCE, params.filter2.resonance, src),
            vca: (src.amp_env * velocity * params.volume * amp_level).max(0.0),
        }
    }

    fn level(&self, kind: LayerKind) -> f32 {
        match kind {
            LayerKind::Osc1 => self.osc1_level,
            LayerKind::Osc2 => self.osc2_level,
            LayerKind::Sub => self.sub_level,
            LayerKind::Noise => self.noise_level,
        }
    }
}

/// Read-only view of a voice for stats and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceInfo {
    pub id: VoiceId,
    pub instrument: String,
    pub midi: u8,
    pub frequency: f32,
    pub velocity: f32,
    pub start_time: f64,
    pub release_time: Option<f64>,
    pub stage: EnvelopeStage,
}

pub struct Voice {
    id: VoiceId,
    instrument: String,
    midi: u8,
    frequency: f32,
    velocity: f32,
    start_time: f64,
    release_time: Option<f64>,
    end_time: Option<f64>,
    stage: EnvelopeStage,
    sources: VoiceSources,
    params: ParamSet,
    layers: Vec<Layer>,
    filter1: NodeId,
    filter2: Option<NodeId>,
    vca: NodeId,
    output: NodeId,
    torn_down: bool,
}

impl Voice {
    /// Build and start the node graph for a note, connected into `output`.
    ///
    /// On backend failure every node created so far is released and the
    /// error is returned.
    pub fn start(
        backend: &mut dyn AudioBackend,
        request: NoteRequest,
        params: &ParamSet,
        output: NodeId,
        frame: &ModFrame,
    ) -> Result<Self, BackendError> {
        let mut created = Vec::new();
        match Self::build(backend, &mut created, request, params, output, frame) {
            Ok(voice) => Ok(voice),
            Err(err) => {
                let now = backend.current_time();
                for &node in created.iter().rev() {
                    backend.stop(node, now);
                    backend.release(node);
                }
                Err(err)
            }
        }
    }

    fn build(
        backend: &mut dyn AudioBackend,
        created: &mut Vec<NodeId>,
        request: NoteRequest,
        params: &ParamSet,
        output: NodeId,
        frame: &ModFrame,
    ) -> Result<Self, BackendError> {
        let frequency = midi_to_frequency(request.midi as f32, request.tuning);
        let velocity = request.velocity.clamp(0.0, 1.0);
        let sources = VoiceSources {
            filter_env: 0.0,
            amp_env: 0.0,
            velocity,
        };
        let targets = Targets::compute(params, frequency, velocity, frame, &sources);

        let filter1 = backend.create_filter(params.filter1.kind, targets.cutoff, targets.resonance)?;
        created.push(filter1);
        let filter2 = if params.filter2_enabled {
            let node = backend.create_filter(params.filter2.kind, targets.cutoff2, targets.resonance2)?;
            created.push(node);
            Some(node)
        } else {
            None
        };
        let vca = backend.create_gain(0.0)?;
        created.push(vca);

        let mut layers = Vec::new();
        let stack = [
            (LayerKind::Osc1, params.osc1.level),
            (LayerKind::Osc2, params.osc2.level),
            (LayerKind::Sub, params.sub_level),
            (LayerKind::Noise, params.noise_level),
        ];
        for (kind, level) in stack {
            if level <= 0.0 {
                continue;
            }
            let source = match kind {
                LayerKind::Osc1 => backend.create_oscillator(params.osc1.shape, targets.osc1_freq)?,
                LayerKind::Osc2 => backend.create_oscillator(params.osc2.shape, targets.osc2_freq)?,
                LayerKind::Sub => backend.create_oscillator(params.sub_shape, targets.sub_freq)?,
                LayerKind::Noise => backend.create_buffer_source(params.noise_color)?,
            };
            created.push(source);
            let gain = backend.create_gain(targets.level(kind))?;
            created.push(gain);
            backend.connect(source, gain)?;
            backend.connect(gain, filter1)?;
            layers.push(Layer { kind, source, gain });
        }

        let start = request.start_time;
        for layer in &layers {
            match layer.kind {
                LayerKind::Osc1 => {
                    backend.set_param(layer.source, ParamKind::Detune, targets.osc1_detune, start)?
                }
                LayerKind::Osc2 => {
                    backend.set_param(layer.source, ParamKind::Detune, targets.osc2_detune, start)?
                }
                LayerKind::Sub | LayerKind::Noise => {}
            }
        }

        match filter2 {
            Some(f2) => {
                backend.connect(filter1, f2)?;
                backend.connect(f2, vca)?;
            }
            None => backend.connect(filter1, vca)?,
        }
        backend.connect(vca, output)?;

        for layer in &layers {
            backend.start(layer.source, start)?;
        }

        Ok(Self {
            id: request.id,
            instrument: request.instrument,
            midi: request.midi,
            frequency,
            velocity,
            start_time: start,
            release_time: None,
            end_time: request
                .duration
                .filter(|d| d.is_finite() && *d >= 0.0)
                .map(|d| start + d),
            stage: EnvelopeStage::Attack,
            sources,
            params: params.clone(),
            layers,
            filter1,
            filter2,
            vca,
            output,
            torn_down: false,
        })
    }

    /// Evaluate envelopes and modulation at `now` and ramp every node
    /// parameter to its new value by `ramp_end`.
    pub fn drive(
        &mut self,
        backend: &mut dyn AudioBackend,
        frame: &ModFrame,
        now: f64,
        ramp_end: f64,
    ) -> Result<EnvelopeStage, BackendError> {
        if self.release_time.is_none() {
            if let Some(end) = self.end_time.filter(|end| now >= *end) {
                self.release_time = Some(end);
            }
        }

        let since_on = (now - self.start_time).max(0.0);
        let since_off = self.release_time.map(|r| (now - r).max(0.0));
        self.sources = VoiceSources {
            filter_env: envelope::value(&self.params.filter_env, since_on, since_off),
            amp_env: envelope::value(&self.params.amp_env, since_on, since_off),
            velocity: self.velocity,
        };
        self.stage = envelope::stage(&self.params.amp_env, since_on, since_off);

        let t = Targets::compute(&self.params, self.frequency, self.velocity, frame, &self.sources);
        let end = ramp_end.max(now);
        let linear = RampCurve::Linear;

        for layer in &self.layers {
            match layer.kind {
                LayerKind::Osc1 => {
                    backend.ramp_param(layer.source, ParamKind::Frequency, t.osc1_freq, end, linear)?;
                    backend.ramp_param(layer.source, ParamKind::Detune, t.osc1_detune, end, linear)?;
                }
                LayerKind::Osc2 => {
                    backend.ramp_param(layer.source, ParamKind::Frequency, t.osc2_freq, end, linear)?;
                    backend.ramp_param(layer.source, ParamKind::Detune, t.osc2_detune, end, linear)?;
                }
                LayerKind::Sub => {
                    backend.ramp_param(layer.source, ParamKind::Frequency, t.sub_freq, end, linear)?;
                }
                LayerKind::Noise => {}
            }
            backend.ramp_param(layer.gain, ParamKind::Gain, t.level(layer.kind), end, linear)?;
        }

        backend.ramp_param(self.filter1, ParamKind::Frequency, t.cutoff, end, linear)?;
        backend.ramp_param(self.filter1, ParamKind::Q, t.resonance, end, linear)?;
        if let Some(f2) = self.filter2 {
            backend.ramp_param(f2, ParamKind::Frequency, t.cutoff2, end, linear)?;
            backend.ramp_param(f2, ParamKind::Q, t.resonance2, end, linear)?;
        }
        backend.ramp_param(self.vca, ParamKind::Gain, t.vca, end, linear)?;

        Ok(self.stage)
    }

    /// Mark note-off. Returns false if the voice was already released.
    pub fn release(&mut self, at: f64) -> bool {
        if self.release_time.is_some() {
            return false;
        }
        self.release_time = Some(at.max(self.start_time));
        true
    }

    /// True once the envelope has finished or a hard limit has passed.
    pub fn is_done(&self, now: f64, limits: &VoiceLimits) -> bool {
        if self.stage == EnvelopeStage::Finished {
            return true;
        }
        if now - self.start_time >= limits.max_age_secs {
            return true;
        }
        self.release_time
            .is_some_and(|r| now - r >= limits.release_ceiling_secs)
    }

    /// Stop sources, disconnect and release every node. Safe to call twice.
    pub fn teardown(&mut self, backend: &mut dyn AudioBackend, now: f64) {
        if self.torn_down {
            return;
        }
        for layer in &self.layers {
            backend.stop(layer.source, now);
            backend.disconnect(layer.source, layer.gain);
            backend.disconnect(layer.gain, self.filter1);
        }
        match self.filter2 {
            Some(f2) => {
                backend.disconnect(self.filter1, f2);
                backend.disconnect(f2, self.vca);
            }
            None => backend.disconnect(self.filter1, self.vca),
        }
        backend.disconnect(self.vca, self.output);

        for layer in &self.layers {
            backend.release(layer.source);
            backend.release(layer.gain);
        }
        backend.release(self.filter1);
        if let Some(f2) = self.filter2 {
            backend.release(f2);
        }
        backend.release(self.vca);
        self.torn_down = true;
        log::debug!("voice {} ({}) torn down", self.id.0, self.instrument);
    }

    /// Take new parameters; the node layout chosen at note-on is kept.
    pub fn retune(&mut self, params: &ParamSet) {
        self.params = params.clone();
    }

    pub fn id(&self) -> VoiceId {
        self.id
    }

    pub fn midi(&self) -> u8 {
        self.midi
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn release_time(&self) -> Option<f64> {
        self.release_time
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    pub fn sources(&self) -> VoiceSources {
        self.sources
    }

    /// Nodes owned by this voice.
    pub fn node_count(&self) -> usize {
        self.layers.len() * 2 + 2 + usize::from(self.filter2.is_some())
    }

    pub fn info(&self) -> VoiceInfo {
        VoiceInfo {
            id: self.id,
            instrument: self.instrument.clone(),
            midi: self.midi,
            frequency: self.frequency,
            velocity: self.velocity,
            start_time: self.start_time,
            release_time: self.release_time,
            stage: self.stage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{NodeKind, OfflineBackend, OscillatorShape};
    use crate::dsp::envelope::EnvelopeSpec;
    use crate::modulation::ModulationMatrix;

    fn request(id: u64, midi: u8) -> NoteRequest {
        NoteRequest {
            id: VoiceId(id),
            instrument: "lead".into(),
            midi,
            velocity: 1.0,
            start_time: 0.0,
            duration: None,
            tuning: 440.0,
        }
    }

    fn setup() -> (OfflineBackend, NodeId, ModFrame) {
        let mut backend = OfflineBackend::new();
        let out = backend.create_gain(1.0).unwrap();
        let frame = ModulationMatrix::new(0).sample(0.0);
        (backend, out, frame)
    }

    #[test]
    fn zero_level_layers_are_skipped() {
        let (mut backend, out, frame) = setup();
        let params = ParamSet::default().with_osc1(OscillatorShape::Sawtooth, 1.0);
        let voice = Voice::start(&mut backend, request(1, 69), &params, out, &frame).unwrap();

        assert_eq!(backend.count_kind(NodeKind::Oscillator), 1);
        assert_eq!(backend.count_kind(NodeKind::BufferSource), 0);
        assert_eq!(voice.node_count(), 4);
        assert!(backend.is_connected(voice.vca, out));
    }

    #[test]
    fn failed_build_leaves_no_nodes() {
        let (mut backend, out, frame) = setup();
        let before = backend.live_nodes();
        backend.fail_after(2);
        let params = ParamSet::default().with_osc2(OscillatorShape::Square, 0.5, 0.0, 0.0);
        assert!(Voice::start(&mut backend, request(1, 60), &params, out, &frame).is_err());
        assert_eq!(backend.live_nodes(), before);
        assert_eq!(backend.inputs(out).len(), 0);
    }

    #[test]
    fn amp_envelope_drives_vca_and_finishes() {
        let (mut backend, out, frame) = setup();
        let params = ParamSet::default().with_amp_env(EnvelopeSpec::adsr(0.1, 0.1, 0.5, 0.2));
        let mut voice = Voice::start(&mut backend, request(1, 69), &params, out, &frame).unwrap();

        voice.drive(&mut backend, &frame, 0.05, 0.06).unwrap();
        let vca = backend.param(voice.vca, ParamKind::Gain).unwrap();
        assert!((vca - 0.5 * params.volume).abs() < 1e-4);

        voice.release(0.5);
        let stage = voice.drive(&mut backend, &frame, 0.75, 0.76).unwrap();
        assert_eq!(stage, EnvelopeStage::Finished);
        assert!(voice.is_done(0.75, &VoiceLimits::default()));

        voice.teardown(&mut backend, 0.75);
        assert_eq!(backend.live_nodes(), 1);
        assert_eq!(backend.connection_count(), 0);
    }

    #[test]
    fn filter_envelope_sweeps_cutoff() {
        let (mut backend, out, frame) = setup();
        let params = ParamSet::default()
            .with_filter(crate::backend::FilterKind::Lowpass, 1000.0, 1.0)
            .with_filter_env(EnvelopeSpec::adsr(0.1, 0.1, 1.0, 0.1), 0.5);
        let mut voice = Voice::start(&mut backend, request(1, 69), &params, out, &frame).unwrap();

        voice.drive(&mut backend, &frame, 0.5, 0.51).unwrap();
        let cutoff = backend.param(voice.filter1, ParamKind::Frequency).unwrap();
        assert!((cutoff - (1000.0 + 0.5 * 9000.0)).abs() < 0.5);
    }

    #[test]
    fn serial_filter_follows_cutoff_routings_and_retune() {
        let (mut backend, out, _) = setup();
        let mut matrix = ModulationMatrix::new(0);
        matrix.add_routing("modwheel", dest::FILTER_CUTOFF, 0.1).unwrap();
        matrix.update_source("modwheel", 1.0).unwrap();
        let frame = matrix.sample(0.0);

        let params = ParamSet::default().with_filter2(crate::backend::FilterKind::Highpass, 500.0, 2.0);
        let mut voice = Voice::start(&mut backend, request(1, 60), &params, out, &frame).unwrap();
        let f2 = voice.filter2.unwrap();

        voice.drive(&mut backend, &frame, 0.1, 0.11).unwrap();
        let cutoff2 = backend.param(f2, ParamKind::Frequency).unwrap();
        assert!((cutoff2 - (500.0 + 0.1 * 9980.0)).abs() < 0.5, "got {cutoff2}");
        assert!((backend.param(f2, ParamKind::Q).unwrap() - 2.0).abs() < 1e-5);

        voice.retune(&params.clone().with_filter2(crate::backend::FilterKind::Highpass, 500.0, 8.0));
        voice.drive(&mut backend, &frame, 0.2, 0.21).unwrap();
        assert!((backend.param(f2, ParamKind::Q).unwrap() - 8.0).abs() < 1e-5);
    }

    #[test]
    fn duration_hint_releases_automatically() {
        let (mut backend, out, frame) = setup();
        let mut req = request(1, 60);
        req.duration = Some(0.25);
        let mut voice =
            Voice::start(&mut backend, req, &ParamSet::default(), out, &frame).unwrap();
        voice.drive(&mut backend, &frame, 0.2, 0.21).unwrap();
        assert_eq!(voice.release_time(), None);
        voice.drive(&mut backend, &frame, 0.3, 0.31).unwrap();
        assert_eq!(voice.release_time(), Some(0.25));
    }

    #[test]
    fn hard_ceiling_applies_after_release() {
        let (mut backend, out, frame) = setup();
        let mut voice =
            Voice::start(&mut backend, request(1, 60), &ParamSet::default(), out, &frame).unwrap();
        let limits = VoiceLimits {
            release_ceiling_secs: 1.0,
            max_age_secs: 100.0,
        };
        assert!(!voice.is_done(50.0, &limits));
        voice.release(50.0);
        assert!(voice.is_done(51.0, &limits));
        assert!(voice.is_done(100.0, &VoiceLimits { release_ceiling_secs: 1e9, max_age_secs: 100.0 }));
    }
}
