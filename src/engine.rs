//! Composition root: owns the backend, the modulation matrix, the mixer and
//! one voice pool per instrument.
//!
//! Every method takes `&self`; shared state sits behind `parking_lot` locks
//! so an `Engine` can be wrapped in an `Arc` and driven from several threads.
//! Lock order is mixer → pool → backend. Starting a note holds the mixer read
//! lock across allocation; nothing takes the mixer while holding a pool. The
//! matrix lock is never held while the backend is touched.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, MutexGuard, RwLock};

use crate::backend::AudioBackend;
use crate::config::EngineConfig;
use crate::dsp::lfo::LfoState;
use crate::dsp::note::note_to_midi;
use crate::error::{EngineError, Result};
use crate::instruments;
use crate::mixer::{MixerGraph, MixerState};
use crate::modulation::{
    LfoPatch, MatrixStats, ModulationMatrix, RoutingId, RoutingView, VoiceSources,
};
use crate::preset::{Preset, PresetReport};
use crate::synth::message::{ControlMessage, MessageReceiver};
use crate::synth::params::ParamValue;
use crate::synth::voice::{NoteRequest, Voice, VoiceId, VoiceInfo};
use crate::synth::{InstrumentSpec, VoicePool};

/// Outcome of one [`Engine::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickReport {
    pub time: f64,
    pub messages: usize,
    pub active_voices: usize,
    pub reaped: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineStats {
    pub time: f64,
    pub ticks: u64,
    pub active_voices: usize,
    /// Live voices per instrument, including releasing ones.
    pub voices: BTreeMap<String, usize>,
    pub matrix: MatrixStats,
    pub instruments: usize,
    pub channels: usize,
    pub buses: usize,
    pub sends: usize,
}

pub struct Engine<B: AudioBackend> {
    config: EngineConfig,
    backend: Mutex<B>,
    matrix: RwLock<ModulationMatrix>,
    mixer: RwLock<MixerGraph>,
    instruments: RwLock<BTreeMap<String, InstrumentSpec>>,
    pools: BTreeMap<String, VoicePool>,
    receivers: Mutex<Vec<Box<dyn MessageReceiver + Send>>>,
    next_voice_id: AtomicU64,
    ticks: AtomicU64,
}

impl<B: AudioBackend> Engine<B> {
    pub fn new(config: EngineConfig, mut backend: B) -> Result<Self> {
        config.validate()?;
        let mixer = MixerGraph::build(&config, &mut backend)?;

        let mut instrument_map = BTreeMap::new();
        let mut pools = BTreeMap::new();
        for channel in &config.channels {
            let params = instruments::template(&channel.template).ok_or_else(|| {
                EngineError::InvalidConfig(format!("unknown template '{}'", channel.template))
            })?;
            let polyphony = config.polyphony_for(channel);
            instrument_map.insert(
                channel.id.clone(),
                InstrumentSpec::new(&channel.id, polyphony, params),
            );
            pools.insert(
                channel.id.clone(),
                VoicePool::new(&channel.id, polyphony, config.limits()),
            );
        }

        log::info!(
            "engine ready: {} instruments at {} Hz control rate",
            pools.len(),
            config.control_rate_hz
        );

        Ok(Self {
            matrix: RwLock::new(ModulationMatrix::new(config.lfo_seed)),
            mixer: RwLock::new(mixer),
            instruments: RwLock::new(instrument_map),
            pools,
            backend: Mutex::new(backend),
            receivers: Mutex::new(Vec::new()),
            next_voice_id: AtomicU64::new(1),
            ticks: AtomicU64::new(0),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Lock the backend, e.g. to advance an offline clock.
    pub fn backend(&self) -> MutexGuard<'_, B> {
        self.backend.lock()
    }

    pub fn now(&self) -> f64 {
        self.backend.lock().current_time()
    }

    fn pool(&self, instrument: &str) -> Result<&VoicePool> {
        self.pools
            .get(instrument)
            .ok_or_else(|| EngineError::UnknownInstrument(instrument.to_string()))
    }

    // ---- notes ---------------------------------------------------------

    /// Start a note by name ("C4", "F#3", "Bb2").
    ///
    /// Returns `Ok(None)` when the instrument's channel is muted or another
    /// channel is soloed; no backend nodes are created in that case.
    pub fn play_note(
        &self,
        instrument: &str,
        note: &str,
        velocity: f32,
        duration_hint: Option<f64>,
    ) -> Result<Option<VoiceId>> {
        let midi = note_to_midi(note).ok_or_else(|| EngineError::InvalidNote(note.to_string()))?;
        self.play_midi(instrument, midi, velocity, duration_hint)
    }

    pub fn play_midi(
        &self,
        instrument: &str,
        midi: u8,
        velocity: f32,
        duration_hint: Option<f64>,
    ) -> Result<Option<VoiceId>> {
        if midi > 127 {
            return Err(EngineError::InvalidNote(midi.to_string()));
        }
        if !velocity.is_finite() {
            return Err(EngineError::NonFinite("velocity"));
        }
        if let Some(d) = duration_hint {
            if !d.is_finite() || d < 0.0 {
                return Err(EngineError::InvalidParameterValue {
                    name: "duration".into(),
                    reason: format!("expected a non-negative number of seconds, got {d}"),
                });
            }
        }

        let pool = self.pool(instrument)?;
        let params = self
            .instruments
            .read()
            .get(instrument)
            .map(|spec| spec.params.clone())
            .ok_or_else(|| EngineError::UnknownInstrument(instrument.to_string()))?;

        // Held until the voice exists, so a mute or solo change lands either
        // before the audibility check or after the voice is allocated.
        let mixer = self.mixer.read();
        if !mixer.is_audible(instrument)? {
            log::debug!("{instrument}: channel silent, note {midi} skipped");
            return Ok(None);
        }
        let output = mixer.channel_input(instrument)?;

        let now = self.now();
        let velocity = velocity.clamp(0.0, 1.0);
        let frame = {
            let mut matrix = self.matrix.write();
            matrix.retrigger(now);
            matrix.mirror_voice(&VoiceSources {
                filter_env: 0.0,
                amp_env: 0.0,
                velocity,
            });
            matrix.sample(now)
        };

        let id = VoiceId(self.next_voice_id.fetch_add(1, Ordering::Relaxed));
        let request = NoteRequest {
            id,
            instrument: instrument.to_string(),
            midi,
            velocity,
            start_time: now,
            duration: duration_hint,
            tuning: self.config.tuning_hz,
        };
        let (_, stolen) = pool.allocate(&self.backend, |backend| {
            Voice::start(backend, request, &params, output, &frame)
        })?;
        drop(mixer);

        log::debug!(
            "{instrument}: voice {} started (note {midi}, velocity {velocity:.2}, stole {})",
            id.0,
            stolen.len()
        );
        Ok(Some(id))
    }

    /// Release a voice. Fire-and-forget: the voice finishes its release on
    /// later ticks. Returns false for unknown or already released voices.
    pub fn stop_note(&self, id: VoiceId) -> bool {
        let now = self.now();
        self.pools.values().any(|pool| pool.release(id, now))
    }

    /// Release every held voice of `instrument` playing `midi`.
    pub fn note_off(&self, instrument: &str, midi: u8) -> Result<usize> {
        let now = self.now();
        Ok(self.pool(instrument)?.release_note(midi, now))
    }

    pub fn stop_all_notes(&self) -> usize {
        let now = self.now();
        let n = self.pools.values().map(|pool| pool.release_all(now)).sum();
        log::debug!("released {n} voices");
        n
    }

    /// Tear every voice down immediately, skipping release tails.
    pub fn kill_all_voices(&self) -> usize {
        self.pools.values().map(|pool| pool.clear(&self.backend)).sum()
    }

    pub fn active_voices(&self, instrument: &str) -> Result<Vec<VoiceInfo>> {
        Ok(self.pool(instrument)?.voices())
    }

    pub fn voice_count(&self) -> usize {
        self.pools.values().map(VoicePool::len).sum()
    }

    // ---- instrument parameters -------------------------------------------

    pub fn instrument_ids(&self) -> Vec<String> {
        self.pools.keys().cloned().collect()
    }

    pub fn instrument(&self, id: &str) -> Option<InstrumentSpec> {
        self.instruments.read().get(id).cloned()
    }

    /// Set one parameter. Live voices pick up the new value on the next tick.
    pub fn set_parameter(&self, instrument: &str, name: &str, value: impl Into<ParamValue>) -> Result<()> {
        let value = value.into();
        let params = {
            let mut instruments = self.instruments.write();
            let spec = instruments
                .get_mut(instrument)
                .ok_or_else(|| EngineError::UnknownInstrument(instrument.to_string()))?;
            if let Err(err) = spec.set(name, &value) {
                log::warn!("{instrument}: rejected parameter {name} = {value:?}: {err}");
                return Err(err);
            }
            spec.params.clone()
        };
        self.pool(instrument)?.retune(&params);
        Ok(())
    }

    pub fn parameter(&self, instrument: &str, name: &str) -> Result<ParamValue> {
        self.instruments
            .read()
            .get(instrument)
            .ok_or_else(|| EngineError::UnknownInstrument(instrument.to_string()))?
            .get(name)
    }

    // ---- modulation --------------------------------------------------------

    pub fn add_routing(&self, source: &str, destination: &str, amount: f32) -> Result<RoutingId> {
        self.matrix.write().add_routing(source, destination, amount)
    }

    pub fn remove_routing(&self, id: RoutingId) -> Result<()> {
        self.matrix.write().remove_routing(id).map(|_| ())
    }

    pub fn update_routing(&self, id: RoutingId, amount: f32) -> Result<()> {
        self.matrix.write().update_amount(id, amount)
    }

    pub fn toggle_routing(&self, id: RoutingId, enabled: bool) -> Result<()> {
        self.matrix.write().set_enabled(id, enabled)
    }

    pub fn routings(&self) -> Vec<RoutingView> {
        self.matrix.read().routings()
    }

    pub fn clear_routings(&self) {
        self.matrix.write().clear();
    }

    pub fn set_lfo(&self, id: &str, patch: &LfoPatch) -> Result<()> {
        self.matrix.write().set_lfo(id, patch)
    }

    pub fn lfo(&self, id: &str) -> Option<LfoState> {
        self.matrix.read().lfo(id).cloned()
    }

    /// Feed a performance control such as `modwheel`.
    pub fn update_source(&self, id: &str, value: f32) -> Result<()> {
        self.matrix.write().update_source(id, value)
    }

    /// Modulated value of a destination at the current backend time.
    pub fn modulated_value(&self, destination: &str, base: f32) -> f32 {
        let now = self.now();
        self.matrix.read().get_modulated_value(destination, base, now)
    }

    // ---- mixer ----------------------------------------------------------------

    fn with_mixer<R>(&self, f: impl FnOnce(&mut MixerGraph, &mut dyn AudioBackend) -> Result<R>) -> Result<R> {
        let mut mixer = self.mixer.write();
        let mut guard = self.backend.lock();
        let backend: &mut dyn AudioBackend = &mut *guard;
        f(&mut *mixer, backend)
    }

    pub fn route_channel_to_bus(&self, channel: &str, bus: &str) -> Result<()> {
        self.with_mixer(|m, b| m.route_channel_to_bus(b, channel, bus))
    }

    pub fn set_channel_gain(&self, channel: &str, gain: f32) -> Result<()> {
        self.with_mixer(|m, b| m.set_channel_gain(b, channel, gain))
    }

    pub fn set_channel_pan(&self, channel: &str, pan: f32) -> Result<()> {
        self.mixer.write().set_channel_pan(channel, pan)
    }

    pub fn set_channel_mute(&self, channel: &str, mute: bool) -> Result<()> {
        self.with_mixer(|m, b| m.set_channel_mute(b, channel, mute))
    }

    pub fn set_channel_solo(&self, channel: &str, solo: bool) -> Result<()> {
        self.with_mixer(|m, b| m.set_channel_solo(b, channel, solo))
    }

    pub fn set_channel_send(&self, channel: &str, send: &str, amount: f32) -> Result<()> {
        self.with_mixer(|m, b| m.set_channel_send(b, channel, send, amount))
    }

    pub fn set_bus_gain(&self, bus: &str, gain: f32) -> Result<()> {
        self.with_mixer(|m, b| m.set_bus_gain(b, bus, gain))
    }

    pub fn set_bus_pan(&self, bus: &str, pan: f32) -> Result<()> {
        self.mixer.write().set_bus_pan(bus, pan)
    }

    pub fn set_bus_mute(&self, bus: &str, mute: bool) -> Result<()> {
        self.with_mixer(|m, b| m.set_bus_mute(b, bus, mute))
    }

    pub fn set_bus_solo(&self, bus: &str, solo: bool) -> Result<()> {
        self.with_mixer(|m, b| m.set_bus_solo(b, bus, solo))
    }

    pub fn set_send_gain(&self, send: &str, gain: f32) -> Result<()> {
        self.with_mixer(|m, b| m.set_send_gain(b, send, gain))
    }

    pub fn set_send_wet_dry(&self, send: &str, wet_dry: f32) -> Result<()> {
        self.with_mixer(|m, b| m.set_send_wet_dry(b, send, wet_dry))
    }

    pub fn set_master_gain(&self, gain: f32) -> Result<()> {
        self.with_mixer(|m, b| m.set_master_gain(b, gain))
    }

    pub fn set_master_pan(&self, pan: f32) -> Result<()> {
        self.mixer.write().set_master_pan(pan)
    }

    pub fn set_master_mute(&self, mute: bool) -> Result<()> {
        self.with_mixer(|m, b| m.set_master_mute(b, mute))
    }

    pub fn is_audible(&self, channel: &str) -> Result<bool> {
        self.mixer.read().is_audible(channel)
    }

    pub fn mixer_state(&self) -> MixerState {
        self.mixer.read().state()
    }

    pub fn apply_mixer_state(&self, state: &MixerState) -> Result<()> {
        self.with_mixer(|m, b| m.apply_state(b, state))
    }

    // ---- presets ------------------------------------------------------------

    /// Apply a preset to `instrument` through the regular setters.
    ///
    /// Unknown or invalid entries are skipped and listed in the report.
    pub fn load_preset(&self, instrument: &str, preset: &Preset) -> Result<PresetReport> {
        let pool = self.pool(instrument)?;
        let mut report = PresetReport::default();

        let params = {
            let mut instruments = self.instruments.write();
            let spec = instruments
                .get_mut(instrument)
                .ok_or_else(|| EngineError::UnknownInstrument(instrument.to_string()))?;
            for (name, value) in &preset.params {
                match spec.set(name, value) {
                    Ok(()) => report.applied += 1,
                    Err(err) => report.skipped.push(format!("param {name}: {err}")),
                }
            }
            spec.params.clone()
        };
        pool.retune(&params);

        {
            let mut matrix = self.matrix.write();
            if let Some(lfos) = &preset.lfos {
                for (id, patch) in lfos {
                    match matrix.set_lfo(id, patch) {
                        Ok(()) => report.applied += 1,
                        Err(err) => report.skipped.push(format!("lfo {id}: {err}")),
                    }
                }
            }
            if let Some(routings) = &preset.routings {
                let rejected = matrix.load_routings(routings);
                report.applied += routings.len() - rejected.len();
                for (spec, err) in rejected {
                    report
                        .skipped
                        .push(format!("routing {} -> {}: {err}", spec.source, spec.destination));
                }
            }
        }

        for line in &report.skipped {
            log::warn!("preset '{}' on {instrument}: skipped {line}", preset.name);
        }
        log::info!(
            "preset '{}' loaded on {instrument}: {} applied, {} skipped",
            preset.name,
            report.applied,
            report.skipped.len()
        );
        Ok(report)
    }

    #[cfg(feature = "serde")]
    pub fn load_preset_json(&self, instrument: &str, json: &str) -> Result<PresetReport> {
        let preset = Preset::from_json(json)?;
        self.load_preset(instrument, &preset)
    }

    /// Capture `instrument`'s parameters plus the current routings and LFOs.
    pub fn save_preset(&self, instrument: &str, name: &str) -> Result<Preset> {
        let params = self
            .instruments
            .read()
            .get(instrument)
            .map(|spec| spec.params.to_map())
            .ok_or_else(|| EngineError::UnknownInstrument(instrument.to_string()))?;
        let matrix = self.matrix.read();
        Ok(Preset {
            name: name.to_string(),
            params,
            routings: Some(matrix.save_routings()),
            lfos: Some(matrix.lfo_patches()),
        })
    }

    // ---- control queue -----------------------------------------------------------

    /// Register a message source drained at the start of every tick.
    pub fn attach_receiver(&self, receiver: Box<dyn MessageReceiver + Send>) {
        self.receivers.lock().push(receiver);
    }

    /// Create a lock-free queue whose messages are applied on the next tick.
    #[cfg(feature = "rtrb")]
    pub fn control_queue(&self, capacity: usize) -> rtrb::Producer<ControlMessage> {
        let (producer, consumer) = rtrb::RingBuffer::new(capacity.max(1));
        self.attach_receiver(Box::new(consumer));
        producer
    }

    fn drain_messages(&self) -> Vec<ControlMessage> {
        let mut receivers = self.receivers.lock();
        let mut messages = Vec::new();
        for receiver in receivers.iter_mut() {
            while let Some(message) = receiver.pop() {
                messages.push(message);
            }
        }
        messages
    }

    fn handle_message(&self, message: ControlMessage) {
        let result = match message {
            ControlMessage::NoteOn {
                instrument,
                note,
                velocity,
                duration,
            } => self.play_midi(&instrument, note, velocity, duration).map(|_| ()),
            ControlMessage::NoteOff { instrument, note } => self.note_off(&instrument, note).map(|_| ()),
            ControlMessage::Performance { source, value } => self.update_source(&source, value),
            ControlMessage::AllNotesOff => {
                self.stop_all_notes();
                Ok(())
            }
        };
        if let Err(err) = result {
            log::warn!("control message dropped: {err}");
        }
    }

    // ---- control tick ---------------------------------------------------------------

    /// One control-rate step.
    ///
    /// Drains queued messages, samples every modulation source once into a
    /// frame, drives every voice from that frame, and tears down voices that
    /// have finished. Never fails: per-voice backend errors are logged and
    /// the voice is dropped.
    pub fn tick(&self) -> TickReport {
        let messages = self.drain_messages();
        let message_count = messages.len();
        for message in messages {
            self.handle_message(message);
        }

        let now = self.now();
        let frame = self.matrix.write().sample(now);
        let ramp_end = now + self.config.control_period();

        let mut report = TickReport {
            time: now,
            messages: message_count,
            ..Default::default()
        };
        for pool in self.pools.values() {
            let drive = pool.drive(&self.backend, &frame, now, ramp_end);
            report.active_voices += drive.active;
            report.reaped += drive.reaped;
        }

        let newest = self
            .pools
            .values()
            .filter_map(VoicePool::newest_sources)
            .max_by(|a, b| a.0.total_cmp(&b.0));
        if let Some((_, sources)) = newest {
            self.matrix.write().mirror_voice(&sources);
        }

        self.ticks.fetch_add(1, Ordering::Relaxed);
        report
    }

    pub fn engine_stats(&self) -> EngineStats {
        let voices: BTreeMap<String, usize> = self
            .pools
            .iter()
            .map(|(id, pool)| (id.clone(), pool.len()))
            .collect();
        let mixer = self.mixer.read().state();
        EngineStats {
            time: self.now(),
            ticks: self.ticks.load(Ordering::Relaxed),
            active_voices: voices.values().sum(),
            voices,
            matrix: self.matrix.read().stats(),
            instruments: self.pools.len(),
            channels: mixer.channels.len(),
            buses: mixer.buses.len(),
            sends: mixer.sends.len(),
        }
    }

    /// Tear down every voice and mixer node. The engine stays usable for
    /// queries but plays nothing afterwards.
    pub fn shutdown(&self) {
        let killed = self.kill_all_voices();
        let mut mixer = self.mixer.write();
        let mut backend = self.backend.lock();
        mixer.teardown(&mut *backend);
        log::info!("engine shut down ({killed} voices killed)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::OfflineBackend;

    fn engine() -> Engine<OfflineBackend> {
        Engine::new(EngineConfig::default(), OfflineBackend::new()).unwrap()
    }

    #[test]
    fn unknown_instrument_and_bad_note_are_rejected() {
        let engine = engine();
        assert!(matches!(
            engine.play_note("kazoo", "C4", 1.0, None),
            Err(EngineError::UnknownInstrument(_))
        ));
        assert!(matches!(
            engine.play_note("piano", "H2", 1.0, None),
            Err(EngineError::InvalidNote(_))
        ));
        assert!(matches!(
            engine.play_note("piano", "C4", f32::NAN, None),
            Err(EngineError::NonFinite(_))
        ));
        assert_eq!(engine.voice_count(), 0);
    }

    #[test]
    fn stop_note_is_fire_and_forget() {
        let engine = engine();
        let id = engine.play_note("piano", "C4", 0.9, None).unwrap().unwrap();
        assert!(engine.stop_note(id));
        assert!(!engine.stop_note(id));
        assert!(!engine.stop_note(VoiceId(999)));
        assert_eq!(engine.voice_count(), 1);
    }

    #[test]
    fn set_parameter_validates_name() {
        let engine = engine();
        engine.set_parameter("tb303", "filter1Resonance", 20.0f32).unwrap();
        assert_eq!(
            engine.parameter("tb303", "filter1Resonance").unwrap(),
            ParamValue::Number(20.0)
        );
        assert!(matches!(
            engine.set_parameter("tb303", "fluxCapacitor", 1.0f32),
            Err(EngineError::UnknownParameter { .. })
        ));
    }

    #[test]
    fn tick_reaps_released_voices() {
        let engine = engine();
        engine.play_note("kick", "C2", 1.0, Some(0.01)).unwrap();
        engine.tick();
        assert_eq!(engine.voice_count(), 1);

        engine.backend().advance(1.0);
        let report = engine.tick();
        assert_eq!(report.reaped, 1);
        assert_eq!(engine.voice_count(), 0);
    }

    #[test]
    fn stats_reflect_topology() {
        let engine = engine();
        let stats = engine.engine_stats();
        assert_eq!(stats.channels, 15);
        assert_eq!(stats.buses, 4);
        assert_eq!(stats.sends, 3);
        assert_eq!(stats.instruments, 15);
        assert_eq!(stats.matrix.lfo_count, 4);
    }
}
