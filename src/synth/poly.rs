use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::backend::{AudioBackend, BackendError};
use crate::modulation::{ModFrame, VoiceSources};
use crate::synth::voice::{Voice, VoiceId, VoiceInfo, VoiceLimits};

/// Outcome of one control tick over a pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriveReport {
    pub active: usize,
    pub reaped: usize,
}

/// Live voices for one instrument, oldest first.
///
/// The pool lock is always taken before the backend lock.
pub struct VoicePool {
    instrument: String,
    polyphony: usize,
    limits: VoiceLimits,
    voices: Mutex<VecDeque<Voice>>,
}

impl VoicePool {
    pub fn new(instrument: &str, polyphony: usize, limits: VoiceLimits) -> Self {
        let polyphony = polyphony.max(1);
        Self {
            instrument: instrument.to_string(),
            polyphony,
            limits,
            voices: Mutex::new(VecDeque::with_capacity(polyphony)),
        }
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn polyphony(&self) -> usize {
        self.polyphony
    }

    /// Make room if the pool is full, then build a voice with `build`.
    ///
    /// At the ceiling the oldest voice is torn down first. Returns the new
    /// voice id and the ids of any stolen voices.
    pub fn allocate<B, F>(&self, backend: &Mutex<B>, build: F) -> Result<(VoiceId, Vec<VoiceId>), BackendError>
    where
        B: AudioBackend,
        F: FnOnce(&mut dyn AudioBackend) -> Result<Voice, BackendError>,
    {
        let mut voices = self.voices.lock();
        let mut backend = backend.lock();
        let now = backend.current_time();

        let mut stolen = Vec::new();
        while voices.len() >= self.polyphony {
            let Some(mut oldest) = voices.pop_front() else {
                break;
            };
            oldest.teardown(&mut *backend, now);
            log::debug!(
                "{}: stole voice {} (polyphony {})",
                self.instrument,
                oldest.id().0,
                self.polyphony
            );
            stolen.push(oldest.id());
        }

        let voice = build(&mut *backend)?;
        let id = voice.id();
        voices.push_back(voice);
        Ok((id, stolen))
    }

    /// Mark one voice as released. Unknown ids are ignored.
    pub fn release(&self, id: VoiceId, at: f64) -> bool {
        self.voices
            .lock()
            .iter_mut()
            .find(|v| v.id() == id)
            .is_some_and(|v| v.release(at))
    }

    /// Release every held voice playing `midi`.
    pub fn release_note(&self, midi: u8, at: f64) -> usize {
        self.voices
            .lock()
            .iter_mut()
            .filter(|v| v.midi() == midi)
            .map(|v| v.release(at))
            .filter(|released| *released)
            .count()
    }

    pub fn release_all(&self, at: f64) -> usize {
        self.voices
            .lock()
            .iter_mut()
            .map(|v| v.release(at))
            .filter(|released| *released)
            .count()
    }

    /// Drive every voice for this tick and tear down the finished ones.
    ///
    /// A voice whose backend calls fail is torn down and logged.
    pub fn drive<B: AudioBackend>(
        &self,
        backend: &Mutex<B>,
        frame: &ModFrame,
        now: f64,
        ramp_end: f64,
    ) -> DriveReport {
        let mut voices = self.voices.lock();
        if voices.is_empty() {
            return DriveReport::default();
        }
        let mut backend = backend.lock();
        let before = voices.len();

        voices.retain_mut(|voice| {
            if let Err(err) = voice.drive(&mut *backend, frame, now, ramp_end) {
                log::warn!(
                    "{}: voice {} failed to update ({err}); tearing down",
                    self.instrument,
                    voice.id().0
                );
                voice.teardown(&mut *backend, now);
                return false;
            }
            if voice.is_done(now, &self.limits) {
                voice.teardown(&mut *backend, now);
                return false;
            }
            true
        });

        DriveReport {
            active: voices.len(),
            reaped: before - voices.len(),
        }
    }

    /// Tear down every voice immediately.
    pub fn clear<B: AudioBackend>(&self, backend: &Mutex<B>) -> usize {
        let mut voices = self.voices.lock();
        let mut backend = backend.lock();
        let now = backend.current_time();
        let n = voices.len();
        for mut voice in voices.drain(..) {
            voice.teardown(&mut *backend, now);
        }
        n
    }

    pub fn retune(&self, params: &crate::synth::params::ParamSet) {
        for voice in self.voices.lock().iter_mut() {
            voice.retune(params);
        }
    }

    pub fn len(&self) -> usize {
        self.voices.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.lock().is_empty()
    }

    pub fn contains(&self, id: VoiceId) -> bool {
        self.voices.lock().iter().any(|v| v.id() == id)
    }

    pub fn voice_ids(&self) -> Vec<VoiceId> {
        self.voices.lock().iter().map(|v| v.id()).collect()
    }

    pub fn voices(&self) -> Vec<VoiceInfo> {
        self.voices.lock().iter().map(|v| v.info()).collect()
    }

    /// Envelope and velocity values of the most recently started voice.
    pub fn newest_sources(&self) -> Option<(f64, VoiceSources)> {
        self.voices
            .lock()
            .back()
            .map(|v| (v.start_time(), v.sources()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{NodeId, OfflineBackend};
    use crate::modulation::ModulationMatrix;
    use crate::synth::params::ParamSet;
    use crate::synth::voice::NoteRequest;

    fn start(pool: &VoicePool, backend: &Mutex<OfflineBackend>, out: NodeId, id: u64, midi: u8) -> Vec<VoiceId> {
        let frame = ModulationMatrix::new(0).sample(0.0);
        let params = ParamSet::default();
        let (_, stolen) = pool
            .allocate(backend, |b| {
                let now = b.current_time();
                Voice::start(
                    b,
                    NoteRequest {
                        id: VoiceId(id),
                        instrument: "test".into(),
                        midi,
                        velocity: 0.8,
                        start_time: now,
                        duration: None,
                        tuning: 440.0,
                    },
                    &params,
                    out,
                    &frame,
                )
            })
            .unwrap();
        stolen
    }

    fn backend_with_output() -> (Mutex<OfflineBackend>, NodeId) {
        let mut backend = OfflineBackend::new();
        let out = backend.create_gain(1.0).unwrap();
        (Mutex::new(backend), out)
    }

    #[test]
    fn oldest_voice_is_stolen_at_ceiling() {
        let (backend, out) = backend_with_output();
        let pool = VoicePool::new("test", 2, VoiceLimits::default());

        assert!(start(&pool, &backend, out, 1, 57).is_empty());
        backend.lock().advance(0.1);
        assert!(start(&pool, &backend, out, 2, 59).is_empty());
        backend.lock().advance(0.1);
        assert_eq!(start(&pool, &backend, out, 3, 60), vec![VoiceId(1)]);

        assert_eq!(pool.voice_ids(), vec![VoiceId(2), VoiceId(3)]);
        assert!(pool.len() <= pool.polyphony());
    }

    #[test]
    fn finished_voices_are_reaped() {
        let (backend, out) = backend_with_output();
        let pool = VoicePool::new("test", 4, VoiceLimits::default());
        start(&pool, &backend, out, 1, 60);
        let frame = ModulationMatrix::new(0).sample(0.0);

        assert_eq!(pool.release_note(60, 0.5), 1);
        assert_eq!(pool.release_note(60, 0.6), 0);
        let report = pool.drive(&backend, &frame, 2.0, 2.01);
        assert_eq!(report, DriveReport { active: 0, reaped: 1 });
        assert_eq!(backend.lock().live_nodes(), 1);
    }

    #[test]
    fn failed_allocation_keeps_pool_unchanged() {
        let (backend, out) = backend_with_output();
        let pool = VoicePool::new("test", 4, VoiceLimits::default());
        backend.lock().fail_after(0);
        let frame = ModulationMatrix::new(0).sample(0.0);
        let result = pool.allocate(&backend, |b| {
            Voice::start(
                b,
                NoteRequest {
                    id: VoiceId(9),
                    instrument: "test".into(),
                    midi: 60,
                    velocity: 1.0,
                    start_time: 0.0,
                    duration: None,
                    tuning: 440.0,
                },
                &ParamSet::default(),
                out,
                &frame,
            )
        });
        assert!(result.is_err());
        assert!(pool.is_empty());
    }
}
