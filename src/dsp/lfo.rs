//! Low Frequency Oscillator (LFO) evaluation.

/*
Low Frequency Oscillators
=========================

An LFO is an oscillator running at sub-audio frequencies. Here it never makes
sound: it is a modulation *source* sampled once per control tick and fed
through the routing matrix into destination parameters.

Vocabulary
----------

  control-rate    Frequencies below human hearing: ~0.01 Hz to ~20 Hz.
                  The engine samples every LFO once per control tick.

  phase           Position inside one cycle, in [0, 1). Computed from
                  absolute time rather than accumulated, so evaluation is a
                  pure function of `t`:

                      phase = frac(t * rate_hz + phase_offset)

  depth           Output scale applied after the waveform lookup.

  bipolar         Output swings -depth..+depth. Symmetric effects (vibrato).

  unipolar        Output is remapped with (v + 1) / 2 after depth scaling.
                  One-directional effects (tremolo, envelope-like sweeps).


Waveforms (bipolar, before depth)
---------------------------------

  sine        sin(2π·phase)
  triangle    phase < 0.5 ? 4·phase - 1 : 3 - 4·phase
  square      phase < 0.5 ? 1 : -1
  sawtooth    2·phase - 1
  random      uniform draw in [-1, 1]


Random: sample-and-hold vs per-sample
-------------------------------------

A random LFO can redraw on every evaluation (audio-rate noise when sampled
fast) or hold one value per rate period (classic S&H "computer bleeps").

  SampleAndHold   One value per period. The draw is seeded from the LFO seed
                  and the period index, so the same `t` always yields the same
                  value and every destination sees a consistent number.

  PerSample       Fresh draw on every call. The control tick still samples the
                  source once, so destinations within one tick agree.


Bipolar to Unipolar Conversion
------------------------------

    unipolar = (bipolar + 1.0) * 0.5

    bipolar   unipolar
    -1.0      0.0
     0.0      0.5
    +1.0      1.0
*/

use std::f64::consts::TAU;

use rand::{rngs::StdRng, Rng, SeedableRng};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LfoWaveform {
    Sine,
    Triangle,
    Square,
    Sawtooth,
    Random,
}

impl LfoWaveform {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sine" => Some(Self::Sine),
            "triangle" | "tri" => Some(Self::Triangle),
            "square" => Some(Self::Square),
            "sawtooth" | "saw" => Some(Self::Sawtooth),
            "random" | "s&h" => Some(Self::Random),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Sine => "sine",
            Self::Triangle => "triangle",
            Self::Square => "square",
            Self::Sawtooth => "sawtooth",
            Self::Random => "random",
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RandomMode {
    #[default]
    SampleAndHold,
    PerSample,
}

/// Parameters of one LFO.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct LfoState {
    pub rate_hz: f32,
    pub waveform: LfoWaveform,
    /// Phase offset in [0, 1).
    pub phase: f32,
    pub depth: f32,
    pub bipolar: bool,
    /// Restart the cycle when a note starts.
    pub retrigger: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub random_mode: RandomMode,
    #[cfg_attr(feature = "serde", serde(default))]
    pub seed: u64,
}

impl LfoState {
    pub fn new(waveform: LfoWaveform, rate_hz: f32) -> Self {
        Self {
            rate_hz,
            waveform,
            phase: 0.0,
            depth: 1.0,
            bipolar: true,
            retrigger: false,
            random_mode: RandomMode::default(),
            seed: 0,
        }
    }

    pub fn sine(rate_hz: f32) -> Self {
        Self::new(LfoWaveform::Sine, rate_hz)
    }

    pub fn triangle(rate_hz: f32) -> Self {
        Self::new(LfoWaveform::Triangle, rate_hz)
    }

    pub fn square(rate_hz: f32) -> Self {
        Self::new(LfoWaveform::Square, rate_hz)
    }

    pub fn sawtooth(rate_hz: f32) -> Self {
        Self::new(LfoWaveform::Sawtooth, rate_hz)
    }

    pub fn random(rate_hz: f32) -> Self {
        Self::new(LfoWaveform::Random, rate_hz)
    }

    pub fn with_depth(mut self, depth: f32) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_phase(mut self, phase: f32) -> Self {
        self.phase = phase;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn unipolar(mut self) -> Self {
        self.bipolar = false;
        self
    }

    pub fn retriggered(mut self) -> Self {
        self.retrigger = true;
        self
    }
}

/// Evaluate `lfo` at time `t` (seconds).
///
/// Non-finite inputs degrade to 0.0 instead of leaking NaN into the matrix.
pub fn evaluate(lfo: &LfoState, t: f64) -> f32 {
    let rate = lfo.rate_hz as f64;
    if !t.is_finite() || !rate.is_finite() || !lfo.phase.is_finite() || !lfo.depth.is_finite() {
        return 0.0;
    }

    let position = t * rate + lfo.phase as f64;
    let phase = position - position.floor();

    let raw = match lfo.waveform {
        LfoWaveform::Sine => (TAU * phase).sin(),
        LfoWaveform::Triangle => {
            if phase < 0.5 {
                4.0 * phase - 1.0
            } else {
                3.0 - 4.0 * phase
            }
        }
        LfoWaveform::Square => {
            if phase < 0.5 {
                1.0
            } else {
                -1.0
            }
        }
        LfoWaveform::Sawtooth => 2.0 * phase - 1.0,
        LfoWaveform::Random => match lfo.random_mode {
            RandomMode::SampleAndHold => held_random(lfo.seed, position.floor() as i64),
            RandomMode::PerSample => rand::rng().random_range(-1.0..=1.0),
        },
    };

    let scaled = raw as f32 * lfo.depth;
    if lfo.bipolar {
        scaled
    } else {
        bipolar_to_unipolar(scaled)
    }
}

/// Deterministic draw in [-1, 1] for one S&H period.
fn held_random(seed: u64, period: i64) -> f64 {
    let mixed = seed ^ (period as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    StdRng::seed_from_u64(mixed).random_range(-1.0..=1.0)
}

/// Convert bipolar signal (-1.0 to +1.0) to unipolar (0.0 to 1.0).
#[inline]
pub fn bipolar_to_unipolar(bipolar: f32) -> f32 {
    (bipolar + 1.0) * 0.5
}

/// Convert unipolar signal (0.0 to 1.0) to bipolar (-1.0 to +1.0).
#[inline]
pub fn unipolar_to_bipolar(unipolar: f32) -> f32 {
    (unipolar * 2.0) - 1.0
}

/// Calculate LFO period in seconds from frequency.
///
/// # Example
/// ```
/// use modmix::dsp::lfo::period_from_frequency;
/// let period = period_from_frequency(5.0);
/// assert!((period - 0.2).abs() < 1e-6); // 5 Hz = 200ms period
/// ```
#[inline]
pub fn period_from_frequency(frequency_hz: f32) -> f32 {
    1.0 / frequency_hz
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAVEFORMS: [LfoWaveform; 5] = [
        LfoWaveform::Sine,
        LfoWaveform::Triangle,
        LfoWaveform::Square,
        LfoWaveform::Sawtooth,
        LfoWaveform::Random,
    ];

    fn times() -> impl Iterator<Item = f64> {
        (0..2000).map(|i| i as f64 * 0.0137 - 3.0)
    }

    #[test]
    fn per_sample_random_redraws_within_bounds() {
        let lfo = LfoState::random(1.0).with_depth(0.5);
        let lfo = LfoState {
            random_mode: RandomMode::PerSample,
            ..lfo
        };
        let draws: Vec<f32> = (0..64).map(|_| evaluate(&lfo, 0.25)).collect();
        assert!(draws.iter().all(|v| (-0.5..=0.5).contains(v)));
        assert!(draws.windows(2).any(|w| w[0] != w[1]), "per-sample mode must redraw");
    }

    #[test]
    fn test_bipolar_output_bounded_by_depth() {
        for waveform in WAVEFORMS {
            for depth in [0.25_f32, 0.8, 1.0] {
                let lfo = LfoState::new(waveform, 3.3).with_depth(depth);
                for t in times() {
                    let v = evaluate(&lfo, t);
                    assert!(
                        v >= -depth - 1e-6 && v <= depth + 1e-6,
                        "{:?} depth {} gave {} at t={}",
                        waveform,
                        depth,
                        v,
                        t
                    );
                }
            }
        }
    }

    #[test]
    fn test_unipolar_output_within_unit_range() {
        for waveform in WAVEFORMS {
            let lfo = LfoState::new(waveform, 1.7).unipolar();
            for t in times() {
                let v = evaluate(&lfo, t);
                assert!((0.0..=1.0 + 1e-6).contains(&v), "{:?} gave {}", waveform, v);
            }
        }
    }

    #[test]
    fn test_unipolar_partial_depth_stays_in_remapped_band() {
        let lfo = LfoState::sine(2.0).with_depth(0.5).unipolar();
        for t in times() {
            let v = evaluate(&lfo, t);
            assert!(v >= 0.25 - 1e-6 && v <= 0.75 + 1e-6, "got {}", v);
        }
    }

    #[test]
    fn test_waveform_shapes_at_known_phases() {
        let sine = LfoState::sine(1.0);
        assert!((evaluate(&sine, 0.25) - 1.0).abs() < 1e-6);
        assert!(evaluate(&sine, 0.0).abs() < 1e-6);

        let tri = LfoState::triangle(1.0);
        assert!((evaluate(&tri, 0.0) + 1.0).abs() < 1e-6);
        assert!((evaluate(&tri, 0.25) - 0.0).abs() < 1e-6);
        assert!((evaluate(&tri, 0.5) - 1.0).abs() < 1e-6);

        let square = LfoState::square(1.0);
        assert_eq!(evaluate(&square, 0.1), 1.0);
        assert_eq!(evaluate(&square, 0.6), -1.0);

        let saw = LfoState::sawtooth(1.0);
        assert!((evaluate(&saw, 0.0) + 1.0).abs() < 1e-6);
        assert!((evaluate(&saw, 0.75) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_phase_offset_shifts_cycle() {
        let lfo = LfoState::sine(1.0).with_phase(0.25);
        assert!((evaluate(&lfo, 0.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_sample_and_hold_is_constant_within_period() {
        let lfo = LfoState::random(2.0).with_seed(42);
        let first = evaluate(&lfo, 0.01);
        for i in 0..40 {
            let t = 0.01 + i as f64 * 0.012; // stays below 0.5s
            assert_eq!(evaluate(&lfo, t), first);
        }
    }

    #[test]
    fn test_sample_and_hold_changes_between_periods() {
        let lfo = LfoState::random(1.0).with_seed(7);
        let values: Vec<f32> = (0..16).map(|p| evaluate(&lfo, p as f64 + 0.5)).collect();
        let distinct = values
            .windows(2)
            .filter(|w| (w[0] - w[1]).abs() > 1e-9)
            .count();
        assert!(distinct > 8, "S&H should wander across periods: {:?}", values);
    }

    #[test]
    fn test_non_finite_time_degrades_to_zero() {
        let lfo = LfoState::sine(1.0);
        assert_eq!(evaluate(&lfo, f64::NAN), 0.0);
        assert_eq!(evaluate(&lfo, f64::INFINITY), 0.0);

        let broken = LfoState::sine(f32::NAN);
        assert_eq!(evaluate(&broken, 1.0), 0.0);
    }

    #[test]
    fn test_bipolar_to_unipolar() {
        assert!((bipolar_to_unipolar(-1.0) - 0.0).abs() < 1e-6);
        assert!((bipolar_to_unipolar(0.0) - 0.5).abs() < 1e-6);
        assert!((bipolar_to_unipolar(1.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_roundtrip_conversion() {
        for &val in &[-1.0, -0.5, 0.0, 0.5, 1.0] {
            let roundtrip = unipolar_to_bipolar(bipolar_to_unipolar(val));
            assert!((roundtrip - val).abs() < 1e-6);
        }
    }

    #[test]
    fn test_waveform_names_roundtrip() {
        for waveform in WAVEFORMS {
            assert_eq!(LfoWaveform::from_name(waveform.name()), Some(waveform));
        }
        assert_eq!(LfoWaveform::from_name("wobble"), None);
    }
}
