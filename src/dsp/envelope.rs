use crate::MIN_SEGMENT_SECS;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
ADSR Envelope Scheduling
========================

The envelope here is a pure function of elapsed time. There is no per-sample
state machine and no timer: given the ADSR spec, the time since note-on and
(optionally) the time since note-off, the level and stage are computed
directly. This keeps voice lifecycles replayable and testable, and lets the
control tick evaluate any voice at any time without mutation.

Vocabulary
----------

  level       The envelope's output (0.0 to 1.0). Multiplies voice amplitude,
              or scales the filter sweep for the filter envelope.

  stage       Attack, Decay, Sustain, Release or Finished. Derived from time,
              never stored.

  since_on    Seconds elapsed since the note started.

  since_off   Seconds elapsed since the note was released, if it has been.


The Shape: Linear Ramps
-----------------------

  Level
    1.0 ┐     ╱╲
        │    ╱  ╲___________
    S   │   ╱               ╲
        │  ╱                 ╲
    0.0 └─╱───────────────────╲──→ Time
        Attack Decay  Sustain  Release

  [0, A)          0 → 1
  [A, A + D)      1 → S
  [A + D, off)    S
  release         level_at_off → 0 over R seconds

A held envelope whose sustain is below RELEASE_FLOOR reports Finished as soon
as the decay ends, so one-shot sounds end without a note-off.


Release Starts From The Held Level
----------------------------------

Releasing during the attack must not jump to the sustain level. The release
ramp starts from whatever value the envelope had at the off instant:

    level_at_off = value(spec, since_on - since_off, None)
    level        = level_at_off * (1 - since_off / R)

The ramp is monotonic and the voice is considered finished once the level
drops below RELEASE_FLOOR or R seconds have passed, whichever comes first.


Degenerate Times
----------------

Zero, negative or non-finite segment times would divide by zero in the ramp
math. Every segment time is clamped to at least MIN_SEGMENT_SECS (1 ms), and
sustain is clamped to [0, 1].
*/

/// Level below which a releasing voice counts as silent.
pub const RELEASE_FLOOR: f32 = 1.0e-3;

/// Attack/decay/sustain/release parameters (seconds, seconds, ratio, seconds).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeSpec {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl EnvelopeSpec {
    pub fn adsr(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self {
            attack,
            decay,
            sustain,
            release,
        }
    }

    /// Copy with every time clamped to the minimum segment and sustain to [0, 1].
    pub fn sanitized(&self) -> Self {
        Self {
            attack: clamp_time(self.attack),
            decay: clamp_time(self.decay),
            sustain: if self.sustain.is_finite() {
                self.sustain.clamp(0.0, 1.0)
            } else {
                0.0
            },
            release: clamp_time(self.release),
        }
    }
}

impl Default for EnvelopeSpec {
    fn default() -> Self {
        Self::adsr(0.01, 0.1, 0.7, 0.3)
    }
}

fn clamp_time(secs: f32) -> f32 {
    if secs.is_finite() {
        secs.max(MIN_SEGMENT_SECS)
    } else {
        MIN_SEGMENT_SECS
    }
}

/// Lifecycle stage of a voice, derived from elapsed time.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStage {
    Attack,
    Decay,
    Sustain,
    Release,
    Finished,
}

/// Envelope level at `since_on` seconds after note-on.
///
/// `since_off` is the time since note-off, or `None` while the key is held.
pub fn value(spec: &EnvelopeSpec, since_on: f64, since_off: Option<f64>) -> f32 {
    let spec = spec.sanitized();
    match since_off {
        None => held_level(&spec, since_on),
        Some(since_off) => {
            let since_off = since_off.max(0.0);
            let release = spec.release as f64;
            if !since_off.is_finite() || since_off >= release {
                return 0.0;
            }
            let level_at_off = held_level(&spec, since_on - since_off);
            (level_at_off * (1.0 - (since_off / release) as f32)).max(0.0)
        }
    }
}

/// Stage at the given elapsed times.
pub fn stage(spec: &EnvelopeSpec, since_on: f64, since_off: Option<f64>) -> EnvelopeStage {
    let spec = spec.sanitized();
    match since_off {
        Some(off) => {
            if !off.is_finite() || off >= spec.release as f64 {
                return EnvelopeStage::Finished;
            }
            if value(&spec, since_on, Some(off)) < RELEASE_FLOOR && off > 0.0 {
                EnvelopeStage::Finished
            } else {
                EnvelopeStage::Release
            }
        }
        None => {
            let attack = spec.attack as f64;
            let decay = spec.decay as f64;
            if since_on < attack {
                EnvelopeStage::Attack
            } else if since_on < attack + decay {
                EnvelopeStage::Decay
            } else if spec.sustain < RELEASE_FLOOR {
                EnvelopeStage::Finished
            } else {
                EnvelopeStage::Sustain
            }
        }
    }
}

/// Level while the gate is held. Expects a sanitized spec.
fn held_level(spec: &EnvelopeSpec, since_on: f64) -> f32 {
    if !since_on.is_finite() || since_on <= 0.0 {
        return 0.0;
    }
    let attack = spec.attack as f64;
    let decay = spec.decay as f64;

    if since_on < attack {
        (since_on / attack) as f32
    } else if since_on < attack + decay {
        let progress = ((since_on - attack) / decay) as f32;
        1.0 - (1.0 - spec.sustain) * progress
    } else {
        spec.sustain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attack_ramps_linearly_to_full_level() {
        let spec = EnvelopeSpec::adsr(0.1, 0.2, 0.5, 0.3);
        assert_eq!(value(&spec, 0.0, None), 0.0);
        assert!((value(&spec, 0.05, None) - 0.5).abs() < 1e-5);
        assert!((value(&spec, 0.1, None) - 1.0).abs() < 1e-5);
        assert_eq!(stage(&spec, 0.05, None), EnvelopeStage::Attack);
    }

    #[test]
    fn decay_settles_on_sustain() {
        let spec = EnvelopeSpec::adsr(0.1, 0.2, 0.5, 0.3);
        assert!((value(&spec, 0.2, None) - 0.75).abs() < 1e-5);
        assert_eq!(stage(&spec, 0.2, None), EnvelopeStage::Decay);
        assert!((value(&spec, 1.0, None) - 0.5).abs() < 1e-6);
        assert_eq!(stage(&spec, 1.0, None), EnvelopeStage::Sustain);
    }

    #[test]
    fn silent_sustain_finishes_after_decay() {
        let spec = EnvelopeSpec::adsr(0.001, 0.15, 0.0, 0.05);
        assert_eq!(stage(&spec, 0.1, None), EnvelopeStage::Decay);
        assert_eq!(stage(&spec, 0.151, None), EnvelopeStage::Finished);
        assert_eq!(stage(&spec, 5.0, None), EnvelopeStage::Finished);
        assert_eq!(value(&spec, 5.0, None), 0.0);
    }

    #[test]
    fn release_starts_from_held_level_during_attack() {
        let spec = EnvelopeSpec::adsr(1.0, 0.1, 0.2, 0.5);
        // Released at 0.5s into a 1s attack: level at off = 0.5.
        let at_off = value(&spec, 0.5, Some(0.0));
        assert!((at_off - 0.5).abs() < 1e-5, "got {}", at_off);
        let halfway = value(&spec, 0.75, Some(0.25));
        assert!((halfway - 0.25).abs() < 1e-5, "got {}", halfway);
    }

    #[test]
    fn release_is_monotonic_and_reaches_zero() {
        let spec = EnvelopeSpec::adsr(0.01, 0.05, 0.6, 0.3);
        let released_at = 0.5;
        let mut previous = f32::MAX;
        for step in 0..=40 {
            let since_off = step as f64 * 0.01;
            let level = value(&spec, released_at + since_off, Some(since_off));
            assert!(level <= previous + 1e-6, "release must not rise");
            previous = level;
        }
        assert!(value(&spec, released_at + 0.3, Some(0.3)) < 1e-6);
        assert_eq!(value(&spec, released_at + 0.35, Some(0.35)), 0.0);
        assert_eq!(stage(&spec, released_at + 0.31, Some(0.31)), EnvelopeStage::Finished);
    }

    #[test]
    fn release_stage_reported_while_ramping() {
        let spec = EnvelopeSpec::adsr(0.01, 0.05, 0.6, 0.3);
        assert_eq!(stage(&spec, 0.6, Some(0.1)), EnvelopeStage::Release);
    }

    #[test]
    fn zero_times_are_clamped_not_nan() {
        let spec = EnvelopeSpec::adsr(0.0, 0.0, 0.8, 0.0);
        for &t in &[0.0, 0.0005, 0.001, 0.002, 1.0] {
            let v = value(&spec, t, None);
            assert!(v.is_finite(), "level must be finite at {}", t);
        }
        let released = value(&spec, 1.0, Some(0.0005));
        assert!(released.is_finite());
        assert_eq!(stage(&spec, 1.01, Some(0.01)), EnvelopeStage::Finished);
    }

    #[test]
    fn non_finite_spec_is_sanitized() {
        let spec = EnvelopeSpec::adsr(f32::NAN, f32::INFINITY, f32::NAN, -1.0);
        let clean = spec.sanitized();
        assert_eq!(clean.attack, MIN_SEGMENT_SECS);
        assert_eq!(clean.decay, MIN_SEGMENT_SECS);
        assert_eq!(clean.sustain, 0.0);
        assert_eq!(clean.release, MIN_SEGMENT_SECS);
        assert!(value(&spec, 0.5, None).is_finite());
    }

    #[test]
    fn sustain_outside_unit_range_is_clamped() {
        let spec = EnvelopeSpec::adsr(0.01, 0.01, 3.0, 0.1);
        assert!((value(&spec, 1.0, None) - 1.0).abs() < 1e-6);
    }
}
