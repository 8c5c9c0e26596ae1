//! Per-tick modulation snapshot.
//!
//! The matrix lock is taken once per control tick to build a [`ModFrame`];
//! voices then read destination values from the frame without touching the
//! matrix. Envelope and velocity sources are voice-local, so a route from
//! them is resolved against the reading voice's own [`VoiceSources`].

use std::collections::HashMap;

use super::source::{ENV1, ENV2, VELOCITY};

/// Per-voice values that stand in for the shared envelope and velocity sources.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VoiceSources {
    pub filter_env: f32,
    pub amp_env: f32,
    pub velocity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VoiceSlot {
    FilterEnv,
    AmpEnv,
    Velocity,
}

impl VoiceSlot {
    pub(crate) fn for_source(id: &str) -> Option<Self> {
        match id {
            ENV1 => Some(Self::FilterEnv),
            ENV2 => Some(Self::AmpEnv),
            VELOCITY => Some(Self::Velocity),
            _ => None,
        }
    }

    fn read(self, voice: &VoiceSources) -> f32 {
        match self {
            Self::FilterEnv => voice.filter_env,
            Self::AmpEnv => voice.amp_env,
            Self::Velocity => voice.velocity,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct FrameRoute {
    pub value: f32,
    pub slot: Option<VoiceSlot>,
    pub amount: f32,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct FrameTarget {
    pub min: f32,
    pub max: f32,
    pub routes: Vec<FrameRoute>,
}

/// Source values and enabled routings captured at one instant.
#[derive(Debug, Clone, Default)]
pub struct ModFrame {
    pub time: f64,
    pub(crate) targets: HashMap<String, FrameTarget>,
}

impl ModFrame {
    /// `base` plus every routed contribution, scaled by the destination span
    /// and clamped to its range. Unknown destinations pass `base` through.
    pub fn modulated(&self, destination: &str, base: f32, voice: &VoiceSources) -> f32 {
        let Some(target) = self.targets.get(destination) else {
            return base;
        };

        let sum: f32 = target
            .routes
            .iter()
            .map(|route| {
                let value = route.slot.map_or(route.value, |slot| slot.read(voice));
                contribution(value, route.amount)
            })
            .sum();

        let result = base + sum * (target.max - target.min);
        if result.is_nan() {
            return base.clamp(target.min, target.max);
        }
        result.clamp(target.min, target.max)
    }

    pub fn range(&self, destination: &str) -> Option<(f32, f32)> {
        self.targets.get(destination).map(|t| (t.min, t.max))
    }

    /// True when at least one enabled routing targets `destination`.
    pub fn is_routed(&self, destination: &str) -> bool {
        self.targets
            .get(destination)
            .is_some_and(|t| !t.routes.is_empty())
    }

    pub fn route_count(&self) -> usize {
        self.targets.values().map(|t| t.routes.len()).sum()
    }
}

/// A routing whose value or amount is not finite contributes nothing.
pub(crate) fn contribution(value: f32, amount: f32) -> f32 {
    let c = value * amount;
    if c.is_finite() {
        c
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with(routes: Vec<FrameRoute>) -> ModFrame {
        let mut frame = ModFrame::default();
        frame.targets.insert(
            "filterCutoff".into(),
            FrameTarget {
                min: 20.0,
                max: 10_000.0,
                routes,
            },
        );
        frame
    }

    #[test]
    fn voice_slot_overrides_shared_value() {
        let frame = frame_with(vec![FrameRoute {
            value: 0.0,
            slot: Some(VoiceSlot::FilterEnv),
            amount: 0.5,
        }]);
        let voice = VoiceSources {
            filter_env: 0.2,
            ..Default::default()
        };
        let v = frame.modulated("filterCutoff", 1000.0, &voice);
        assert!((v - (1000.0 + 0.1 * 9980.0)).abs() < 1e-2);
    }

    #[test]
    fn non_finite_route_contributes_zero() {
        let frame = frame_with(vec![FrameRoute {
            value: f32::NAN,
            slot: None,
            amount: 1.0,
        }]);
        assert_eq!(
            frame.modulated("filterCutoff", 500.0, &VoiceSources::default()),
            500.0
        );
    }

    #[test]
    fn unknown_destination_passes_base() {
        let frame = ModFrame::default();
        assert_eq!(frame.modulated("nope", 3.0, &VoiceSources::default()), 3.0);
    }
}
