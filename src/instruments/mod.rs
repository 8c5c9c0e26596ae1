//! Stock instrument templates.
//!
//! Each template is a ready-to-use [`ParamSet`]. The default mixer topology
//! names a template per channel; use these as starting points for your own
//! sounds, or study them to learn how different timbres are built from the
//! same oscillator/filter/envelope stack.
//!
//! # Example
//!
//! ```
//! use modmix::instruments;
//!
//! let kick = instruments::kick();
//! let pad = instruments::template("pad").unwrap();
//! assert!(kick.amp_env.sustain < pad.amp_env.sustain);
//! ```

mod acid;
mod bass;
mod clap;
mod hihat;
mod keys;
mod kick;
mod lead;
mod organ;
mod pad;
mod pluck;
mod snare;
mod strings;
mod tom;

pub use acid::acid;
pub use bass::bass;
pub use clap::clap;
pub use hihat::hihat;
pub use keys::keys;
pub use kick::kick;
pub use lead::lead;
pub use organ::organ;
pub use pad::pad;
pub use pluck::pluck;
pub use snare::snare;
pub use strings::strings;
pub use tom::tom;

use crate::synth::params::ParamSet;

pub const TEMPLATE_NAMES: &[&str] = &[
    "acid", "bass", "clap", "hihat", "keys", "kick", "lead", "organ", "pad", "pluck", "snare",
    "strings", "tom",
];

/// Look up a template by name.
pub fn template(name: &str) -> Option<ParamSet> {
    Some(match name {
        "acid" => acid(),
        "bass" => bass(),
        "clap" => clap(),
        "hihat" => hihat(),
        "keys" => keys(),
        "kick" => kick(),
        "lead" => lead(),
        "organ" => organ(),
        "pad" => pad(),
        "pluck" => pluck(),
        "snare" => snare(),
        "strings" => strings(),
        "tom" => tom(),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_template_resolves() {
        for name in TEMPLATE_NAMES {
            assert!(template(name).is_some(), "{name}");
        }
        assert!(template("theremin").is_none());
    }

    #[test]
    fn drums_do_not_sustain() {
        for drum in [kick(), snare(), hihat(), clap(), tom()] {
            assert_eq!(drum.amp_env.sustain, 0.0);
        }
    }
}
