// Purpose: Instruments, voices and polyphony.
// This layer sits between the modulation matrix and the mixer: it turns
// notes into backend node graphs and keeps them driven until they finish.

pub mod instrument;
pub mod message;
pub mod params;
pub mod poly;
pub mod voice;

pub use instrument::InstrumentSpec;
pub use message::{ControlMessage, MessageReceiver};
pub use params::{Param, ParamSet, ParamType, ParamValue};
pub use poly::{DriveReport, VoicePool};
pub use voice::{Voice, VoiceId, VoiceInfo, VoiceLimits};
