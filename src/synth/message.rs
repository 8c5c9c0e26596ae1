#[cfg(feature = "rtrb")]
use rtrb::Consumer;

/// Control events delivered to the engine from another thread and applied
/// at the start of the next tick.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlMessage {
    NoteOn {
        instrument: String,
        note: u8,
        velocity: f32,
        duration: Option<f64>,
    },
    NoteOff {
        instrument: String,
        note: u8,
    },
    /// Set a performance source such as `modwheel` or `pitchbend`.
    Performance { source: String, value: f32 },
    AllNotesOff,
}

pub trait MessageReceiver {
    fn pop(&mut self) -> Option<ControlMessage>;
}

#[cfg(feature = "rtrb")]
impl MessageReceiver for Consumer<ControlMessage> {
    fn pop(&mut self) -> Option<ControlMessage> {
        Consumer::pop(self).ok()
    }
}

impl MessageReceiver for std::sync::mpsc::Receiver<ControlMessage> {
    fn pop(&mut self) -> Option<ControlMessage> {
        self.try_recv().ok()
    }
}
