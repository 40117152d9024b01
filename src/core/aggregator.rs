use crate::core::transcript::Transcript;
use tracing::debug;

/// Turns inbound transport events into transcript mutations.
///
/// Borrowed from the session for the duration of one event so the transcript
/// stays the single owner of the turns.
pub struct ResponseAggregator<'a> {
    transcript: &'a mut Transcript,
}

impl<'a> ResponseAggregator<'a> {
    pub fn new(transcript: &'a mut Transcript) -> Self {
        Self { transcript }
    }

    /// Open an assistant turn with `text` or append `text` to the open one.
    pub fn on_fragment(&mut self, text: &str) {
        if !self.transcript.append_to_open(text) {
            self.transcript.open_assistant(text);
        }
    }

    /// Close the open assistant turn. A second completion is a no-op.
    pub fn on_complete(&mut self) {
        if !self.transcript.close_open_turn() {
            debug!("completion received with no open assistant turn");
        }
    }

    /// Adopt a whole one-shot reply.
    pub fn on_reply(&mut self, text: &str) {
        self.on_fragment(text);
        self.on_complete();
    }

    /// Keep whatever was streamed and append a failure marker for `reason`.
    pub fn on_error(&mut self, reason: &str) {
        self.transcript.close_open_turn();
        self.transcript.push_failure(reason.trim());
    }
}
