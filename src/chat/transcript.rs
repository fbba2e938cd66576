//! Chat transcript state for the follow-up consult
//!
//! One transcript per diagnosis. Streamed reply fragments fold onto the
//! trailing assistant message; the merge is pure state manipulation so it
//! can be driven by a canned fragment sequence under test.

/// Who authored a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Role {
    User,
    Assistant,
}

/// One message in the transcript
///
/// Text grows while its stream is active and is frozen once the stream
/// ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ChatMessage {
    pub role: Role,
    pub text: String,
}

/// Shown when a reply stream dies before completing
const STREAM_FAILURE_NOTICE: &str = "Sorry, I encountered an error processing that request.";

/// Ordered transcript for one diagnosis context
#[derive(Debug, Clone, Default)]
pub(crate) struct Transcript {
    messages: Vec<ChatMessage>,
    pending: bool,
}

impl Transcript {
    /// Open a transcript seeded with one assistant greeting that
    /// references the diagnosed condition
    pub(crate) fn seeded(condition: &str) -> Self {
        Self {
            messages: vec![ChatMessage {
                role: Role::Assistant,
                text: format!(
                    "I've analyzed your scan for {condition}. Do you have any specific \
                     questions about the recommended ingredients or how to start your \
                     new routine?"
                ),
            }],
            pending: false,
        }
    }

    pub(crate) fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Whether a send is still streaming
    pub(crate) fn is_pending(&self) -> bool {
        self.pending
    }

    /// Whether a draft may be submitted: non-empty input and no send in
    /// flight
    pub(crate) fn can_submit(&self, input: &str) -> bool {
        !input.trim().is_empty() && !self.pending
    }

    /// Record a user send: the user message and an empty assistant
    /// placeholder are appended immediately, before any network activity
    pub(crate) fn begin_send(&mut self, text: String) {
        self.messages.push(ChatMessage {
            role: Role::User,
            text,
        });
        self.messages.push(ChatMessage {
            role: Role::Assistant,
            text: String::new(),
        });
        self.pending = true;
    }

    /// Fold one streamed fragment onto the trailing assistant message
    ///
    /// Fragments arrive and apply strictly in order; each concatenation
    /// is observable as soon as it lands.
    pub(crate) fn apply_fragment(&mut self, fragment: &str) {
        if !self.pending {
            return;
        }
        if let Some(last) = self.messages.last_mut() {
            if last.role == Role::Assistant {
                last.text.push_str(fragment);
            }
        }
    }

    /// The reply stream finished; the trailing message is now immutable
    pub(crate) fn complete_stream(&mut self) {
        self.pending = false;
    }

    /// The reply stream died mid-response
    ///
    /// An untouched placeholder is removed so the transcript never shows
    /// a silent empty bubble; a partial reply stays, followed by one
    /// generic failure notice. Subsequent sends remain possible.
    pub(crate) fn fail_stream(&mut self) {
        if !self.pending {
            return;
        }
        if let Some(last) = self.messages.last() {
            if last.role == Role::Assistant && last.text.is_empty() {
                self.messages.pop();
            }
        }
        self.messages.push(ChatMessage {
            role: Role::Assistant,
            text: STREAM_FAILURE_NOTICE.to_string(),
        });
        self.pending = false;
    }
}
