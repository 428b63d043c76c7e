//! Chat transcript state
//!
//! The transcript is an owned value that only changes through [`reduce`].
//! Every UI event that touches the conversation becomes a [`TranscriptEvent`],
//! so the whole conversation model can be exercised without a terminal.

use serde::{Deserialize, Serialize};

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    System,
}

/// A single chat message. Never modified after it is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    pub sender: Sender,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::User,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::System,
        }
    }
}

/// Generation token handed out on every submit.
///
/// Replies carry the id of the submit that caused them; only replies for the
/// latest submit are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RequestId(u64);

impl RequestId {
    fn next(self) -> Self {
        RequestId(self.0 + 1)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEvent {
    UpdateDraft(String),
    SubmitUser,
    SubmitSystem { request: RequestId, text: String },
    SubmitError { request: RequestId, text: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
    draft: String,
    current: RequestId,
    answered: RequestId,
    revision: u64,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[cfg(test)]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Bumped on every append; used as the chart redraw key.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Id minted by the most recent submit (zero before the first one)
    pub fn current_request(&self) -> RequestId {
        self.current
    }

    pub fn is_awaiting_reply(&self) -> bool {
        self.current != self.answered
    }

    fn append(&mut self, message: Message) {
        self.messages.push(message);
        self.revision += 1;
    }

    fn accepts(&self, request: RequestId) -> bool {
        request == self.current && self.is_awaiting_reply()
    }
}

/// Apply one event and return the resulting transcript.
pub fn reduce(mut state: Transcript, event: TranscriptEvent) -> Transcript {
    match event {
        TranscriptEvent::UpdateDraft(text) => {
            state.draft = text;
        }
        TranscriptEvent::SubmitUser => {
            let text = std::mem::take(&mut state.draft);
            state.append(Message::user(text));
            state.current = state.current.next();
        }
        TranscriptEvent::SubmitSystem { request, text }
        | TranscriptEvent::SubmitError { request, text } => {
            if state.accepts(request) {
                state.append(Message::system(text));
                state.answered = request;
            } else {
                tracing::debug!(
                    request = request.get(),
                    current = state.current.get(),
                    "dropping stale reply"
                );
            }
        }
    }
    state
}
