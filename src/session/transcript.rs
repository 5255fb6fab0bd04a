use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One user-utterance/model-response pairing within a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Strictly increasing within a session.
    pub id: u64,
    /// When this turn was created.
    pub started_at: DateTime<Utc>,
    /// Accumulated transcription of the user's speech.
    pub user_text: String,
    /// Accumulated transcription of the model's speech.
    pub model_text: String,
    /// Set once the model has finished its response.
    pub complete: bool,
}

/// Ordered, append/update-only transcript of one session.
///
/// Turn ids come from a monotonic counter so ordering stays strict even
/// when turns complete within one clock tick.
#[derive(Debug, Default)]
pub struct Transcript {
    turns: Vec<ConversationTurn>,
    next_id: u64,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a fresh turn and return its id.
    pub fn begin_turn(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.turns.push(ConversationTurn {
            id,
            started_at: Utc::now(),
            user_text: String::new(),
            model_text: String::new(),
            complete: false,
        });
        id
    }

    /// Append a fragment of the user's speech to the current turn.
    pub fn append_user(&mut self, text: &str) {
        self.current_mut().user_text.push_str(text);
    }

    /// Append a fragment of the model's speech to the current turn.
    pub fn append_model(&mut self, text: &str) {
        self.current_mut().model_text.push_str(text);
    }

    /// Mark the current turn complete and open the next one.
    ///
    /// Returns the new turn's id.
    pub fn complete_turn(&mut self) -> u64 {
        self.current_mut().complete = true;
        self.begin_turn()
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn current(&self) -> Option<&ConversationTurn> {
        self.turns.last()
    }

    pub fn snapshot(&self) -> Vec<ConversationTurn> {
        self.turns.clone()
    }

    fn current_mut(&mut self) -> &mut ConversationTurn {
        // Fragments can only arrive on an open turn; recover if one is
        // missing (e.g. a fragment racing session start).
        if self.turns.last().map(|t| t.complete).unwrap_or(true) {
            self.begin_turn();
        }
        self.turns.last_mut().expect("turn exists")
    }
}
