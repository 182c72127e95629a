use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Attribution for one transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Advisor,
}

impl Speaker {
    /// Role label the backend expects
    pub fn wire_role(&self) -> &'static str {
        match self {
            Speaker::User => "user",
            Speaker::Advisor => "model",
        }
    }
}

/// One turn of the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub speaker: Speaker,
    pub text: String,
}

/// Bounded rolling transcript.
///
/// Append-only; once the limit is reached the oldest entry is evicted first.
#[derive(Debug)]
pub struct Transcript {
    entries: VecDeque<TurnRecord>,
    limit: usize,
}

impl Transcript {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(limit),
            limit,
        }
    }

    pub fn push(&mut self, record: TurnRecord) {
        // A zero limit retains nothing.
        if self.limit == 0 {
            return;
        }
        while self.entries.len() >= self.limit {
            self.entries.pop_front();
        }
        self.entries.push_back(record);
    }

    /// Append a completed user/advisor exchange
    pub fn push_exchange(&mut self, user: String, advisor: String) {
        self.push(TurnRecord {
            speaker: Speaker::User,
            text: user,
        });
        self.push(TurnRecord {
            speaker: Speaker::Advisor,
            text: advisor,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the retained entries, oldest first
    pub fn entries(&self) -> Vec<TurnRecord> {
        self.entries.iter().cloned().collect()
    }
}
