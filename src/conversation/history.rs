// Bounded conversation history

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// One message exchanged in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// Chronological turns, capped at `2 * pair_limit` entries.
///
/// Oldest turns are dropped first once the cap is exceeded.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    turns: VecDeque<Turn>,
    pair_limit: usize,
}

impl ConversationHistory {
    pub fn new(pair_limit: usize) -> Self {
        Self {
            turns: VecDeque::with_capacity(pair_limit.saturating_mul(2)),
            pair_limit,
        }
    }

    /// Maximum number of turns retained
    pub fn capacity(&self) -> usize {
        self.pair_limit.saturating_mul(2)
    }

    /// Append a turn, then evict from the front down to the cap
    pub fn push(&mut self, turn: Turn) {
        self.turns.push_back(turn);
        self.trim();
    }

    fn trim(&mut self) {
        let cap = self.capacity();
        while self.turns.len() > cap {
            self.turns.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    /// Owned copy, oldest first
    pub fn to_vec(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_keeps_order() {
        let mut history = ConversationHistory::new(5);
        history.push(Turn::user("hi"));
        history.push(Turn::model("hello"));

        let turns = history.to_vec();
        assert_eq!(turns, vec![Turn::user("hi"), Turn::model("hello")]);
    }

    #[test]
    fn test_evicts_oldest_pairs_first() {
        let mut history = ConversationHistory::new(2);
        for i in 0..5 {
            history.push(Turn::user(format!("q{i}")));
            history.push(Turn::model(format!("a{i}")));
        }

        assert_eq!(history.len(), 4);
        let texts: Vec<&str> = history.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["q3", "a3", "q4", "a4"]);
    }

    #[test]
    fn test_zero_limit_keeps_nothing() {
        let mut history = ConversationHistory::new(0);
        history.push(Turn::user("hi"));
        assert!(history.is_empty());
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Turn::model("ok")).unwrap();
        assert_eq!(json, r#"{"role":"model","text":"ok"}"#);
    }
}
