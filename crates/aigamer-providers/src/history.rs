//! # Conversation History
//!
//! Bounded chat history owned by one decision client.
//!
//! The ceiling counts user and assistant turns; a pinned system entry sits
//! at index 0 on top of that and is never evicted. When the ceiling is
//! exceeded the history either drops the oldest exchange or folds older
//! exchanges into a synthetic context summary, depending on the policy.

use crate::message::{Message, MessageRole};
use tracing::debug;

const STATE_MARKER: &str = "Current game state:";
const QUESTION_MARKER: &str = "What action should I take next?";
const SUMMARY_HEADER: &str = "PREVIOUS GAME CONTEXT:";
const SUMMARY_FOOTER: &str = "Some older history has been removed to save space. \
Continue making decisions based on the current game state.";
const SUMMARY_ACK: &str = "Understood. I'll continue playing based on the current game state.";

/// Most recent evicted exchanges quoted in a summary.
const SUMMARY_EXCHANGES: usize = 3;

/// The user turn sent for a transcribed screen.
pub fn game_state_turn(state: &str) -> String {
    format!("{}\n{}\n\n{}", STATE_MARKER, state, QUESTION_MARKER)
}

/// Short form of a game-state turn for context summaries.
///
/// Takes the text between the state and question markers. More than two
/// non-empty lines are cut to the first two, joined with `" | "`.
pub fn state_snippet(turn: &str) -> String {
    let Some(start) = turn.find(STATE_MARKER) else {
        return turn.to_string();
    };
    let body = &turn[start + STATE_MARKER.len()..];
    let body = match body.find(QUESTION_MARKER) {
        Some(end) => &body[..end],
        None => body,
    }
    .trim();

    let lines: Vec<&str> = body
        .split(['\n', '\r'])
        .filter(|line| !line.is_empty())
        .collect();
    if lines.len() > 2 {
        let head: Vec<&str> = lines.iter().take(2).map(|line| line.trim()).collect();
        format!("{}...", head.join(" | "))
    } else {
        body.to_string()
    }
}

/// What to do when the history grows past its ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Remove the oldest user/assistant exchange.
    DropOldest,
    /// Replace older exchanges with a context summary plus acknowledgement.
    Summarize,
}

#[derive(Debug, Clone)]
pub struct ConversationHistory {
    messages: Vec<Message>,
    max_messages: usize,
    policy: EvictionPolicy,
    pinned_system: bool,
}

impl ConversationHistory {
    /// History without an inline system entry.
    pub fn new(max_messages: usize, policy: EvictionPolicy) -> Self {
        Self {
            messages: Vec::new(),
            max_messages: Self::effective_ceiling(max_messages, policy),
            policy,
            pinned_system: false,
        }
    }

    /// History whose first entry is a pinned system prompt.
    pub fn with_system(
        system: impl Into<String>,
        max_messages: usize,
        policy: EvictionPolicy,
    ) -> Self {
        Self {
            messages: vec![Message::system(system)],
            max_messages: Self::effective_ceiling(max_messages, policy),
            policy,
            pinned_system: true,
        }
    }

    // A summary takes two turns itself, so it needs room for at least one
    // more exchange.
    fn effective_ceiling(max_messages: usize, policy: EvictionPolicy) -> usize {
        match policy {
            EvictionPolicy::DropOldest => max_messages.max(2),
            EvictionPolicy::Summarize => max_messages.max(4),
        }
    }

    /// Every entry, including a pinned system prompt.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// User and assistant turns only.
    pub fn turns(&self) -> &[Message] {
        &self.messages[self.first_turn()..]
    }

    pub fn turn_count(&self) -> usize {
        self.messages.len() - self.first_turn()
    }

    pub fn system(&self) -> Option<&str> {
        if self.pinned_system {
            self.messages.first().map(|m| m.content.as_str())
        } else {
            None
        }
    }

    pub fn max_messages(&self) -> usize {
        self.max_messages
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
        self.enforce_limit();
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
        self.enforce_limit();
    }

    /// Remove a trailing user turn that never got an answer.
    pub fn rollback_user(&mut self) -> Option<Message> {
        let last_is_user = self.turns().last().map(|m| m.role) == Some(MessageRole::User);
        if last_is_user {
            self.messages.pop()
        } else {
            None
        }
    }

    /// Drop all turns, keeping a pinned system prompt.
    pub fn clear(&mut self) {
        let first = self.first_turn();
        self.messages.truncate(first);
    }

    fn first_turn(&self) -> usize {
        usize::from(self.pinned_system)
    }

    fn enforce_limit(&mut self) {
        if self.turn_count() <= self.max_messages {
            return;
        }
        match self.policy {
            EvictionPolicy::DropOldest => self.drop_oldest(),
            EvictionPolicy::Summarize => self.summarize(),
        }
    }

    fn drop_oldest(&mut self) {
        let start = self.first_turn();
        while self.turn_count() > self.max_messages {
            self.messages.remove(start);
            // Keep the history opening on a user turn.
            if self.messages.get(start).map(|m| m.role) == Some(MessageRole::Assistant) {
                self.messages.remove(start);
            }
        }
        debug!("History trimmed to {} turns", self.turn_count());
    }

    fn summarize(&mut self) {
        let start = self.first_turn();
        let len = self.messages.len();
        let keep = self.max_messages / 2;

        let mut tail_start = len - keep;
        while tail_start < len && self.messages[tail_start].role != MessageRole::User {
            tail_start += 1;
        }

        let tail = self.messages.split_off(tail_start);
        let evicted: Vec<Message> = self.messages.drain(start..).collect();

        self.messages.push(Message::user(summarize_exchanges(&evicted)));
        self.messages.push(Message::assistant(SUMMARY_ACK));
        self.messages.extend(tail);

        debug!(
            "Summarized {} turns, {} turns remain",
            evicted.len(),
            self.turn_count()
        );
    }
}

fn summarize_exchanges(evicted: &[Message]) -> String {
    let exchanges: Vec<(&Message, &Message)> = evicted
        .windows(2)
        .filter(|pair| {
            pair[0].role == MessageRole::User
                && pair[1].role == MessageRole::Assistant
                && !pair[0].content.starts_with(SUMMARY_HEADER)
        })
        .map(|pair| (&pair[0], &pair[1]))
        .collect();
    let recent = &exchanges[exchanges.len().saturating_sub(SUMMARY_EXCHANGES)..];

    let mut summary = format!("{}\n", SUMMARY_HEADER);
    for (state, action) in recent {
        summary.push_str(&format!("Game showed: {}\n", state_snippet(&state.content)));
        summary.push_str(&format!("You chose: {}\n\n", action.content));
    }
    summary.push_str(SUMMARY_FOOTER);
    summary.push('\n');
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play(history: &mut ConversationHistory, rounds: usize) {
        for i in 0..rounds {
            history.push_user(game_state_turn(&format!("screen {}\nline b\nline c", i)));
            history.push_assistant(format!("{}", i % 10));
        }
    }

    #[test]
    fn test_game_state_turn_format() {
        assert_eq!(
            game_state_turn("1) Explore"),
            "Current game state:\n1) Explore\n\nWhat action should I take next?"
        );
    }

    #[test]
    fn test_snippet_keeps_two_lines() {
        let turn = game_state_turn("  Kingdom of Aslona \nGold: 40\nArmy: 12\n");
        assert_eq!(state_snippet(&turn), "Kingdom of Aslona | Gold: 40...");
    }

    #[test]
    fn test_snippet_short_state_is_whole() {
        let turn = game_state_turn("Enter your name");
        assert_eq!(state_snippet(&turn), "Enter your name");
        assert_eq!(state_snippet("no markers here"), "no markers here");
    }

    #[test]
    fn test_drop_oldest_respects_ceiling() {
        let mut history = ConversationHistory::new(20, EvictionPolicy::DropOldest);
        for round in 0..60 {
            history.push_user(game_state_turn(&format!("screen {}", round)));
            assert!(history.turn_count() <= 20);
            history.push_assistant("1");
            assert!(history.turn_count() <= 20);
        }
        assert_eq!(history.turns()[0].role, MessageRole::User);
        assert!(history.turns()[0].content.contains("screen 50"));
        assert!(history.system().is_none());
    }

    #[test]
    fn test_summarize_keeps_system_and_ceiling() {
        let mut history =
            ConversationHistory::with_system("rules", 20, EvictionPolicy::Summarize);
        for round in 0..80 {
            history.push_user(game_state_turn(&format!("screen {}", round)));
            history.push_assistant("2");
            assert!(history.turn_count() <= 20);
            assert_eq!(history.messages()[0], Message::system("rules"));
        }
    }

    #[test]
    fn test_summarize_inserts_context_turns() {
        let mut history =
            ConversationHistory::with_system("rules", 20, EvictionPolicy::Summarize);
        play(&mut history, 10);
        assert_eq!(history.turn_count(), 20);

        history.push_user(game_state_turn("screen 10"));

        let turns = history.turns();
        assert!(turns[0].content.starts_with("PREVIOUS GAME CONTEXT:\n"));
        assert_eq!(turns[0].role, MessageRole::User);
        assert_eq!(turns[1], Message::assistant(SUMMARY_ACK));
        assert_eq!(turns[2].role, MessageRole::User);
        assert!(turns.last().unwrap().content.contains("screen 10"));
        assert_eq!(history.turn_count(), 11);

        // The three most recent evicted exchanges are quoted.
        let summary = &turns[0].content;
        assert_eq!(summary.matches("Game showed: ").count(), 3);
        assert!(summary.contains("Game showed: screen 3 | line b...\nYou chose: 3\n"));
        assert!(summary.contains("Game showed: screen 5 | line b...\nYou chose: 5\n"));
        assert!(!summary.contains("screen 2 |"));
        assert!(summary.ends_with(&format!("{}\n", SUMMARY_FOOTER)));
    }

    #[test]
    fn test_summaries_are_not_quoted_in_later_summaries() {
        let mut history =
            ConversationHistory::with_system("rules", 4, EvictionPolicy::Summarize);
        play(&mut history, 12);
        let summary = &history.turns()[0].content;
        assert_eq!(summary.matches(SUMMARY_HEADER).count(), 1);
    }

    #[test]
    fn test_rollback_user() {
        let mut history = ConversationHistory::new(20, EvictionPolicy::DropOldest);
        history.push_user("a");
        history.push_assistant("b");
        assert!(history.rollback_user().is_none());

        history.push_user("c");
        assert_eq!(history.rollback_user(), Some(Message::user("c")));
        assert_eq!(history.turn_count(), 2);
    }

    #[test]
    fn test_rollback_never_touches_system() {
        let mut history = ConversationHistory::with_system("rules", 20, EvictionPolicy::Summarize);
        assert!(history.rollback_user().is_none());
        history.clear();
        assert_eq!(history.system(), Some("rules"));
    }

    #[test]
    fn test_ceiling_floor() {
        assert_eq!(
            ConversationHistory::new(0, EvictionPolicy::Summarize).max_messages(),
            4
        );
        assert_eq!(
            ConversationHistory::new(1, EvictionPolicy::DropOldest).max_messages(),
            2
        );
    }
}
