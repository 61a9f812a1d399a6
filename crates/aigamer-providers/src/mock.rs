//! Mock clients for testing without a model server.

use crate::traits::{DecisionClient, VisionTranscriber, ERROR_SENTINEL};
use aigamer_vision::Screenshot;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Decision client that replays a fixed list of replies.
///
/// Once the script runs out every call returns `"ERROR"`. Clones share the
/// script and the record of game states it was shown.
#[derive(Clone, Default)]
pub struct ScriptedDecisions {
    replies: Arc<Mutex<VecDeque<String>>>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl ScriptedDecisions {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Arc::new(Mutex::new(replies.into_iter().map(Into::into).collect())),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Game states passed to `decide`, in order.
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().map(|s| s.len()).unwrap_or_default()
    }
}

#[async_trait]
impl DecisionClient for ScriptedDecisions {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "mock"
    }

    async fn decide(&mut self, game_state: &str) -> String {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(game_state.to_string());
        }
        self.replies
            .lock()
            .ok()
            .and_then(|mut replies| replies.pop_front())
            .unwrap_or_else(|| ERROR_SENTINEL.to_string())
    }
}

/// Transcriber that returns the same text for every frame.
#[derive(Clone)]
pub struct FixedTranscriber {
    text: String,
    calls: Arc<Mutex<usize>>,
}

impl FixedTranscriber {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().map(|c| *c).unwrap_or_default()
    }
}

#[async_trait]
impl VisionTranscriber for FixedTranscriber {
    fn model(&self) -> &str {
        "mock"
    }

    async fn transcribe(&self, _screenshot: &Screenshot, _prompt: Option<&str>) -> String {
        if let Ok(mut calls) = self.calls.lock() {
            *calls += 1;
        }
        self.text.clone()
    }
}
