//! Game commands: what a parsed action means as keyboard input.

use aigamer_vision::{ArrowDirection, InputDispatcher, InputResult};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameCommandKind {
    /// A menu choice: one character or a number
    Key,
    /// Free text such as a name
    Text,
    /// A cursor key, value is `UP`, `DOWN`, `LEFT` or `RIGHT`
    ArrowKey,
    Unknown,
}

impl fmt::Display for GameCommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Key => "Key",
            Self::Text => "Text",
            Self::ArrowKey => "ArrowKey",
            Self::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameCommand {
    pub kind: GameCommandKind,
    pub value: String,
}

impl GameCommand {
    pub fn new(kind: GameCommandKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    pub fn arrow(&self) -> Option<ArrowDirection> {
        match self.kind {
            GameCommandKind::ArrowKey => ArrowDirection::from_name(&self.value),
            _ => None,
        }
    }
}

impl fmt::Display for GameCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.kind, self.value)
    }
}

/// Classify an action token.
pub fn classify(action: &str) -> GameCommand {
    let trimmed = action.trim();
    let upper = trimmed.to_uppercase();
    let direction = upper.strip_prefix("ARROW ").map(str::trim).unwrap_or(&upper);

    if let Some(arrow) = ArrowDirection::from_name(direction) {
        return GameCommand::new(GameCommandKind::ArrowKey, arrow.as_str());
    }

    if trimmed.is_empty() {
        return GameCommand::new(GameCommandKind::Unknown, "");
    }

    if trimmed.chars().count() == 1 || trimmed.parse::<i64>().is_ok() {
        return GameCommand::new(GameCommandKind::Key, trimmed);
    }

    GameCommand::new(GameCommandKind::Text, trimmed)
}

/// Deliver a command to the game window.
///
/// Keys and text are confirmed with Enter; arrows are sent alone.
pub async fn dispatch(input: &InputDispatcher, command: &GameCommand) -> InputResult<()> {
    match command.kind {
        GameCommandKind::ArrowKey => match command.arrow() {
            Some(direction) => input.send_arrow(direction).await,
            None => Ok(()),
        },
        GameCommandKind::Key | GameCommandKind::Text => {
            input.send_text(&command.value).await?;
            input.send_enter().await
        }
        GameCommandKind::Unknown => {
            if command.value.is_empty() {
                return Ok(());
            }
            input.send_text(&command.value).await?;
            input.send_enter().await
        }
    }
}
