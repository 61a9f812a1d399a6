//! Fixed prompt text.

const GAME_RULES: &str = "You are playing the text-based game Warsim: The Realm of Aslona. \
Analyze the game text and respond with a single game decision to take. \
Your response should be only the number or thing requested. \
Valid actions include entering a number choice, typing 'y' or 'n' for yes/no questions, \
or entering text for name fields. \
Focus on exploration and making interesting choices in the game. \
DO NOT explain your reasoning or provide additional text. ONLY respond with a valid action. ";

const ANTHROPIC_OCR_NOTE: &str = "BEWARE: Due to a bug in OCR, menus will often confuse 8 and 0. \
0 is usually for Exiting, Going back, or Accepting. It's never an 'option'. \
If you find yourself unable to proceed when pressing 8, try 0.";

const OLLAMA_OCR_NOTE: &str = "IMPORTANT: Due to a bug in OCR, menus will often show 8 instead of 0 \
for the last item. 0 is usually for Exiting, Going back, accepting or taking action. \
It's never an 'option'. If you find yourself stuck, try 0.";

/// Transcription prompt used when the caller supplies none.
pub const DEFAULT_VISION_PROMPT: &str = "This is a screen from a text-based game. \
Read all text visible in this image and return it accurately. \
Pay special attention to menu options, numbers, and game text. \
Format your response to preserve the layout of text as it appears in the game.";

/// Prompt the game loop sends with every captured frame.
pub const SCREEN_READ_PROMPT: &str =
    "This is a text-based game screen. Read all visible text and return it exactly as shown.";

pub fn anthropic_system_prompt() -> String {
    format!("{}{}", GAME_RULES, ANTHROPIC_OCR_NOTE)
}

pub fn ollama_system_prompt() -> String {
    format!("{}{}", GAME_RULES, OLLAMA_OCR_NOTE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompts_share_rules() {
        for prompt in [anthropic_system_prompt(), ollama_system_prompt()] {
            assert!(prompt.starts_with("You are playing the text-based game Warsim"));
            assert!(prompt.contains("ONLY respond with a valid action. "));
            assert!(prompt.contains("try 0."));
        }
        assert!(anthropic_system_prompt().contains("confuse 8 and 0"));
        assert!(ollama_system_prompt().contains("show 8 instead of 0"));
    }
}
