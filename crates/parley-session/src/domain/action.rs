//! Parsing participant input into actions and commands.

/// What a line of participant input asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipantAction {
    /// An in-world action for the character to respond to.
    Act(String),
    /// `/guess <text>`: a hypothesis about the character's goals.
    Hypothesis(String),
    /// `/feedback <text>`: a note for the researchers.
    Feedback(String),
    /// `/quit`, `/stop`, `/exit` or `/end`.
    EndSession,
}

impl ParticipantAction {
    /// Parses one line of input. Commands may start with `/` or `\`; an
    /// unrecognized command is treated as an in-world action.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        let Some(body) = trimmed
            .strip_prefix('/')
            .or_else(|| trimmed.strip_prefix('\\'))
        else {
            return Self::Act(trimmed.to_owned());
        };

        let (word, rest) = body
            .split_once(char::is_whitespace)
            .unwrap_or((body, ""));
        match word.to_ascii_lowercase().as_str() {
            "quit" | "stop" | "exit" | "end" => Self::EndSession,
            "guess" => Self::Hypothesis(rest.trim().to_owned()),
            "feedback" => Self::Feedback(rest.trim().to_owned()),
            other => {
                tracing::warn!(command = other, "unknown participant command, treating as action");
                Self::Act(trimmed.to_owned())
            }
        }
    }
}
