//! Input checks for player-supplied names and chat text.

use std::collections::HashSet;

/// Longest say/emote line accepted from a player, in characters.
pub const MAX_CHAT_CHARS: usize = 200;

/// Username validation errors with helpful messages
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UsernameError {
    #[error("username is too short (minimum {min} characters)")]
    TooShort { min: usize },

    #[error("username is too long (maximum {max} characters)")]
    TooLong { max: usize },

    #[error("username cannot start or end with whitespace")]
    InvalidWhitespace,

    #[error("username contains invalid characters: {chars}")]
    InvalidCharacters { chars: String },

    #[error("username is a reserved name")]
    Reserved,
}

/// Chat text rejections.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TextError {
    #[error("say something first")]
    Empty,

    #[error("that is too long (maximum {max} characters)")]
    TooLong { max: usize },
}

/// Username validation rules configuration
#[derive(Debug, Clone)]
pub struct UsernameRules {
    pub min_length: usize,
    pub max_length: usize,
    pub allow_spaces: bool,
    pub allow_unicode: bool,
}

impl Default for UsernameRules {
    fn default() -> Self {
        UsernameRules {
            min_length: 2,
            max_length: 24,
            allow_spaces: false,
            allow_unicode: true,
        }
    }
}

fn reserved_names() -> HashSet<&'static str> {
    [
        "admin", "administrator", "root", "system", "server", "world", "ghost", "nobody",
        "someone", "everyone", "you",
    ]
    .iter()
    .copied()
    .collect()
}

/// Validate a username according to the given rules, returning the accepted name.
pub fn validate_username(username: &str, rules: &UsernameRules) -> Result<String, UsernameError> {
    let trimmed = username.trim();
    if trimmed != username {
        return Err(UsernameError::InvalidWhitespace);
    }

    let len = trimmed.chars().count();
    if len < rules.min_length {
        return Err(UsernameError::TooShort {
            min: rules.min_length,
        });
    }
    if len > rules.max_length {
        return Err(UsernameError::TooLong {
            max: rules.max_length,
        });
    }

    if reserved_names().contains(trimmed.to_lowercase().as_str()) {
        return Err(UsernameError::Reserved);
    }

    let invalid: HashSet<char> = trimmed
        .chars()
        .filter(|&ch| {
            let ok = ch.is_ascii_alphanumeric()
                || ch == '_'
                || ch == '-'
                || (ch == ' ' && rules.allow_spaces)
                || (!ch.is_ascii() && ch.is_alphanumeric() && rules.allow_unicode);
            !ok
        })
        .collect();
    if !invalid.is_empty() {
        let mut chars: Vec<char> = invalid.into_iter().collect();
        chars.sort_unstable();
        return Err(UsernameError::InvalidCharacters {
            chars: chars
                .into_iter()
                .map(|c| {
                    if c.is_control() {
                        format!("\\u{{{:04x}}}", c as u32)
                    } else {
                        c.to_string()
                    }
                })
                .collect(),
        });
    }

    Ok(trimmed.to_string())
}

/// Validate a username with the default rules.
pub fn validate_player_name(name: &str) -> Result<String, UsernameError> {
    validate_username(name, &UsernameRules::default())
}

/// Strip control characters, collapse surrounding whitespace and enforce a length cap.
pub fn sanitize_chat(text: &str, max_chars: usize) -> Result<String, TextError> {
    let cleaned: String = text.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return Err(TextError::Empty);
    }
    if cleaned.chars().count() > max_chars {
        return Err(TextError::TooLong { max: max_chars });
    }
    Ok(cleaned.to_string())
}
