use thiserror::Error;

use crate::world::types::Direction;

/// Errors surfaced by world generation, the engine, and persistence.
///
/// Validation and locked-path variants are ordinary player-facing outcomes;
/// only definition/state load failures are fatal, and only at startup.
#[derive(Debug, Error)]
pub enum WorldError {
    /// No character with this id exists in the roster.
    #[error("there is no character called '{0}'")]
    UnknownCharacter(String),

    /// The character is bound to another live session.
    #[error("{0} is already being played by someone else")]
    CharacterTaken(String),

    /// The session id is already bound to a character.
    #[error("session {0} already has a character")]
    SessionInUse(String),

    /// No live session exists with this id.
    #[error("unknown session: {0}")]
    UnknownSession(String),

    /// The current room has no exit in that direction.
    #[error("you can't go {0} from here")]
    NoExit(Direction),

    /// Nothing in the room answers to the given name.
    #[error("you don't see any '{0}' here")]
    ObjectNotFound(String),

    /// The object exists but the verb is not allowed in its current state.
    #[error("you can't {verb} the {object} while it is {state}")]
    VerbNotApplicable {
        verb: String,
        object: String,
        state: String,
    },

    /// The room holds no coins.
    #[error("there are no coins here")]
    NothingToCollect,

    /// The player's purse is empty.
    #[error("you have no gold to drop")]
    NothingToDrop,

    /// Chat/emote text was empty or unusable.
    #[error("invalid text: {0}")]
    InvalidText(String),

    /// Username failed validation.
    #[error("invalid username: {0}")]
    InvalidUsername(#[from] crate::validation::UsernameError),

    /// The exit is locked and the player lacks the matching key.
    #[error("the way {direction} is locked; you need the {key_name}")]
    LockedPath {
        direction: Direction,
        key_id: String,
        key_name: String,
    },

    /// A world, character, or verb source is unreadable or malformed.
    #[error("failed to load {source_name}: {reason}")]
    DefinitionLoad { source_name: String, reason: String },

    /// The saved game state could not be read back.
    #[error("failed to load game state from {path}: {reason}")]
    StateLoad { path: String, reason: String },

    /// Writing a snapshot failed; the next scheduled save will try again.
    #[error("failed to write snapshot {path}: {reason}")]
    PersistenceWrite { path: String, reason: String },

    /// The dispatcher has shut down and can no longer accept requests.
    #[error("world dispatcher is not running")]
    DispatcherClosed,

    /// Wrapper around IO errors (directory creation, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapper around JSON (de)serialization errors.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorldError {
    /// True for structured failures caused by the player's request.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            WorldError::UnknownCharacter(_)
                | WorldError::CharacterTaken(_)
                | WorldError::SessionInUse(_)
                | WorldError::UnknownSession(_)
                | WorldError::NoExit(_)
                | WorldError::ObjectNotFound(_)
                | WorldError::VerbNotApplicable { .. }
                | WorldError::NothingToCollect
                | WorldError::NothingToDrop
                | WorldError::InvalidText(_)
                | WorldError::InvalidUsername(_)
        )
    }

    /// True when startup must abort.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            WorldError::DefinitionLoad { .. } | WorldError::StateLoad { .. }
        )
    }

    pub(crate) fn definition(source_name: impl Into<String>, reason: impl ToString) -> Self {
        WorldError::DefinitionLoad {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }
}
