//! Player command parsing and routing into [`WorldEngine`].

use log::debug;

use crate::errors::WorldError;
use crate::game::engine::WorldEngine;
use crate::game::events::Reply;
use crate::world::types::Direction;

/// Parsed player input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerCommand {
    // Navigation
    Move(Direction),         // N, S, E, W, GO <dir>
    Look,                    // L, LOOK
    Map,                     // MAP, M

    // Gold and inventory
    Collect,                 // COLLECT, GATHER
    Drop,                    // DROP
    Inventory,               // I, INV

    // Social
    Say(String),             // SAY text, 'text
    Emote(String),           // EMOTE text, :text
    Social(String),          // WAVE, BOW, any other single word

    // Objects and items
    Interact { verb: String, target: String }, // OPEN chest, TAKE key

    Characters,              // WHO, CHARACTERS
    Help,                    // HELP, ?
    Empty,
}

impl PlayerCommand {
    /// Keywords are case-insensitive; chat text keeps its case.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if let Some(rest) = input.strip_prefix('\'') {
            return PlayerCommand::Say(rest.trim().to_string());
        }
        if let Some(rest) = input.strip_prefix(':') {
            return PlayerCommand::Emote(rest.trim().to_string());
        }

        let (head, rest) = match input.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (input, ""),
        };
        let head = head.to_lowercase();

        match head.as_str() {
            "" => PlayerCommand::Empty,
            "go" | "walk" => match Direction::parse(rest) {
                Some(direction) => PlayerCommand::Move(direction),
                None => PlayerCommand::Interact {
                    verb: head,
                    target: rest.to_string(),
                },
            },
            "l" | "look" if rest.is_empty() => PlayerCommand::Look,
            "m" | "map" => PlayerCommand::Map,
            "i" | "inv" | "inventory" => PlayerCommand::Inventory,
            "collect" | "gather" => PlayerCommand::Collect,
            "drop" if rest.is_empty() || rest == "gold" || rest == "coins" => PlayerCommand::Drop,
            "say" => PlayerCommand::Say(rest.to_string()),
            "emote" | "me" => PlayerCommand::Emote(rest.to_string()),
            "who" | "characters" => PlayerCommand::Characters,
            "help" | "h" | "?" => PlayerCommand::Help,
            _ => {
                if rest.is_empty() {
                    if let Some(direction) = Direction::parse(&head) {
                        return PlayerCommand::Move(direction);
                    }
                    PlayerCommand::Social(head)
                } else {
                    PlayerCommand::Interact {
                        verb: head,
                        target: rest.to_string(),
                    }
                }
            }
        }
    }
}

impl WorldEngine {
    /// Run one command for `session_id`, counting successes and failures.
    pub fn execute(&mut self, session_id: &str, command: PlayerCommand) -> Result<Reply, WorldError> {
        let metrics = self.metrics();
        metrics.inc_command();
        let result = match command {
            PlayerCommand::Move(direction) => self.move_player(session_id, direction),
            PlayerCommand::Look => self.look(session_id),
            PlayerCommand::Map => self.minimap(session_id),
            PlayerCommand::Collect => self.collect_coins(session_id),
            PlayerCommand::Drop => self.drop_coins(session_id),
            PlayerCommand::Inventory => self.inventory(session_id),
            PlayerCommand::Say(text) => self.say(session_id, &text),
            PlayerCommand::Emote(text) => self.perform_action(session_id, &text),
            PlayerCommand::Social(verb) => self.social(session_id, &verb),
            PlayerCommand::Interact { verb, target } => self.interact(session_id, &verb, &target),
            PlayerCommand::Characters => self.characters(session_id),
            PlayerCommand::Help => self.help(session_id),
            PlayerCommand::Empty => self.look(session_id),
        };
        if let Err(e) = &result {
            metrics.inc_command_failure();
            debug!("command from {} failed: {}", session_id, e);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_movement_forms() {
        assert_eq!(PlayerCommand::parse("n"), PlayerCommand::Move(Direction::North));
        assert_eq!(PlayerCommand::parse("  WEST "), PlayerCommand::Move(Direction::West));
        assert_eq!(PlayerCommand::parse("go e"), PlayerCommand::Move(Direction::East));
        assert_eq!(PlayerCommand::parse("L"), PlayerCommand::Look);
        assert_eq!(PlayerCommand::parse(""), PlayerCommand::Empty);
    }

    #[test]
    fn chat_keeps_case() {
        assert_eq!(
            PlayerCommand::parse("say Hello There"),
            PlayerCommand::Say("Hello There".into())
        );
        assert_eq!(PlayerCommand::parse("'Hi"), PlayerCommand::Say("Hi".into()));
        assert_eq!(
            PlayerCommand::parse(":Sits down"),
            PlayerCommand::Emote("Sits down".into())
        );
    }

    #[test]
    fn other_words_are_socials_or_interactions() {
        assert_eq!(PlayerCommand::parse("xyzzy"), PlayerCommand::Social("xyzzy".into()));
        assert_eq!(PlayerCommand::parse("wave"), PlayerCommand::Social("wave".into()));
        assert_eq!(
            PlayerCommand::parse("Open Chest"),
            PlayerCommand::Interact {
                verb: "open".into(),
                target: "Chest".into()
            }
        );
        assert_eq!(PlayerCommand::parse("drop"), PlayerCommand::Drop);
        assert_eq!(
            PlayerCommand::parse("drop lantern"),
            PlayerCommand::Interact {
                verb: "drop".into(),
                target: "lantern".into()
            }
        );
    }
}
