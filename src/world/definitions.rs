//! Data-file backed definitions: the character roster, the verb alias table
//! and the serialized world map.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::errors::WorldError;
use crate::world::content;
use crate::world::types::WorldDefinition;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CharacterDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Characters players may pick from. Ids are unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterRoster {
    characters: Vec<CharacterDefinition>,
}

impl Default for CharacterRoster {
    fn default() -> Self {
        Self {
            characters: content::DEFAULT_CHARACTERS
                .iter()
                .map(|(id, name, description)| CharacterDefinition {
                    id: id.to_string(),
                    name: name.to_string(),
                    description: description.to_string(),
                })
                .collect(),
        }
    }
}

impl CharacterRoster {
    pub fn new(characters: Vec<CharacterDefinition>) -> Result<Self, WorldError> {
        if characters.is_empty() {
            return Err(WorldError::definition("characters", "roster is empty"));
        }
        let mut seen = std::collections::HashSet::new();
        for c in &characters {
            if c.id.trim().is_empty() {
                return Err(WorldError::definition("characters", "character with empty id"));
            }
            if !seen.insert(c.id.as_str()) {
                return Err(WorldError::definition(
                    "characters",
                    format!("duplicate character id '{}'", c.id),
                ));
            }
        }
        Ok(Self { characters })
    }

    /// Parse a JSON array of `{id, name, description}` records.
    pub fn from_json(source_name: &str, text: &str) -> Result<Self, WorldError> {
        let characters: Vec<CharacterDefinition> =
            serde_json::from_str(text).map_err(|e| WorldError::definition(source_name, e))?;
        Self::new(characters).map_err(|e| match e {
            WorldError::DefinitionLoad { reason, .. } => {
                WorldError::definition(source_name, reason)
            }
            other => other,
        })
    }

    pub fn load(path: &Path) -> Result<Self, WorldError> {
        let source_name = path.display().to_string();
        let text = std::fs::read_to_string(path)
            .map_err(|e| WorldError::definition(source_name.as_str(), e))?;
        Self::from_json(&source_name, &text)
    }

    pub fn get(&self, id: &str) -> Option<&CharacterDefinition> {
        self.characters.iter().find(|c| c.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CharacterDefinition> {
        self.characters.iter()
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }
}

/// Maps verb synonyms onto the canonical verbs objects declare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerbTable {
    aliases: BTreeMap<String, String>,
}

impl Default for VerbTable {
    fn default() -> Self {
        Self {
            aliases: content::DEFAULT_VERB_ALIASES
                .iter()
                .map(|(alias, verb)| (alias.to_string(), verb.to_string()))
                .collect(),
        }
    }
}

impl VerbTable {
    /// Parse a JSON object of `alias → verb`; entries extend the defaults.
    pub fn from_json(source_name: &str, text: &str) -> Result<Self, WorldError> {
        let extra: BTreeMap<String, String> =
            serde_json::from_str(text).map_err(|e| WorldError::definition(source_name, e))?;
        let mut table = Self::default();
        for (alias, verb) in extra {
            let alias = alias.trim().to_lowercase();
            let verb = verb.trim().to_lowercase();
            if alias.is_empty() || verb.is_empty() {
                return Err(WorldError::definition(source_name, "empty verb alias"));
            }
            table.aliases.insert(alias, verb);
        }
        Ok(table)
    }

    pub fn load(path: &Path) -> Result<Self, WorldError> {
        let source_name = path.display().to_string();
        let text = std::fs::read_to_string(path)
            .map_err(|e| WorldError::definition(source_name.as_str(), e))?;
        Self::from_json(&source_name, &text)
    }

    /// Lowercased canonical form of `verb`.
    pub fn canonical(&self, verb: &str) -> String {
        let verb = verb.trim().to_lowercase();
        self.aliases.get(&verb).cloned().unwrap_or(verb)
    }

    pub fn is_take(&self, verb: &str) -> bool {
        let canonical = self.canonical(verb);
        content::TAKE_VERBS.contains(&canonical.as_str())
    }
}

/// Parse and structurally validate a serialized world.
pub fn parse_world(source_name: &str, text: &str) -> Result<WorldDefinition, WorldError> {
    let world: WorldDefinition =
        serde_json::from_str(text).map_err(|e| WorldError::definition(source_name, e))?;
    world.validate().map_err(|e| match e {
        WorldError::DefinitionLoad { reason, .. } => WorldError::definition(source_name, reason),
        other => other,
    })?;
    Ok(world)
}
