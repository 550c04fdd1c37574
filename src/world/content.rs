//! Built-in content used by the generators when no data files override it.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::world::types::{Interaction, Item, ItemCategory, RoomObject};

const ROOM_ADJECTIVES: &[&str] = &[
    "Dusty", "Flooded", "Crooked", "Silent", "Ashen", "Mossy", "Frozen", "Sunken", "Gilded",
    "Collapsed", "Echoing", "Narrow", "Vaulted", "Forgotten", "Smoky", "Candlelit",
];

const ROOM_NOUNS: &[&str] = &[
    "Hall", "Gallery", "Chapel", "Cellar", "Library", "Kitchen", "Armory", "Crypt", "Study",
    "Conservatory", "Landing", "Pantry", "Ballroom", "Nursery", "Vestibule", "Observatory",
];

const ROOM_DETAILS: &[&str] = &[
    "Cobwebs sag between the rafters.",
    "Water drips somewhere out of sight.",
    "The floorboards groan under every step.",
    "A cold draft carries the smell of wax.",
    "Faded portraits watch from the walls.",
    "Scratches on the stone count off forgotten days.",
    "Soot streaks climb the walls like dark vines.",
    "Something small skitters away as you look around.",
];

pub const KEY_METALS: &[&str] = &[
    "brass", "iron", "silver", "bone", "copper", "obsidian", "jade", "rusted", "golden", "glass",
];

pub const GHOST_TEMPLATES: &[(&str, &str)] = &[
    ("Weeping Governess", "A translucent woman in a high collar, forever searching for a lost child."),
    ("Headless Footman", "A liveried servant carrying a silver tray and nothing above the shoulders."),
    ("Grey Cartographer", "An old man tracing maps of rooms that no longer exist."),
    ("Drowned Sailor", "A dripping figure trailing seaweed and the smell of brine."),
    ("Laughing Child", "A small shape that giggles just out of sight."),
    ("Pale Duelist", "A gaunt swordsman who bows to everyone he passes."),
];

pub const DEFAULT_CHARACTERS: &[(&str, &str, &str)] = &[
    ("char_1", "Ada the Archivist", "A meticulous scholar with ink-stained fingers."),
    ("char_2", "Bram the Burglar", "Quick hands, quicker feet, and a conscience on holiday."),
    ("char_3", "Cora the Cleric", "A lantern in one hand and a prayer on her lips."),
    ("char_4", "Dorian the Duelist", "Impeccably dressed and impatient with doors."),
    ("char_5", "Edda the Engineer", "Carries a toolbelt heavier than most armor."),
    ("char_6", "Finn the Fool", "Has never once read the warning sign."),
    ("char_7", "Greta the Gravedigger", "Unbothered by ghosts. Mildly bothered by the living."),
    ("char_8", "Hollis the Hunter", "Tracks anything that leaves footprints, and a few that don't."),
];

/// Synonym → canonical verb.
pub const DEFAULT_VERB_ALIASES: &[(&str, &str)] = &[
    ("yank", "pull"),
    ("tug", "pull"),
    ("shove", "push"),
    ("press", "push"),
    ("unlatch", "open"),
    ("shut", "close"),
    ("quaff", "drink"),
    ("sip", "drink"),
    ("examine", "inspect"),
    ("x", "inspect"),
    ("study", "inspect"),
    ("rummage", "search"),
    ("pray", "kneel"),
    ("get", "take"),
    ("grab", "take"),
    ("pick", "take"),
    ("loot", "take"),
];

/// Canonical verbs that pick items up off the floor.
pub const TAKE_VERBS: &[&str] = &["take"];

pub fn room_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    let adjective = ROOM_ADJECTIVES.choose(rng).copied().unwrap_or("Empty");
    let noun = ROOM_NOUNS.choose(rng).copied().unwrap_or("Room");
    format!("{} {}", adjective, noun)
}

pub fn room_description<R: Rng + ?Sized>(rng: &mut R, name: &str) -> String {
    let detail = ROOM_DETAILS.choose(rng).copied().unwrap_or("");
    format!("You stand in the {}. {}", name.to_lowercase(), detail)
}

pub fn item_templates(category: ItemCategory) -> &'static [(&'static str, &'static str)] {
    match category {
        ItemCategory::Weapon => &[
            ("silver dagger", "A slim blade, tarnished but sharp."),
            ("iron poker", "Heavy enough to discourage most visitors."),
            ("ceremonial sword", "More ornament than edge."),
        ],
        ItemCategory::Armor => &[
            ("leather gloves", "Stiff with age and smelling of smoke."),
            ("dented helm", "Someone's head was inside this once."),
        ],
        ItemCategory::Consumable => &[
            ("tallow candle", "Burns for an hour, maybe two."),
            ("stale biscuit", "Edible, in the technical sense."),
            ("vial of salts", "Wakes the dead. Well, the fainting."),
        ],
        ItemCategory::Treasure => &[
            ("jeweled locket", "A portrait inside has been scratched out."),
            ("gold pocket watch", "Stopped at a quarter past midnight."),
            ("pearl earring", "Its twin is nowhere to be found."),
        ],
        ItemCategory::Tool => &[
            ("coil of rope", "Thirty feet, mostly unfrayed."),
            ("tinderbox", "Flint, steel, and a little dry moss."),
        ],
        ItemCategory::Key => &[],
    }
}

/// Object templates; `suffix` keeps granted item ids unique per room.
pub fn object_templates(suffix: &str) -> Vec<RoomObject> {
    vec![
        RoomObject::new("chest", "chest", "closed")
            .with_state(
                "closed",
                "A battered chest sits against the wall, lid shut.",
                vec![(
                    "open",
                    Interaction::say("The lid creaks open. A few coins glint inside.")
                        .then("open")
                        .paying(3),
                )],
            )
            .with_state(
                "open",
                "A battered chest stands open and empty.",
                vec![("close", Interaction::say("You let the lid fall shut.").then("empty"))],
            )
            .with_state("empty", "A battered chest sits against the wall, lid shut.", vec![]),
        RoomObject::new("lever", "lever", "up")
            .with_state(
                "up",
                "An iron lever juts from the wall, pointing up.",
                vec![(
                    "pull",
                    Interaction::say("The lever clanks down. Somewhere, a chain rattles.")
                        .then("down"),
                )],
            )
            .with_state(
                "down",
                "An iron lever juts from the wall, pointing down.",
                vec![("push", Interaction::say("You heave the lever back up.").then("up"))],
            ),
        RoomObject::new("fountain", "fountain", "flowing")
            .with_state(
                "flowing",
                "A cracked fountain trickles with clear water.",
                vec![
                    ("drink", Interaction::say("The water is icy and tastes faintly of iron.")),
                    ("inspect", Interaction::say("Coins rest at the bottom, green with age.")),
                ],
            ),
        RoomObject::new("bookshelf", "bookshelf", "full")
            .with_state(
                "full",
                "A bookshelf sags under rows of mildewed books.",
                vec![(
                    "search",
                    Interaction::say("Behind a row of sermons you find a slim journal.")
                        .then("searched")
                        .granting(Item::new(
                            &format!("journal_{}", suffix),
                            "faded journal",
                            "Most pages are water-stained; the last entry mentions a key.",
                            ItemCategory::Treasure,
                        )),
                )],
            )
            .with_state(
                "searched",
                "A bookshelf with a conspicuous gap on one shelf.",
                vec![("search", Interaction::say("Nothing else of interest, just damp paper."))],
            ),
        RoomObject::new("altar", "altar", "dormant")
            .with_state(
                "dormant",
                "A low stone altar, its candles long cold.",
                vec![(
                    "kneel",
                    Interaction::say("You kneel. The candles flicker to life on their own.")
                        .then("lit"),
                )],
            )
            .with_state(
                "lit",
                "A low stone altar ringed with burning candles.",
                vec![("inspect", Interaction::say("The flames do not move, even when you breathe on them."))],
            ),
        RoomObject::new("cupboard", "cupboard", "closed")
            .with_state(
                "closed",
                "A narrow cupboard with a brass handle.",
                vec![(
                    "open",
                    Interaction::say("Inside, wrapped in cloth, is a candle stub.")
                        .then("open")
                        .granting(Item::new(
                            &format!("candle_{}", suffix),
                            "candle stub",
                            "Barely an inch of wax left.",
                            ItemCategory::Consumable,
                        )),
                )],
            )
            .with_state(
                "open",
                "A narrow cupboard hangs open, bare inside.",
                vec![("close", Interaction::say("The cupboard door clicks shut.").then("closed_empty"))],
            )
            .with_state("closed_empty", "A narrow cupboard with a brass handle.", vec![
                ("open", Interaction::say("The cupboard is empty.").then("open")),
            ]),
    ]
}

/// One-word social actions a player can perform.
pub const SOCIALS: &[&str] = &[
    "bow", "cheer", "clap", "cry", "dance", "frown", "giggle", "grin", "laugh", "nod", "shiver",
    "shrug", "sigh", "smile", "wave", "wink", "yawn",
];

pub fn is_social(verb: &str) -> bool {
    SOCIALS.contains(&verb)
}

/// Present-tense third person form of a social verb ("wave" → "waves").
pub fn third_person(verb: &str) -> String {
    let verb = verb.trim().to_lowercase();
    if verb.ends_with('s')
        || verb.ends_with("sh")
        || verb.ends_with("ch")
        || verb.ends_with('x')
        || verb.ends_with('o')
    {
        format!("{}es", verb)
    } else if verb.ends_with('y')
        && !verb.ends_with("ay")
        && !verb.ends_with("ey")
        && !verb.ends_with("oy")
    {
        format!("{}ies", &verb[..verb.len() - 1])
    } else {
        format!("{}s", verb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn every_object_template_is_consistent() {
        for object in object_templates("r1") {
            assert!(object.states.contains_key(&object.initial_state), "{}", object.id);
            for state in object.states.values() {
                for effect in state.interactions.values() {
                    if let Some(next) = &effect.next_state {
                        assert!(object.states.contains_key(next), "{} -> {}", object.id, next);
                    }
                }
            }
        }
    }

    #[test]
    fn generated_categories_have_templates() {
        for category in ItemCategory::GENERATED {
            assert!(!item_templates(category).is_empty());
        }
    }

    #[test]
    fn names_and_verbs() {
        let mut rng = StdRng::seed_from_u64(1);
        let name = room_name(&mut rng);
        assert_eq!(name.split(' ').count(), 2);
        assert!(room_description(&mut rng, &name).contains(&name.to_lowercase()));
        assert_eq!(third_person("wave"), "waves");
        assert_eq!(third_person("cry"), "cries");
        assert_eq!(third_person("bow"), "bows");
        assert_eq!(third_person("wish"), "wishes");
        for verb in SOCIALS {
            assert!(is_social(verb));
        }
        assert!(!is_social("xyzzy"));
    }
}
