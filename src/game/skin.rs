//! Skin catalogue
//!
//! Ownership and coin balances belong to the shop; the simulation only reads
//! the stat multipliers of whatever skin a combatant joined with.

use serde::{Deserialize, Serialize};

/// Skins available in the shop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Skin {
    /// Balanced default
    #[default]
    Warrior,
    /// Hits hard, moves slowly
    Brute,
    /// Fast and fragile
    Ninja,
    /// Very slow, very sturdy
    Tank,
    /// Quick with a slight damage edge
    Phantom,
}

/// Stat multipliers granted by a skin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkinStats {
    /// Scales outgoing damage and bot attack probability
    pub strength: f32,
    /// Carried for display only
    pub endurance: f32,
    /// Scales movement speed
    pub speed: f32,
}

impl Skin {
    pub const ALL: [Skin; 5] = [
        Skin::Warrior,
        Skin::Brute,
        Skin::Ninja,
        Skin::Tank,
        Skin::Phantom,
    ];

    pub fn stats(self) -> SkinStats {
        match self {
            Skin::Warrior => SkinStats {
                strength: 1.0,
                endurance: 1.0,
                speed: 1.0,
            },
            Skin::Brute => SkinStats {
                strength: 1.3,
                endurance: 1.5,
                speed: 0.8,
            },
            Skin::Ninja => SkinStats {
                strength: 0.9,
                endurance: 0.8,
                speed: 1.4,
            },
            Skin::Tank => SkinStats {
                strength: 0.8,
                endurance: 2.0,
                speed: 0.6,
            },
            Skin::Phantom => SkinStats {
                strength: 1.1,
                endurance: 0.7,
                speed: 1.3,
            },
        }
    }

    /// Shop price in coins
    pub fn cost(self) -> u32 {
        match self {
            Skin::Warrior => 0,
            Skin::Brute | Skin::Ninja | Skin::Tank => 500,
            Skin::Phantom => 750,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Skin::Warrior => "warrior",
            Skin::Brute => "brute",
            Skin::Ninja => "ninja",
            Skin::Tank => "tank",
            Skin::Phantom => "phantom",
        }
    }

    /// Look up a skin by its shop key, falling back to the default skin
    pub fn from_key(key: &str) -> Self {
        let key = key.trim();
        Self::ALL
            .into_iter()
            .find(|skin| skin.as_str().eq_ignore_ascii_case(key))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(Skin::from_key("Ninja"), Skin::Ninja);
        assert_eq!(Skin::from_key(" tank "), Skin::Tank);
    }

    #[test]
    fn unknown_key_falls_back_to_warrior() {
        assert_eq!(Skin::from_key("dragon"), Skin::Warrior);
        assert_eq!(Skin::from_key(""), Skin::Warrior);
    }

    #[test]
    fn default_skin_is_free_and_neutral() {
        let stats = Skin::default().stats();
        assert_eq!(Skin::default().cost(), 0);
        assert_eq!(stats.strength, 1.0);
        assert_eq!(stats.speed, 1.0);
    }
}
