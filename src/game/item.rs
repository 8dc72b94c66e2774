//! Collectible items: regular reward tokens and the time-limited special item

use std::fmt;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::location::Location;

/// Reward token carried by a regular item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Token {
    Yaki,
    Chog,
    Dak,
}

impl Token {
    /// Every token a regular item can carry
    pub const ALL: [Token; 3] = [Token::Yaki, Token::Chog, Token::Dak];

    pub fn label(&self) -> &'static str {
        match self {
            Token::Yaki => "YAKI",
            Token::Chog => "CHOG",
            Token::Dak => "DAK",
        }
    }

    /// Amount credited to the ledger per collection
    pub fn increment(&self) -> Decimal {
        match self {
            Token::Yaki | Token::Chog => Decimal::ONE,
            Token::Dak => dec!(0.01),
        }
    }
}

/// What kind of item was collected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemKind {
    Regular(Token),
    /// The time-limited MON item
    Special,
}

impl ItemKind {
    /// Every kind, in ledger order
    pub const ALL: [ItemKind; 4] = [
        ItemKind::Regular(Token::Yaki),
        ItemKind::Regular(Token::Chog),
        ItemKind::Regular(Token::Dak),
        ItemKind::Special,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ItemKind::Regular(token) => token.label(),
            ItemKind::Special => "MON",
        }
    }

    pub fn increment(&self) -> Decimal {
        match self {
            ItemKind::Regular(token) => token.increment(),
            ItemKind::Special => dec!(0.01),
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.label().eq_ignore_ascii_case(label))
    }

    /// Floating text shown when the item is collected, e.g. `+1 $YAKI`
    pub fn float_text(&self) -> String {
        format!("+{} ${}", self.increment().normalize(), self.label())
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// Kinds travel as their label so ledger maps serialize as `{"YAKI": "2"}`
impl Serialize for ItemKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for ItemKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        ItemKind::from_label(&label)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown item kind: {label}")))
    }
}

/// The always-present collectible
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegularItem {
    pub location: Location,
    pub token: Token,
}

impl RegularItem {
    pub fn kind(&self) -> ItemKind {
        ItemKind::Regular(self.token)
    }
}

/// The time-limited collectible
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialItem {
    pub location: Location,
}
