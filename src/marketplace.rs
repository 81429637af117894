use std::fmt;

use serde::{Deserialize, Serialize};

/// A deployment target that content can be exported for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Marketplace {
    /// The classic SOAR server. Definitions are exported as written.
    Xsoar,
    /// The v2 marketplace. `_x2` field aliases replace their base fields on export.
    #[value(name = "marketplacev2")]
    MarketplaceV2,
    Xpanse,
}

impl Marketplace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Marketplace::Xsoar => "xsoar",
            Marketplace::MarketplaceV2 => "marketplacev2",
            Marketplace::Xpanse => "xpanse",
        }
    }

    /// Parse a marketplace name as it appears in definition files. Case-insensitive.
    pub fn from_str_loose(s: &str) -> Option<Marketplace> {
        match s.trim().to_lowercase().as_str() {
            "xsoar" => Some(Marketplace::Xsoar),
            "marketplacev2" => Some(Marketplace::MarketplaceV2),
            "xpanse" => Some(Marketplace::Xpanse),
            _ => None,
        }
    }

    /// Whether exports for this marketplace apply `_x2` field aliasing.
    pub fn uses_aliases(&self) -> bool {
        !matches!(self, Marketplace::Xsoar)
    }
}

impl fmt::Display for Marketplace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
