//! Supported marketplaces.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a marketplace name cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown marketplace: {0}")]
pub struct MarketplaceParseError(pub String);

/// A marketplace the platform can connect an organization to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Marketplace {
    /// Takealot Seller Portal.
    Takealot,
    /// Wantitall.
    Wantitall,
    /// Self-hosted WooCommerce store.
    #[serde(rename = "woocommerce")]
    WooCommerce,
    /// Shopify store.
    Shopify,
    /// Amazon Selling Partner API.
    Amazon,
}

impl Marketplace {
    /// All known marketplaces, in display order.
    pub const ALL: [Self; 5] = [
        Self::Takealot,
        Self::Wantitall,
        Self::WooCommerce,
        Self::Shopify,
        Self::Amazon,
    ];

    /// Stable lowercase identifier used in URLs, logs and configuration.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Takealot => "takealot",
            Self::Wantitall => "wantitall",
            Self::WooCommerce => "woocommerce",
            Self::Shopify => "shopify",
            Self::Amazon => "amazon",
        }
    }

    /// Human-readable name.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Takealot => "Takealot",
            Self::Wantitall => "Wantitall",
            Self::WooCommerce => "WooCommerce",
            Self::Shopify => "Shopify",
            Self::Amazon => "Amazon",
        }
    }
}

impl std::fmt::Display for Marketplace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Marketplace {
    type Err = MarketplaceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "takealot" => Ok(Self::Takealot),
            "wantitall" => Ok(Self::Wantitall),
            "woocommerce" | "woo" => Ok(Self::WooCommerce),
            "shopify" => Ok(Self::Shopify),
            "amazon" => Ok(Self::Amazon),
            _ => Err(MarketplaceParseError(s.to_string())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_through_str() {
        for marketplace in Marketplace::ALL {
            let parsed: Marketplace = marketplace.as_str().parse().expect("parse");
            assert_eq!(parsed, marketplace);
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("WooCommerce".parse::<Marketplace>(), Ok(Marketplace::WooCommerce));
        assert_eq!(" Takealot ".parse::<Marketplace>(), Ok(Marketplace::Takealot));
    }

    #[test]
    fn test_parse_unknown() {
        let err = "makro".parse::<Marketplace>().unwrap_err();
        assert_eq!(err.to_string(), "unknown marketplace: makro");
    }

    #[test]
    fn test_serde_names_match_display() {
        let json = serde_json::to_string(&Marketplace::WooCommerce).expect("serialize");
        assert_eq!(json, "\"woocommerce\"");
    }
}
