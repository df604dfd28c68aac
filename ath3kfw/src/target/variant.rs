//! Radio variants and their boot plans.

use std::fmt;

/// Supported radio variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Variant {
    /// AR3011: a single monolithic image (`ath3k-1.fw`).
    #[default]
    Ar3011,
    /// AR3012: ROM patch, system configuration, then normal mode.
    Ar3012,
}

impl Variant {
    /// Get the variant from a tag such as `legacy` or `ar3012`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "legacy" | "ar3011" | "ath3k" => Some(Self::Ar3011),
            "ar3012" | "3012" => Some(Self::Ar3012),
            _ => None,
        }
    }

    /// Tag accepted on the command line.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Ar3011 => "legacy",
            Self::Ar3012 => "ar3012",
        }
    }

    /// Whether the plan checks versions and switches to normal mode itself.
    pub fn is_staged(&self) -> bool {
        matches!(self, Self::Ar3012)
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ar3011 => write!(f, "AR3011"),
            Self::Ar3012 => write!(f, "AR3012"),
        }
    }
}
