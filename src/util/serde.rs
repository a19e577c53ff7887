//! Serializable identifiers and shared vocabulary types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Order identifier. Allocated by the order ledger, never reused.
pub type OrderId = u64;

/// Worker identifier. Allocated by the dispatcher, never reused.
pub type WorkerId = u64;

/// Milliseconds since the Unix epoch, as seen by the dispatcher clock.
pub type Timestamp = u64;

/// Priority class of an order.
///
/// `High` orders are always dispatched before any `Normal` order. The
/// external name of the high class is `VIP`, which is accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriorityClass {
    /// Served after every pending high-priority order.
    Normal,
    /// Served first.
    #[serde(alias = "VIP", alias = "vip")]
    High,
}

impl PriorityClass {
    /// Both classes in dispatch order.
    pub const DISPATCH_ORDER: [Self; 2] = [Self::High, Self::Normal];

    /// Label used in human-readable event lines.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::High => "VIP",
            Self::Normal => "Normal",
        }
    }
}

impl fmt::Display for PriorityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PriorityClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "high" | "vip" => Ok(Self::High),
            "normal" => Ok(Self::Normal),
            other => Err(format!("unknown priority class `{other}`")),
        }
    }
}
