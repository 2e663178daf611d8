use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DashError;

/// Logical resources kept in the document cache, one per remote document
/// (plus one for the whole SMC-PA dataset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    Alarms,
    Signals,
    Coins,
    Ohlcv,
    SmcPa,
}

impl ResourceKind {
    /// Refresh order matches the order panels are laid out in.
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Alarms,
        ResourceKind::Signals,
        ResourceKind::Coins,
        ResourceKind::Ohlcv,
        ResourceKind::SmcPa,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Alarms => "alarms",
            ResourceKind::Signals => "signals",
            ResourceKind::Coins => "coins",
            ResourceKind::Ohlcv => "ohlcv",
            ResourceKind::SmcPa => "smc-pa",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            ResourceKind::Alarms => 0,
            ResourceKind::Signals => 1,
            ResourceKind::Coins => 2,
            ResourceKind::Ohlcv => 3,
            ResourceKind::SmcPa => 4,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ResourceKind {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "alarms" => Ok(ResourceKind::Alarms),
            "signals" => Ok(ResourceKind::Signals),
            "coins" => Ok(ResourceKind::Coins),
            "ohlcv" => Ok(ResourceKind::Ohlcv),
            "smc-pa" | "smc_pa" | "smcpa" => Ok(ResourceKind::SmcPa),
            _ => Err(DashError::UnknownResource(s.to_string())),
        }
    }
}
