pub mod crossing;
pub mod report;
pub mod transaction;

pub use crossing::{CrossedTransaction, Crossing, MatchStats};
pub use report::{Report, ReportStatus, VtexOptions};
pub use transaction::{
    CdpTransaction, JanisTransaction, PaywayTransaction, PlatformBatch, VtexTransaction,
};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ReportId = Uuid;
pub type CrossingId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Vtex,   // e-commerce orders API
    Payway, // payment gateway exports
    Cdp,    // fulfilment center exports
    Janis,  // OMS API
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Vtex => "vtex",
            Platform::Payway => "payway",
            Platform::Cdp => "cdp",
            Platform::Janis => "janis",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "vtex" => Some(Platform::Vtex),
            "payway" => Some(Platform::Payway),
            "cdp" => Some(Platform::Cdp),
            "janis" => Some(Platform::Janis),
            _ => None,
        }
    }

    pub const ALL: [Platform; 4] = [
        Platform::Vtex,
        Platform::Payway,
        Platform::Cdp,
        Platform::Janis,
    ];
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_round_trips_through_strings() {
        for platform in Platform::ALL {
            assert_eq!(Platform::parse(platform.as_str()), Some(platform));
        }
    }

    #[test]
    fn platform_name_outlives_its_value() {
        // Query filters map an owned copy to its name; the name must not
        // borrow from that copy.
        let filter = Some(Platform::Payway);
        let name: Option<&'static str> = filter.map(|p| p.as_str());
        assert_eq!(name, Some("payway"));
    }
}
