use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{Platform, ReportId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReportStatus {
    Pending,
    Processing,
    Complete,
    Error,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "PENDING",
            ReportStatus::Processing => "PROCESSING",
            ReportStatus::Complete => "COMPLETE",
            ReportStatus::Error => "ERROR",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(ReportStatus::Pending),
            "PROCESSING" => Some(ReportStatus::Processing),
            "COMPLETE" => Some(ReportStatus::Complete),
            "ERROR" => Some(ReportStatus::Error),
            _ => None,
        }
    }

    /// Legal lifecycle moves. Error is terminal; Complete is terminal.
    pub fn can_transition_to(&self, next: ReportStatus) -> bool {
        matches!(
            (self, next),
            (ReportStatus::Pending, ReportStatus::Processing)
                | (ReportStatus::Processing, ReportStatus::Complete)
                | (ReportStatus::Processing, ReportStatus::Error)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ReportStatus::Complete | ReportStatus::Error)
    }
}

/// VTEX-only knobs: API filters as `{query_param: [values]}` and whether to
/// resolve the seller of every order (one extra request per order).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VtexOptions {
    #[serde(default)]
    pub filters: HashMap<String, Vec<String>>,
    #[serde(default = "default_include_sellers")]
    pub include_sellers: bool,
}

fn default_include_sellers() -> bool {
    true
}

impl Default for VtexOptions {
    fn default() -> Self {
        Self {
            filters: HashMap::new(),
            include_sellers: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: ReportId,
    pub platform: Platform,
    pub status: ReportStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Present only for VTEX reports.
    pub vtex_options: Option<VtexOptions>,
    pub created_at: chrono::DateTime<Utc>,
}

impl Report {
    pub fn new(platform: Platform, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            id: ReportId::new_v4(),
            platform,
            status: ReportStatus::Pending,
            start_date,
            end_date,
            vtex_options: match platform {
                Platform::Vtex => Some(VtexOptions::default()),
                _ => None,
            },
            created_at: Utc::now(),
        }
    }

    pub fn with_vtex_options(mut self, options: VtexOptions) -> Self {
        self.vtex_options = Some(options);
        self
    }

    /// Advance the lifecycle, rejecting illegal jumps (e.g. Pending straight
    /// to Complete, or reviving a terminal report).
    pub fn transition(&mut self, next: ReportStatus) -> Result<(), crate::Error> {
        if !self.status.can_transition_to(next) {
            return Err(crate::Error::InvalidTransition {
                from: self.status.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }
        self.status = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn new_report_starts_pending() {
        let report = Report::new(Platform::Payway, date(2024, 12, 1), date(2024, 12, 10));
        assert_eq!(report.status, ReportStatus::Pending);
        assert!(report.vtex_options.is_none());
    }

    #[test]
    fn vtex_report_carries_default_options() {
        let report = Report::new(Platform::Vtex, date(2024, 12, 1), date(2024, 12, 10));
        let options = report.vtex_options.unwrap();
        assert!(options.include_sellers);
        assert!(options.filters.is_empty());
    }

    #[test]
    fn lifecycle_happy_path() {
        let mut report = Report::new(Platform::Cdp, date(2024, 12, 1), date(2024, 12, 1));
        report.transition(ReportStatus::Processing).unwrap();
        report.transition(ReportStatus::Complete).unwrap();
        assert!(report.status.is_terminal());
    }

    #[test]
    fn lifecycle_rejects_skipping_processing() {
        let mut report = Report::new(Platform::Cdp, date(2024, 12, 1), date(2024, 12, 1));
        assert!(report.transition(ReportStatus::Complete).is_err());
    }

    #[test]
    fn lifecycle_rejects_leaving_terminal_state() {
        let mut report = Report::new(Platform::Janis, date(2024, 12, 1), date(2024, 12, 1));
        report.transition(ReportStatus::Processing).unwrap();
        report.transition(ReportStatus::Error).unwrap();
        assert!(report.transition(ReportStatus::Processing).is_err());
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            ReportStatus::Pending,
            ReportStatus::Processing,
            ReportStatus::Complete,
            ReportStatus::Error,
        ] {
            assert_eq!(ReportStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn status_name_outlives_its_value() {
        let filter = Some(ReportStatus::Pending);
        let name: Option<&'static str> = filter.map(|s| s.as_str());
        assert_eq!(name, Some("PENDING"));
    }
}
