use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{CrossingId, ReportId, ReportStatus};

/// A reconciliation pass over up to four platform reports. Reuses the report
/// lifecycle; `completed_on` is stamped when the run finishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Crossing {
    pub id: CrossingId,
    pub status: ReportStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub completed_on: Option<NaiveDate>,
    pub vtex_report: Option<ReportId>,
    pub payway_report: Option<ReportId>,
    pub cdp_report: Option<ReportId>,
    pub janis_report: Option<ReportId>,
    pub created_at: DateTime<Utc>,
}

impl Crossing {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            id: CrossingId::new_v4(),
            status: ReportStatus::Pending,
            start_date,
            end_date,
            completed_on: None,
            vtex_report: None,
            payway_report: None,
            cdp_report: None,
            janis_report: None,
            created_at: Utc::now(),
        }
    }

    pub fn source_reports(&self) -> Vec<ReportId> {
        [
            self.vtex_report,
            self.payway_report,
            self.cdp_report,
            self.janis_report,
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    pub fn transition(&mut self, next: ReportStatus) -> Result<(), crate::Error> {
        if !self.status.can_transition_to(next) {
            return Err(crate::Error::InvalidTransition {
                from: self.status.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }
        self.status = next;
        if next == ReportStatus::Complete {
            self.completed_on = Some(Utc::now().date_naive());
        }
        Ok(())
    }
}

/// One joined row of a crossing. Columns that found no counterpart carry
/// "N/A", matching what the operator spreadsheets always showed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossedTransaction {
    pub order_id: String,
    pub occurred_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub payment_method: String,
    pub seller: String,
    pub vtex_status: String,
    pub payway_status: String,
    /// Split payments produce a second gateway record (`-2` suffix).
    pub payway_status_2: String,
    pub cdp_status: String,
    pub janis_status: String,
    /// Empty when nothing needs operator attention.
    pub review: String,
}

impl CrossedTransaction {
    pub fn needs_review(&self) -> bool {
        !self.review.is_empty()
    }
}

/// Counters accumulated during a crossing pass, logged at the end of the run.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize)]
pub struct MatchStats {
    pub total: usize,
    pub payway_matches: usize,
    pub cdp_matches: usize,
    pub janis_matches: usize,
    pub flagged: usize,
}

impl MatchStats {
    pub fn match_rate(&self, matches: usize) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        100.0 * matches as f64 / self.total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn completion_stamps_date() {
        let mut crossing = Crossing::new(date(2024, 12, 1), date(2024, 12, 10));
        crossing.transition(ReportStatus::Processing).unwrap();
        assert!(crossing.completed_on.is_none());
        crossing.transition(ReportStatus::Complete).unwrap();
        assert!(crossing.completed_on.is_some());
    }

    #[test]
    fn source_reports_skips_absent_platforms() {
        let mut crossing = Crossing::new(date(2024, 12, 1), date(2024, 12, 10));
        assert!(crossing.source_reports().is_empty());
        crossing.vtex_report = Some(ReportId::new_v4());
        crossing.payway_report = Some(ReportId::new_v4());
        assert_eq!(crossing.source_reports().len(), 2);
    }

    #[test]
    fn match_rate_handles_empty_run() {
        let stats = MatchStats::default();
        assert_eq!(stats.match_rate(0), 0.0);
    }
}
