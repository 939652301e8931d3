use anyhow::Result;
use async_trait::async_trait;

use crate::types::{
    CdpTransaction, CrossedTransaction, Crossing, CrossingId, JanisTransaction, PaywayTransaction,
    Platform, PlatformBatch, Report, ReportId, ReportStatus, VtexTransaction,
};

#[async_trait]
pub trait Storage: Send + Sync {
    // Report operations
    async fn create_report(&self, report: &Report) -> Result<()>;
    async fn get_report(&self, id: ReportId) -> Result<Option<Report>>;
    async fn update_report(&self, report: &Report) -> Result<()>;
    async fn list_reports(
        &self,
        platform: Option<Platform>,
        status: Option<ReportStatus>,
    ) -> Result<Vec<Report>>;

    // Transaction operations. A batch belongs to exactly one report and is
    // written once, when the report run finishes.
    async fn save_batch(&self, report_id: ReportId, batch: &PlatformBatch) -> Result<usize>;
    async fn get_vtex_transactions(&self, report_id: ReportId) -> Result<Vec<VtexTransaction>>;
    async fn get_payway_transactions(&self, report_id: ReportId) -> Result<Vec<PaywayTransaction>>;
    async fn get_cdp_transactions(&self, report_id: ReportId) -> Result<Vec<CdpTransaction>>;
    async fn get_janis_transactions(&self, report_id: ReportId) -> Result<Vec<JanisTransaction>>;

    // Crossing operations
    async fn create_crossing(&self, crossing: &Crossing) -> Result<()>;
    async fn get_crossing(&self, id: CrossingId) -> Result<Option<Crossing>>;
    async fn update_crossing(&self, crossing: &Crossing) -> Result<()>;
    async fn list_crossings(&self, status: Option<ReportStatus>) -> Result<Vec<Crossing>>;
    async fn save_crossed_transactions(
        &self,
        crossing_id: CrossingId,
        rows: &[CrossedTransaction],
    ) -> Result<usize>;
    async fn get_crossed_transactions(
        &self,
        crossing_id: CrossingId,
    ) -> Result<Vec<CrossedTransaction>>;
}
