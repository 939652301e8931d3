use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use anyhow::Result;
use async_trait::async_trait;

use crate::storage::traits::Storage;
use crate::types::{
    CdpTransaction, CrossedTransaction, Crossing, CrossingId, JanisTransaction, PaywayTransaction,
    Platform, PlatformBatch, Report, ReportId, ReportStatus, VtexTransaction,
};

/// Map-backed store for tests and `cruce dev`. Locks are short-lived and
/// never held across an await.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    reports: Arc<RwLock<HashMap<ReportId, Report>>>,
    batches: Arc<RwLock<HashMap<ReportId, PlatformBatch>>>,
    crossings: Arc<RwLock<HashMap<CrossingId, Crossing>>>,
    crossed: Arc<RwLock<HashMap<CrossingId, Vec<CrossedTransaction>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for InMemoryStore {
    async fn create_report(&self, report: &Report) -> Result<()> {
        let mut reports = self.reports.write().unwrap();
        reports.insert(report.id, report.clone());
        Ok(())
    }

    async fn get_report(&self, id: ReportId) -> Result<Option<Report>> {
        let reports = self.reports.read().unwrap();
        Ok(reports.get(&id).cloned())
    }

    async fn update_report(&self, report: &Report) -> Result<()> {
        let mut reports = self.reports.write().unwrap();
        reports.insert(report.id, report.clone());
        Ok(())
    }

    async fn list_reports(
        &self,
        platform: Option<Platform>,
        status: Option<ReportStatus>,
    ) -> Result<Vec<Report>> {
        let reports = self.reports.read().unwrap();
        let mut result: Vec<Report> = reports
            .values()
            .filter(|r| platform.is_none_or(|p| r.platform == p))
            .filter(|r| status.is_none_or(|s| r.status == s))
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn save_batch(&self, report_id: ReportId, batch: &PlatformBatch) -> Result<usize> {
        let mut batches = self.batches.write().unwrap();
        let count = batch.len();
        batches.insert(report_id, batch.clone());
        Ok(count)
    }

    async fn get_vtex_transactions(&self, report_id: ReportId) -> Result<Vec<VtexTransaction>> {
        let batches = self.batches.read().unwrap();
        match batches.get(&report_id) {
            Some(PlatformBatch::Vtex(rows)) => Ok(rows.clone()),
            _ => Ok(Vec::new()),
        }
    }

    async fn get_payway_transactions(&self, report_id: ReportId) -> Result<Vec<PaywayTransaction>> {
        let batches = self.batches.read().unwrap();
        match batches.get(&report_id) {
            Some(PlatformBatch::Payway(rows)) => Ok(rows.clone()),
            _ => Ok(Vec::new()),
        }
    }

    async fn get_cdp_transactions(&self, report_id: ReportId) -> Result<Vec<CdpTransaction>> {
        let batches = self.batches.read().unwrap();
        match batches.get(&report_id) {
            Some(PlatformBatch::Cdp(rows)) => Ok(rows.clone()),
            _ => Ok(Vec::new()),
        }
    }

    async fn get_janis_transactions(&self, report_id: ReportId) -> Result<Vec<JanisTransaction>> {
        let batches = self.batches.read().unwrap();
        match batches.get(&report_id) {
            Some(PlatformBatch::Janis(rows)) => Ok(rows.clone()),
            _ => Ok(Vec::new()),
        }
    }

    async fn create_crossing(&self, crossing: &Crossing) -> Result<()> {
        let mut crossings = self.crossings.write().unwrap();
        crossings.insert(crossing.id, crossing.clone());
        Ok(())
    }

    async fn get_crossing(&self, id: CrossingId) -> Result<Option<Crossing>> {
        let crossings = self.crossings.read().unwrap();
        Ok(crossings.get(&id).cloned())
    }

    async fn update_crossing(&self, crossing: &Crossing) -> Result<()> {
        let mut crossings = self.crossings.write().unwrap();
        crossings.insert(crossing.id, crossing.clone());
        Ok(())
    }

    async fn list_crossings(&self, status: Option<ReportStatus>) -> Result<Vec<Crossing>> {
        let crossings = self.crossings.read().unwrap();
        let mut result: Vec<Crossing> = crossings
            .values()
            .filter(|c| status.is_none_or(|s| c.status == s))
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn save_crossed_transactions(
        &self,
        crossing_id: CrossingId,
        rows: &[CrossedTransaction],
    ) -> Result<usize> {
        let mut crossed = self.crossed.write().unwrap();
        crossed.insert(crossing_id, rows.to_vec());
        Ok(rows.len())
    }

    async fn get_crossed_transactions(
        &self,
        crossing_id: CrossingId,
    ) -> Result<Vec<CrossedTransaction>> {
        let crossed = self.crossed.read().unwrap();
        Ok(crossed.get(&crossing_id).cloned().unwrap_or_default())
    }
}
