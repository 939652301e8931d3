use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};

use crate::engine::cross_transactions;
use crate::jobs::queue::{Job, JobReceiver};
use crate::sources::SourceSet;
use crate::storage::Storage;
use crate::types::{
    CdpTransaction, CrossingId, JanisTransaction, PaywayTransaction, ReportId, ReportStatus,
    VtexTransaction,
};

pub struct Worker {
    storage: Arc<dyn Storage>,
    sources: SourceSet,
}

impl Worker {
    pub fn new(storage: Arc<dyn Storage>, sources: SourceSet) -> Self {
        Self { storage, sources }
    }

    /// Consume jobs until the queue closes. A failing job never stops the
    /// loop; the failure lands on the report or crossing row instead.
    pub async fn run(&self, mut jobs: JobReceiver) {
        info!("worker started");
        while let Some(job) = jobs.recv().await {
            if let Err(err) = self.handle(job).await {
                error!(?job, %err, "job failed");
            }
        }
        info!("job queue closed, worker stopping");
    }

    /// Run every Pending report and crossing found in storage. The standalone
    /// worker uses this to pick up rows enqueued by another process, and to
    /// recover rows whose queued job died with a restart.
    pub async fn sweep(&self) -> Result<usize> {
        let mut handled = 0;
        for report in self
            .storage
            .list_reports(None, Some(ReportStatus::Pending))
            .await?
        {
            self.generate_report(report.id).await?;
            handled += 1;
        }
        for crossing in self
            .storage
            .list_crossings(Some(ReportStatus::Pending))
            .await?
        {
            self.run_crossing(crossing.id).await?;
            handled += 1;
        }
        Ok(handled)
    }

    pub async fn run_polling(&self, interval: std::time::Duration) {
        info!(interval_secs = interval.as_secs(), "polling worker started");
        loop {
            match self.sweep().await {
                Ok(0) => {}
                Ok(handled) => info!(handled, "sweep finished"),
                Err(err) => error!(%err, "sweep failed"),
            }
            tokio::time::sleep(interval).await;
        }
    }

    pub async fn handle(&self, job: Job) -> Result<()> {
        match job {
            Job::GenerateReport { report_id } => self.generate_report(report_id).await,
            Job::RunCrossing { crossing_id } => self.run_crossing(crossing_id).await,
        }
    }

    async fn generate_report(&self, report_id: ReportId) -> Result<()> {
        let Some(mut report) = self.storage.get_report(report_id).await? else {
            // Stale job, e.g. the row was created on another store. Drop it.
            error!(%report_id, "job references a missing report");
            return Ok(());
        };

        report.transition(ReportStatus::Processing)?;
        self.storage.update_report(&report).await?;
        info!(%report_id, platform = report.platform.as_str(), "report run started");

        let outcome = self
            .sources
            .for_platform(report.platform)
            .fetch(&report)
            .await;

        match outcome {
            Ok(batch) => {
                let saved = self.storage.save_batch(report.id, &batch).await?;
                report.transition(ReportStatus::Complete)?;
                self.storage.update_report(&report).await?;
                info!(%report_id, rows = saved, "report run complete");
            }
            Err(err) => {
                error!(%report_id, %err, "report run failed");
                report.transition(ReportStatus::Error)?;
                self.storage.update_report(&report).await?;
            }
        }
        Ok(())
    }

    async fn run_crossing(&self, crossing_id: CrossingId) -> Result<()> {
        let Some(mut crossing) = self.storage.get_crossing(crossing_id).await? else {
            error!(%crossing_id, "job references a missing crossing");
            return Ok(());
        };

        crossing.transition(ReportStatus::Processing)?;
        self.storage.update_crossing(&crossing).await?;
        info!(%crossing_id, "crossing started");

        let outcome = self.gather_and_cross(&crossing).await;

        match outcome {
            Ok(rows) => {
                let saved = self
                    .storage
                    .save_crossed_transactions(crossing.id, &rows)
                    .await?;
                crossing.transition(ReportStatus::Complete)?;
                self.storage.update_crossing(&crossing).await?;
                info!(%crossing_id, rows = saved, "crossing complete");
            }
            Err(err) => {
                error!(%crossing_id, %err, "crossing failed");
                crossing.transition(ReportStatus::Error)?;
                self.storage.update_crossing(&crossing).await?;
            }
        }
        Ok(())
    }

    async fn gather_and_cross(
        &self,
        crossing: &crate::types::Crossing,
    ) -> Result<Vec<crate::types::CrossedTransaction>> {
        let vtex: Vec<VtexTransaction> = match crossing.vtex_report {
            Some(id) => self.storage.get_vtex_transactions(id).await?,
            None => Vec::new(),
        };
        let payway: Vec<PaywayTransaction> = match crossing.payway_report {
            Some(id) => self.storage.get_payway_transactions(id).await?,
            None => Vec::new(),
        };
        let cdp: Vec<CdpTransaction> = match crossing.cdp_report {
            Some(id) => self.storage.get_cdp_transactions(id).await?,
            None => Vec::new(),
        };
        let janis: Vec<JanisTransaction> = match crossing.janis_report {
            Some(id) => self.storage.get_janis_transactions(id).await?,
            None => Vec::new(),
        };

        Ok(cross_transactions(&vtex, &payway, &cdp, &janis).rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{NaiveDate, Utc};

    use crate::sources::Source;
    use crate::storage::InMemoryStore;
    use crate::types::{Crossing, Platform, PlatformBatch, Report};

    struct FixedSource {
        platform: Platform,
        batch: PlatformBatch,
    }

    #[async_trait]
    impl Source for FixedSource {
        fn platform(&self) -> Platform {
            self.platform
        }

        async fn fetch(&self, _report: &Report) -> Result<PlatformBatch> {
            Ok(self.batch.clone())
        }
    }

    struct FailingSource(Platform);

    #[async_trait]
    impl Source for FailingSource {
        fn platform(&self) -> Platform {
            self.0
        }

        async fn fetch(&self, _report: &Report) -> Result<PlatformBatch> {
            anyhow::bail!("gateway down")
        }
    }

    fn sources_with(vtex: Arc<dyn Source>) -> SourceSet {
        SourceSet::new(
            vtex,
            Arc::new(FailingSource(Platform::Payway)),
            Arc::new(FailingSource(Platform::Cdp)),
            Arc::new(FailingSource(Platform::Janis)),
        )
    }

    fn vtex_batch() -> PlatformBatch {
        PlatformBatch::Vtex(vec![VtexTransaction {
            order_id: "1404930428916-01".to_string(),
            transaction_id: "553124".to_string(),
            occurred_at: Utc::now(),
            payment_method: "Visa".to_string(),
            seller: "Carrefour Hiper".to_string(),
            status: "Faturado".to_string(),
            total_cents: Some(100000),
        }])
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, d).unwrap()
    }

    #[tokio::test]
    async fn successful_report_run_lands_on_complete() {
        let storage = Arc::new(InMemoryStore::new());
        let worker = Worker::new(
            storage.clone(),
            sources_with(Arc::new(FixedSource {
                platform: Platform::Vtex,
                batch: vtex_batch(),
            })),
        );

        let report = Report::new(Platform::Vtex, date(1), date(1));
        storage.create_report(&report).await.unwrap();
        worker
            .handle(Job::GenerateReport {
                report_id: report.id,
            })
            .await
            .unwrap();

        let stored = storage.get_report(report.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ReportStatus::Complete);
        assert_eq!(
            storage.get_vtex_transactions(report.id).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn failed_acquisition_lands_on_error() {
        let storage = Arc::new(InMemoryStore::new());
        let worker = Worker::new(
            storage.clone(),
            sources_with(Arc::new(FailingSource(Platform::Vtex))),
        );

        let report = Report::new(Platform::Vtex, date(1), date(1));
        storage.create_report(&report).await.unwrap();
        worker
            .handle(Job::GenerateReport {
                report_id: report.id,
            })
            .await
            .unwrap();

        let stored = storage.get_report(report.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ReportStatus::Error);
    }

    #[tokio::test]
    async fn missing_report_is_dropped_without_failing_the_loop() {
        let storage = Arc::new(InMemoryStore::new());
        let worker = Worker::new(
            storage.clone(),
            sources_with(Arc::new(FailingSource(Platform::Vtex))),
        );

        worker
            .handle(Job::GenerateReport {
                report_id: ReportId::new_v4(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn sweep_picks_up_pending_rows() {
        let storage = Arc::new(InMemoryStore::new());
        let worker = Worker::new(
            storage.clone(),
            sources_with(Arc::new(FixedSource {
                platform: Platform::Vtex,
                batch: vtex_batch(),
            })),
        );

        let report = Report::new(Platform::Vtex, date(1), date(1));
        storage.create_report(&report).await.unwrap();

        assert_eq!(worker.sweep().await.unwrap(), 1);
        let stored = storage.get_report(report.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ReportStatus::Complete);
        // Nothing pending is left for the next sweep.
        assert_eq!(worker.sweep().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn crossing_runs_from_stored_reports() {
        let storage = Arc::new(InMemoryStore::new());
        let worker = Worker::new(
            storage.clone(),
            sources_with(Arc::new(FixedSource {
                platform: Platform::Vtex,
                batch: vtex_batch(),
            })),
        );

        let mut report = Report::new(Platform::Vtex, date(1), date(1));
        storage.create_report(&report).await.unwrap();
        worker
            .handle(Job::GenerateReport {
                report_id: report.id,
            })
            .await
            .unwrap();
        report = storage.get_report(report.id).await.unwrap().unwrap();
        assert_eq!(report.status, ReportStatus::Complete);

        let mut crossing = Crossing::new(date(1), date(1));
        crossing.vtex_report = Some(report.id);
        storage.create_crossing(&crossing).await.unwrap();
        worker
            .handle(Job::RunCrossing {
                crossing_id: crossing.id,
            })
            .await
            .unwrap();

        let stored = storage.get_crossing(crossing.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ReportStatus::Complete);
        assert!(stored.completed_on.is_some());
        assert_eq!(
            storage
                .get_crossed_transactions(crossing.id)
                .await
                .unwrap()
                .len(),
            1
        );
    }
}
