use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use crate::storage::traits::Storage;
use crate::types::{
    CdpTransaction, CrossedTransaction, Crossing, CrossingId, JanisTransaction, PaywayTransaction,
    Platform, PlatformBatch, Report, ReportId, ReportStatus, VtexOptions, VtexTransaction,
};

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::raw_sql(include_str!("../../migrations/V001__initial_schema.sql"))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Storage for PostgresStore {
    async fn create_report(&self, report: &Report) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reports (id, platform, status, start_date, end_date, vtex_options, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
            "#,
        )
        .bind(report.id)
        .bind(report.platform.as_str())
        .bind(report.status.as_str())
        .bind(report.start_date)
        .bind(report.end_date)
        .bind(
            report
                .vtex_options
                .as_ref()
                .map(serde_json::to_value)
                .transpose()?,
        )
        .bind(report.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_report(&self, id: ReportId) -> Result<Option<Report>> {
        let row = sqlx::query(
            r#"
            SELECT id, platform, status, start_date, end_date, vtex_options, created_at
            FROM reports
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some(row_to_report(&r)?)),
            None => Ok(None),
        }
    }

    async fn update_report(&self, report: &Report) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE reports
            SET status = $2, start_date = $3, end_date = $4, vtex_options = $5, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(report.id)
        .bind(report.status.as_str())
        .bind(report.start_date)
        .bind(report.end_date)
        .bind(
            report
                .vtex_options
                .as_ref()
                .map(serde_json::to_value)
                .transpose()?,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_reports(
        &self,
        platform: Option<Platform>,
        status: Option<ReportStatus>,
    ) -> Result<Vec<Report>> {
        let rows = sqlx::query(
            r#"
            SELECT id, platform, status, start_date, end_date, vtex_options, created_at
            FROM reports
            WHERE ($1::text IS NULL OR platform = $1)
              AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(platform.map(|p| p.as_str()))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_report).collect()
    }

    async fn save_batch(&self, report_id: ReportId, batch: &PlatformBatch) -> Result<usize> {
        let mut tx = self.pool.begin().await?;

        match batch {
            PlatformBatch::Vtex(rows) => {
                for t in rows {
                    sqlx::query(
                        r#"
                        INSERT INTO vtex_transactions
                            (report_id, order_id, transaction_id, occurred_at, payment_method, seller, status, total_cents)
                        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                        "#,
                    )
                    .bind(report_id)
                    .bind(&t.order_id)
                    .bind(&t.transaction_id)
                    .bind(t.occurred_at)
                    .bind(&t.payment_method)
                    .bind(&t.seller)
                    .bind(&t.status)
                    .bind(t.total_cents)
                    .execute(&mut *tx)
                    .await?;
                }
            }
            PlatformBatch::Payway(rows) => {
                for t in rows {
                    sqlx::query(
                        r#"
                        INSERT INTO payway_transactions
                            (report_id, transaction_id, occurred_at, amount_cents, status, card)
                        VALUES ($1, $2, $3, $4, $5, $6)
                        "#,
                    )
                    .bind(report_id)
                    .bind(&t.transaction_id)
                    .bind(t.occurred_at)
                    .bind(t.amount_cents)
                    .bind(&t.status)
                    .bind(&t.card)
                    .execute(&mut *tx)
                    .await?;
                }
            }
            PlatformBatch::Cdp(rows) => {
                for t in rows {
                    sqlx::query(
                        r#"
                        INSERT INTO cdp_transactions
                            (report_id, order_id, occurred_at, store_number, status)
                        VALUES ($1, $2, $3, $4, $5)
                        "#,
                    )
                    .bind(report_id)
                    .bind(&t.order_id)
                    .bind(t.occurred_at)
                    .bind(t.store_number)
                    .bind(&t.status)
                    .execute(&mut *tx)
                    .await?;
                }
            }
            PlatformBatch::Janis(rows) => {
                for t in rows {
                    sqlx::query(
                        r#"
                        INSERT INTO janis_transactions
                            (report_id, order_id, transaction_id, occurred_at, delivered_at, payment_method, seller, status)
                        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                        "#,
                    )
                    .bind(report_id)
                    .bind(&t.order_id)
                    .bind(&t.transaction_id)
                    .bind(t.occurred_at)
                    .bind(t.delivered_at)
                    .bind(&t.payment_method)
                    .bind(&t.seller)
                    .bind(&t.status)
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }

        tx.commit().await?;
        Ok(batch.len())
    }

    async fn get_vtex_transactions(&self, report_id: ReportId) -> Result<Vec<VtexTransaction>> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, transaction_id, occurred_at, payment_method, seller, status, total_cents
            FROM vtex_transactions
            WHERE report_id = $1
            ORDER BY occurred_at ASC
            "#,
        )
        .bind(report_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| VtexTransaction {
                order_id: r.get("order_id"),
                transaction_id: r.get("transaction_id"),
                occurred_at: r.get("occurred_at"),
                payment_method: r.get("payment_method"),
                seller: r.get("seller"),
                status: r.get("status"),
                total_cents: r.get("total_cents"),
            })
            .collect())
    }

    async fn get_payway_transactions(&self, report_id: ReportId) -> Result<Vec<PaywayTransaction>> {
        let rows = sqlx::query(
            r#"
            SELECT transaction_id, occurred_at, amount_cents, status, card
            FROM payway_transactions
            WHERE report_id = $1
            ORDER BY occurred_at ASC
            "#,
        )
        .bind(report_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| PaywayTransaction {
                transaction_id: r.get("transaction_id"),
                occurred_at: r.get("occurred_at"),
                amount_cents: r.get("amount_cents"),
                status: r.get("status"),
                card: r.get("card"),
            })
            .collect())
    }

    async fn get_cdp_transactions(&self, report_id: ReportId) -> Result<Vec<CdpTransaction>> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, occurred_at, store_number, status
            FROM cdp_transactions
            WHERE report_id = $1
            ORDER BY occurred_at ASC
            "#,
        )
        .bind(report_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| CdpTransaction {
                order_id: r.get("order_id"),
                occurred_at: r.get("occurred_at"),
                store_number: r.get("store_number"),
                status: r.get("status"),
            })
            .collect())
    }

    async fn get_janis_transactions(&self, report_id: ReportId) -> Result<Vec<JanisTransaction>> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, transaction_id, occurred_at, delivered_at, payment_method, seller, status
            FROM janis_transactions
            WHERE report_id = $1
            ORDER BY occurred_at ASC
            "#,
        )
        .bind(report_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| JanisTransaction {
                order_id: r.get("order_id"),
                transaction_id: r.get("transaction_id"),
                occurred_at: r.get("occurred_at"),
                delivered_at: r.get("delivered_at"),
                payment_method: r.get("payment_method"),
                seller: r.get("seller"),
                status: r.get("status"),
            })
            .collect())
    }

    async fn create_crossing(&self, crossing: &Crossing) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO crossings (
                id, status, start_date, end_date, completed_on,
                vtex_report, payway_report, cdp_report, janis_report,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW())
            "#,
        )
        .bind(crossing.id)
        .bind(crossing.status.as_str())
        .bind(crossing.start_date)
        .bind(crossing.end_date)
        .bind(crossing.completed_on)
        .bind(crossing.vtex_report)
        .bind(crossing.payway_report)
        .bind(crossing.cdp_report)
        .bind(crossing.janis_report)
        .bind(crossing.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_crossing(&self, id: CrossingId) -> Result<Option<Crossing>> {
        let row = sqlx::query(
            r#"
            SELECT id, status, start_date, end_date, completed_on,
                   vtex_report, payway_report, cdp_report, janis_report, created_at
            FROM crossings
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some(row_to_crossing(&r)?)),
            None => Ok(None),
        }
    }

    async fn update_crossing(&self, crossing: &Crossing) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE crossings
            SET status = $2, completed_on = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(crossing.id)
        .bind(crossing.status.as_str())
        .bind(crossing.completed_on)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_crossings(&self, status: Option<ReportStatus>) -> Result<Vec<Crossing>> {
        let rows = sqlx::query(
            r#"
            SELECT id, status, start_date, end_date, completed_on,
                   vtex_report, payway_report, cdp_report, janis_report, created_at
            FROM crossings
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY created_at DESC
            "#,
        )
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_crossing).collect()
    }

    async fn save_crossed_transactions(
        &self,
        crossing_id: CrossingId,
        rows: &[CrossedTransaction],
    ) -> Result<usize> {
        let mut tx = self.pool.begin().await?;

        for t in rows {
            sqlx::query(
                r#"
                INSERT INTO crossed_transactions (
                    crossing_id, order_id, occurred_at, delivered_at, payment_method, seller,
                    vtex_status, payway_status, payway_status_2, cdp_status, janis_status, review
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                "#,
            )
            .bind(crossing_id)
            .bind(&t.order_id)
            .bind(t.occurred_at)
            .bind(t.delivered_at)
            .bind(&t.payment_method)
            .bind(&t.seller)
            .bind(&t.vtex_status)
            .bind(&t.payway_status)
            .bind(&t.payway_status_2)
            .bind(&t.cdp_status)
            .bind(&t.janis_status)
            .bind(&t.review)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(rows.len())
    }

    async fn get_crossed_transactions(
        &self,
        crossing_id: CrossingId,
    ) -> Result<Vec<CrossedTransaction>> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, occurred_at, delivered_at, payment_method, seller,
                   vtex_status, payway_status, payway_status_2, cdp_status, janis_status, review
            FROM crossed_transactions
            WHERE crossing_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(crossing_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| CrossedTransaction {
                order_id: r.get("order_id"),
                occurred_at: r.get("occurred_at"),
                delivered_at: r.get("delivered_at"),
                payment_method: r.get("payment_method"),
                seller: r.get("seller"),
                vtex_status: r.get("vtex_status"),
                payway_status: r.get("payway_status"),
                payway_status_2: r.get("payway_status_2"),
                cdp_status: r.get("cdp_status"),
                janis_status: r.get("janis_status"),
                review: r.get("review"),
            })
            .collect())
    }
}

/// Columns written by `as_str` come back through these; a value neither side
/// of the enum knows is a corrupt row and fails the read.
fn parse_platform(raw: &str) -> Result<Platform> {
    Platform::parse(raw).ok_or_else(|| anyhow::anyhow!("unknown platform in row: {raw}"))
}

fn parse_status(raw: &str) -> Result<ReportStatus> {
    ReportStatus::parse(raw).ok_or_else(|| anyhow::anyhow!("unknown status in row: {raw}"))
}

fn row_to_report(r: &sqlx::postgres::PgRow) -> Result<Report> {
    let platform = parse_platform(&r.get::<String, _>("platform"))?;
    let status = parse_status(&r.get::<String, _>("status"))?;

    let vtex_options: Option<VtexOptions> = r
        .get::<Option<serde_json::Value>, _>("vtex_options")
        .map(serde_json::from_value)
        .transpose()?;

    Ok(Report {
        id: r.get("id"),
        platform,
        status,
        start_date: r.get("start_date"),
        end_date: r.get("end_date"),
        vtex_options,
        created_at: r.get("created_at"),
    })
}

fn row_to_crossing(r: &sqlx::postgres::PgRow) -> Result<Crossing> {
    Ok(Crossing {
        id: r.get("id"),
        status: parse_status(&r.get::<String, _>("status"))?,
        start_date: r.get("start_date"),
        end_date: r.get("end_date"),
        completed_on: r.get("completed_on"),
        vtex_report: r.get("vtex_report"),
        payway_report: r.get("payway_report"),
        cdp_report: r.get("cdp_report"),
        janis_report: r.get("janis_report"),
        created_at: r.get("created_at"),
    })
}
