//! Payway gateway acquisition.
//!
//! The gateway only hands out tab-separated export files and silently caps
//! each file at 5000 rows, so acquisition is a window planner around an
//! export transport: one window per day, a capped day splits into halves,
//! a capped half into quarters. Overlapping boundary rows are deduped by
//! operation id.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use crate::sources::{argentina_offset, Source};
use crate::types::{PaywayTransaction, Platform, PlatformBatch, Report};
use crate::{Config, Error};

/// Rows per export file beyond which the gateway truncates.
const EXPORT_ROW_CAP: usize = 5000;

const COL_OPERATION: &str = "id oper.";
const COL_DATE: &str = "Fecha original";
const COL_AMOUNT: &str = "Monto";
const COL_STATUS: &str = "Estado";
const COL_CARD: &str = "Tarjeta";

/// Transport seam: hands back the raw export text for a local-time window.
#[async_trait]
pub trait PaywayGateway: Send + Sync {
    async fn export(&self, from: NaiveDateTime, to: NaiveDateTime) -> Result<String>;
}

pub struct PaywayHttpGateway {
    base_url: String,
    user: String,
    password: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ExportResponse {
    content: String,
}

impl PaywayHttpGateway {
    pub fn new(base_url: String, user: String, password: String) -> Self {
        Self {
            base_url,
            user,
            password,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, Error> {
        Ok(Self::new(
            Config::require(&config.payway_base_url, "PAYWAY_BASE_URL")?,
            Config::require(&config.payway_user, "PAYWAY_USER")?,
            Config::require(&config.payway_password, "PAYWAY_PASSWORD")?,
        ))
    }
}

#[async_trait]
impl PaywayGateway for PaywayHttpGateway {
    async fn export(&self, from: NaiveDateTime, to: NaiveDateTime) -> Result<String> {
        let response = self
            .client
            .get(format!("{}/transactions/export", self.base_url))
            .basic_auth(&self.user, Some(&self.password))
            .query(&[
                ("from", from.format("%d/%m/%Y %H:%M").to_string()),
                ("to", to.format("%d/%m/%Y %H:%M").to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await?;
            return Err(Error::source(Platform::Payway, format!("export {status}: {body}")).into());
        }

        let export: ExportResponse = response.json().await?;
        Ok(export.content)
    }
}

pub struct PaywaySource {
    gateway: Arc<dyn PaywayGateway>,
}

impl PaywaySource {
    pub fn new(gateway: Arc<dyn PaywayGateway>) -> Self {
        Self { gateway }
    }

    /// Acquire one day, splitting capped windows. A capped quarter cannot be
    /// split further; its rows are kept and the truncation logged.
    async fn fetch_day(&self, day: NaiveDate) -> Result<Vec<PaywayTransaction>> {
        let mut rows = Vec::new();
        let mut windows = vec![day_window(day)];
        let mut depth_left = 2;

        while !windows.is_empty() {
            let mut capped = Vec::new();
            for (from, to) in windows.drain(..) {
                let parsed = parse_export(&self.gateway.export(from, to).await?)?;
                if parsed.len() >= EXPORT_ROW_CAP && depth_left > 0 {
                    capped.push((from, to));
                } else {
                    if parsed.len() >= EXPORT_ROW_CAP {
                        warn!(%from, %to, "quarter-day window still capped, rows lost");
                    }
                    rows.extend(parsed);
                }
            }
            windows = capped.into_iter().flat_map(split_window).collect();
            depth_left -= 1;
        }

        Ok(rows)
    }
}

#[async_trait]
impl Source for PaywaySource {
    fn platform(&self) -> Platform {
        Platform::Payway
    }

    async fn fetch(&self, report: &Report) -> Result<PlatformBatch> {
        let mut by_operation: HashMap<String, PaywayTransaction> = HashMap::new();
        let mut failed_days = Vec::new();

        let mut day = report.start_date;
        while day <= report.end_date {
            match self.fetch_day(day).await {
                Ok(rows) => {
                    for row in rows {
                        by_operation.insert(row.transaction_id.clone(), row);
                    }
                }
                Err(err) => {
                    warn!(%day, %err, "payway day failed, will retry");
                    failed_days.push(day);
                }
            }
            day = day.succ_opt().expect("date in range");
        }

        // One retry sweep; a day failing twice fails the report.
        for day in failed_days {
            for row in self.fetch_day(day).await? {
                by_operation.insert(row.transaction_id.clone(), row);
            }
        }

        let mut rows: Vec<PaywayTransaction> = by_operation.into_values().collect();
        rows.sort_by(|a, b| a.occurred_at.cmp(&b.occurred_at));

        info!(report_id = %report.id, rows = rows.len(), "payway acquisition finished");
        Ok(PlatformBatch::Payway(rows))
    }
}

type LocalWindow = (NaiveDateTime, NaiveDateTime);

fn day_window(day: NaiveDate) -> LocalWindow {
    (
        day.and_time(NaiveTime::MIN),
        day.and_hms_opt(23, 59, 59).expect("valid time"),
    )
}

fn split_window((from, to): LocalWindow) -> [LocalWindow; 2] {
    let mid = from + (to - from) / 2;
    [(from, mid), (mid, to)]
}

/// Parse a tab-separated gateway export. Header names arrive with stray
/// whitespace; every field is trimmed. Unknown columns are ignored, missing
/// required columns fail the parse.
pub fn parse_export(content: &str) -> Result<Vec<PaywayTransaction>> {
    let mut lines = content.lines();
    let header_line = lines
        .next()
        .ok_or_else(|| Error::ExportParse("empty export".to_string()))?;

    let headers: Vec<&str> = header_line.split('\t').map(str::trim).collect();
    let column = |name: &str| -> Result<usize> {
        headers
            .iter()
            .position(|h| *h == name)
            .ok_or_else(|| Error::ExportParse(format!("missing column {name:?}")).into())
    };
    let op_idx = column(COL_OPERATION)?;
    let date_idx = column(COL_DATE)?;
    let amount_idx = column(COL_AMOUNT)?;
    let status_idx = column(COL_STATUS)?;
    let card_idx = column(COL_CARD)?;

    let mut rows = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
        let field = |idx: usize| fields.get(idx).copied().unwrap_or_default();

        let transaction_id = field(op_idx).to_string();
        if transaction_id.is_empty() {
            continue;
        }
        rows.push(PaywayTransaction {
            transaction_id,
            occurred_at: parse_local_datetime(field(date_idx))?,
            amount_cents: parse_amount_cents(field(amount_idx))?,
            status: field(status_idx).to_string(),
            card: field(card_idx).to_string(),
        });
    }
    Ok(rows)
}

/// `DD/MM/YYYY HH:MM[:SS]` in Argentina local time.
fn parse_local_datetime(raw: &str) -> Result<chrono::DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(raw, "%d/%m/%Y %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%d/%m/%Y %H:%M"))
        .map_err(|_| Error::ExportParse(format!("bad datetime {raw:?}")))?;
    match argentina_offset().from_local_datetime(&naive).single() {
        Some(local) => Ok(local.with_timezone(&Utc)),
        None => Err(Error::ExportParse(format!("ambiguous datetime {raw:?}")).into()),
    }
}

/// `1.234,56` style amounts, dots for thousands and a comma decimal.
fn parse_amount_cents(raw: &str) -> Result<i64> {
    let normalized = raw.replace('.', "").replace(',', ".");
    let value: f64 = normalized
        .parse()
        .map_err(|_| Error::ExportParse(format!("bad amount {raw:?}")))?;
    Ok((value * 100.0).round() as i64)
}
