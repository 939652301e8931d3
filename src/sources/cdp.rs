//! Fulfilment-center (CDP) export acquisition.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, TimeZone, Utc};
use tracing::info;

use crate::sources::{argentina_offset, Source};
use crate::types::{CdpTransaction, Platform, PlatformBatch, Report};
use crate::{Config, Error};

const COL_ORDER: &str = "NUMERO PEDIDO";
const COL_STORE: &str = "NUMERO DE PUNTO";
const COL_DATE: &str = "FECHA PEDIDO";
const COL_STATUS: &str = "ESTADO";

/// Transport seam for the raw CSV export of a date range.
#[async_trait]
pub trait CdpExportFetcher: Send + Sync {
    async fn fetch_export(&self, start: NaiveDate, end: NaiveDate) -> Result<String>;
}

pub struct CdpHttpFetcher {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl CdpHttpFetcher {
    pub fn new(base_url: String, token: String) -> Self {
        Self {
            base_url,
            token,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, Error> {
        Ok(Self::new(
            Config::require(&config.cdp_base_url, "CDP_BASE_URL")?,
            Config::require(&config.cdp_token, "CDP_TOKEN")?,
        ))
    }
}

#[async_trait]
impl CdpExportFetcher for CdpHttpFetcher {
    async fn fetch_export(&self, start: NaiveDate, end: NaiveDate) -> Result<String> {
        let response = self
            .client
            .get(format!("{}/orders/export", self.base_url))
            .bearer_auth(&self.token)
            .query(&[
                ("from", start.format("%d/%m/%Y").to_string()),
                ("to", end.format("%d/%m/%Y").to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await?;
            return Err(Error::source(Platform::Cdp, format!("export {status}: {body}")).into());
        }

        Ok(response.text().await?)
    }
}

pub struct CdpSource {
    fetcher: Arc<dyn CdpExportFetcher>,
}

impl CdpSource {
    pub fn new(fetcher: Arc<dyn CdpExportFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl Source for CdpSource {
    fn platform(&self) -> Platform {
        Platform::Cdp
    }

    async fn fetch(&self, report: &Report) -> Result<PlatformBatch> {
        let content = self
            .fetcher
            .fetch_export(report.start_date, report.end_date)
            .await?;
        let rows = parse_export(&content)?;
        info!(report_id = %report.id, rows = rows.len(), "cdp acquisition finished");
        Ok(PlatformBatch::Cdp(rows))
    }
}

pub fn parse_export(content: &str) -> Result<Vec<CdpTransaction>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| Error::ExportParse(format!("unreadable header: {e}")))?
        .clone();
    let column = |name: &str| -> Result<usize> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| Error::ExportParse(format!("missing column {name:?}")).into())
    };
    let order_idx = column(COL_ORDER)?;
    let store_idx = column(COL_STORE)?;
    let date_idx = column(COL_DATE)?;
    let status_idx = column(COL_STATUS)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| Error::ExportParse(format!("bad record: {e}")))?;
        let field = |idx: usize| record.get(idx).unwrap_or_default().trim();

        let order_id = field(order_idx).to_string();
        if order_id.is_empty() {
            continue;
        }
        rows.push(CdpTransaction {
            order_id,
            occurred_at: parse_local_datetime(field(date_idx))?,
            store_number: field(store_idx)
                .parse()
                .map_err(|_| Error::ExportParse(format!("bad store {:?}", field(store_idx))))?,
            status: field(status_idx).to_string(),
        });
    }
    Ok(rows)
}

fn parse_local_datetime(raw: &str) -> Result<chrono::DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(raw, "%d/%m/%Y %H:%M:%S")
        .map_err(|_| Error::ExportParse(format!("bad datetime {raw:?}")))?;
    match argentina_offset().from_local_datetime(&naive).single() {
        Some(local) => Ok(local.with_timezone(&Utc)),
        None => Err(Error::ExportParse(format!("ambiguous datetime {raw:?}")).into()),
    }
}
