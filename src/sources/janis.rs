//! Janis OMS acquisition. Pagination is header-driven: the page number goes
//! in a request header and the sweep stops at the first empty page. The HTTP
//! transport sits behind [`JanisApi`] so the sweep can run against scripted
//! pages in tests.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

use crate::sources::{range_to_utc, Source};
use crate::types::{JanisTransaction, Platform, PlatformBatch, Report};
use crate::{Config, Error};

/// Transport seam: one page of orders for a UTC window.
#[async_trait]
pub trait JanisApi: Send + Sync {
    async fn list_page(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        page: u32,
    ) -> Result<Vec<JanisOrder>>;
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JanisOrder {
    commerce_id: String,
    #[serde(default)]
    commerce_sequential_id: String,
    commerce_date_created: DateTime<Utc>,
    #[serde(default)]
    delivered_date: Option<DateTime<Utc>>,
    #[serde(default)]
    payments: Vec<JanisPayment>,
    #[serde(default)]
    seller: Option<JanisSeller>,
    status: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JanisPayment {
    #[serde(default)]
    payment_system_name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct JanisSeller {
    #[serde(default)]
    name: String,
}

pub struct JanisHttpApi {
    base_url: String,
    client_id: String,
    client_secret: String,
    client: reqwest::Client,
}

impl JanisHttpApi {
    pub fn new(base_url: String, client_id: String, client_secret: String) -> Self {
        Self {
            base_url,
            client_id,
            client_secret,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, Error> {
        Ok(Self::new(
            Config::require(&config.janis_base_url, "JANIS_BASE_URL")?,
            Config::require(&config.janis_client_id, "JANIS_CLIENT_ID")?,
            Config::require(&config.janis_client_secret, "JANIS_CLIENT_SECRET")?,
        ))
    }
}

#[async_trait]
impl JanisApi for JanisHttpApi {
    async fn list_page(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        page: u32,
    ) -> Result<Vec<JanisOrder>> {
        let range = format!("{},{}", from.to_rfc3339(), to.to_rfc3339());
        let response = self
            .client
            .get(format!("{}/oms/order", self.base_url))
            .header("client-id", &self.client_id)
            .header("client-secret", &self.client_secret)
            .header("x-janis-page", page.to_string())
            .query(&[("filters[commerceDateCreatedRange]", range.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await?;
            return Err(Error::source(Platform::Janis, format!("list {status}: {body}")).into());
        }

        Ok(response.json().await?)
    }
}

pub struct JanisSource {
    api: Arc<dyn JanisApi>,
}

impl JanisSource {
    pub fn new(api: Arc<dyn JanisApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Source for JanisSource {
    fn platform(&self) -> Platform {
        Platform::Janis
    }

    async fn fetch(&self, report: &Report) -> Result<PlatformBatch> {
        let (from, to) = range_to_utc(report.start_date, report.end_date);
        let mut by_order: HashMap<String, JanisTransaction> = HashMap::new();

        let mut page = 1;
        loop {
            let orders = self.api.list_page(from, to, page).await?;
            if orders.is_empty() {
                break;
            }
            for order in orders {
                let tx = order_to_transaction(order);
                by_order.insert(tx.order_id.clone(), tx);
            }
            page += 1;
        }

        let mut rows: Vec<JanisTransaction> = by_order.into_values().collect();
        rows.sort_by(|a, b| a.occurred_at.cmp(&b.occurred_at));

        info!(report_id = %report.id, rows = rows.len(), "janis acquisition finished");
        Ok(PlatformBatch::Janis(rows))
    }
}

fn order_to_transaction(order: JanisOrder) -> JanisTransaction {
    JanisTransaction {
        order_id: order.commerce_id,
        transaction_id: order.commerce_sequential_id,
        occurred_at: order.commerce_date_created,
        delivered_at: order.delivered_date,
        payment_method: order
            .payments
            .first()
            .map(|p| p.payment_system_name.clone())
            .unwrap_or_default(),
        seller: order.seller.map(|s| s.name).unwrap_or_default(),
        status: order.status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::Mutex;

    fn order(commerce_id: &str) -> JanisOrder {
        serde_json::from_value(serde_json::json!({
            "commerceId": commerce_id,
            "commerceDateCreated": "2024-12-01T13:15:00Z",
            "status": "delivered"
        }))
        .unwrap()
    }

    #[test]
    fn maps_first_payment_and_seller_name() {
        let order: JanisOrder = serde_json::from_value(serde_json::json!({
            "commerceId": "1404930428916-01",
            "commerceSequentialId": "553124",
            "commerceDateCreated": "2024-12-05T13:15:00Z",
            "payments": [
                {"paymentSystemName": "Visa"},
                {"paymentSystemName": "Mastercard"}
            ],
            "seller": {"name": "Carrefour Hiper"},
            "status": "delivered"
        }))
        .unwrap();

        let tx = order_to_transaction(order);
        assert_eq!(tx.order_id, "1404930428916-01");
        assert_eq!(tx.transaction_id, "553124");
        assert_eq!(tx.payment_method, "Visa");
        assert_eq!(tx.seller, "Carrefour Hiper");
        assert!(tx.delivered_at.is_none());
    }

    #[test]
    fn tolerates_missing_payments_and_seller() {
        let order: JanisOrder = serde_json::from_value(serde_json::json!({
            "commerceId": "9-01",
            "commerceDateCreated": "2024-12-05T13:15:00Z",
            "status": "pending"
        }))
        .unwrap();

        let tx = order_to_transaction(order);
        assert_eq!(tx.payment_method, "");
        assert_eq!(tx.seller, "");
        assert_eq!(tx.transaction_id, "");
    }

    struct ScriptedApi {
        pages: Mutex<Vec<Vec<JanisOrder>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedApi {
        fn new(pages: Vec<Vec<JanisOrder>>) -> Self {
            Self {
                pages: Mutex::new(pages),
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl JanisApi for ScriptedApi {
        async fn list_page(
            &self,
            _from: DateTime<Utc>,
            _to: DateTime<Utc>,
            page: u32,
        ) -> Result<Vec<JanisOrder>> {
            *self.calls.lock().unwrap() += 1;
            let pages = self.pages.lock().unwrap();
            pages
                .get(page as usize - 1)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("unscripted page {page}"))
        }
    }

    fn report() -> Report {
        let day = NaiveDate::from_ymd_opt(2024, 12, 1).unwrap();
        Report::new(Platform::Janis, day, day)
    }

    #[tokio::test]
    async fn sweep_stops_at_the_first_empty_page() {
        let api = Arc::new(ScriptedApi::new(vec![
            vec![order("a-01"), order("b-01")],
            vec![order("c-01")],
            vec![],
        ]));

        let batch = JanisSource::new(api.clone()).fetch(&report()).await.unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(*api.calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn orders_repeated_across_pages_are_deduped() {
        let api = Arc::new(ScriptedApi::new(vec![
            vec![order("a-01"), order("b-01")],
            vec![order("b-01"), order("c-01")],
            vec![],
        ]));

        let batch = JanisSource::new(api).fetch(&report()).await.unwrap();
        assert_eq!(batch.len(), 3);
    }
}
