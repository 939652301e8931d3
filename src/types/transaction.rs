use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Platform;

/// Seller names that mark an order as belonging to the food business.
const FOOD_KEYWORDS: [&str; 6] = ["carrefour", "hiper", "maxi", "market", "express", "trelew"];

const ELECTRO_SELLER: &str = "Hogar & Electro";

/// Payway states that mean the money was never captured.
const PAYWAY_UNCOLLECTED: [&str; 2] = ["Pre autorizada", "Vencida"];

/// CDP states that count as "the order reached the customer" (or is past the
/// point of no return). Compared case-insensitively; the export is not
/// consistent about casing.
const CDP_DELIVERED: [&str; 7] = [
    "finalizado",
    "disponible en drive",
    "disponible en sucursal",
    "disponible en sede",
    "pendiente de despacho",
    "pendiente de de envio a pup",
    "recepcion pendiente",
];

/// Janis states that count as delivered or in terminal delivery flow.
const JANIS_DELIVERED: [&str; 6] = [
    "delivered",
    "inDelivery",
    "readyForDelivery",
    "readyForInternalDistribution",
    "en auditoria",
    "procesandoPromociones",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VtexTransaction {
    pub order_id: String,
    pub transaction_id: String,
    pub occurred_at: DateTime<Utc>,
    pub payment_method: String,
    pub seller: String,
    pub status: String,
    /// Order total in cents; the API reports it that way.
    pub total_cents: Option<i64>,
}

impl VtexTransaction {
    pub fn is_electro(&self) -> bool {
        self.seller == ELECTRO_SELLER
    }

    pub fn is_food(&self) -> bool {
        let seller = self.seller.to_lowercase();
        FOOD_KEYWORDS.iter().any(|kw| seller.contains(kw))
    }

    pub fn is_marketplace(&self) -> bool {
        !self.is_electro() && !self.is_food()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaywayTransaction {
    pub transaction_id: String,
    pub occurred_at: DateTime<Utc>,
    pub amount_cents: i64,
    pub status: String,
    pub card: String,
}

impl PaywayTransaction {
    pub fn is_uncollected(&self) -> bool {
        PAYWAY_UNCOLLECTED.iter().any(|kw| self.status.contains(kw))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdpTransaction {
    pub order_id: String,
    pub occurred_at: DateTime<Utc>,
    pub store_number: i64,
    pub status: String,
}

impl CdpTransaction {
    pub fn is_delivered(&self) -> bool {
        let status = self.status.to_lowercase();
        CDP_DELIVERED.iter().any(|kw| status.contains(kw))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JanisTransaction {
    pub order_id: String,
    pub transaction_id: String,
    pub occurred_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub payment_method: String,
    pub seller: String,
    pub status: String,
}

impl JanisTransaction {
    pub fn is_delivered(&self) -> bool {
        JANIS_DELIVERED.iter().any(|kw| self.status.contains(kw))
    }
}

/// The rows a report run produced, tagged with their platform. Exactly one
/// variant per [`Platform`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PlatformBatch {
    Vtex(Vec<VtexTransaction>),
    Payway(Vec<PaywayTransaction>),
    Cdp(Vec<CdpTransaction>),
    Janis(Vec<JanisTransaction>),
}

impl PlatformBatch {
    pub fn platform(&self) -> Platform {
        match self {
            PlatformBatch::Vtex(_) => Platform::Vtex,
            PlatformBatch::Payway(_) => Platform::Payway,
            PlatformBatch::Cdp(_) => Platform::Cdp,
            PlatformBatch::Janis(_) => Platform::Janis,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PlatformBatch::Vtex(rows) => rows.len(),
            PlatformBatch::Payway(rows) => rows.len(),
            PlatformBatch::Cdp(rows) => rows.len(),
            PlatformBatch::Janis(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vtex(seller: &str) -> VtexTransaction {
        VtexTransaction {
            order_id: "1404930428916-01".to_string(),
            transaction_id: "1404930428916-1".to_string(),
            occurred_at: Utc::now(),
            payment_method: "Visa".to_string(),
            seller: seller.to_string(),
            status: "Faturado".to_string(),
            total_cents: Some(125000),
        }
    }

    #[test]
    fn electro_seller_is_exact_match() {
        assert!(vtex("Hogar & Electro").is_electro());
        assert!(!vtex("hogar & electro").is_electro());
    }

    #[test]
    fn food_keywords_match_case_insensitively() {
        assert!(vtex("Carrefour Hiper San Isidro").is_food());
        assert!(vtex("MAXI La Plata").is_food());
        assert!(vtex("Express Palermo").is_food());
        assert!(!vtex("Samsung Oficial").is_food());
    }

    #[test]
    fn marketplace_is_neither_food_nor_electro() {
        assert!(vtex("Samsung Oficial").is_marketplace());
        assert!(!vtex("Hogar & Electro").is_marketplace());
        assert!(!vtex("Market Caballito").is_marketplace());
    }

    #[test]
    fn payway_uncollected_states() {
        let mut tx = PaywayTransaction {
            transaction_id: "1404930428916-1".to_string(),
            occurred_at: Utc::now(),
            amount_cents: 125000,
            status: "Pre autorizada".to_string(),
            card: "Visa".to_string(),
        };
        assert!(tx.is_uncollected());
        tx.status = "Vencida".to_string();
        assert!(tx.is_uncollected());
        tx.status = "Aprobada".to_string();
        assert!(!tx.is_uncollected());
    }

    #[test]
    fn cdp_delivered_ignores_case() {
        let tx = CdpTransaction {
            order_id: "1404930428916".to_string(),
            occurred_at: Utc::now(),
            store_number: 14,
            status: "FINALIZADO".to_string(),
        };
        assert!(tx.is_delivered());
    }

    #[test]
    fn janis_delivered_matches_substring() {
        let mut tx = JanisTransaction {
            order_id: "1404930428916-01".to_string(),
            transaction_id: "553124".to_string(),
            occurred_at: Utc::now(),
            delivered_at: None,
            payment_method: "MercadoPagoPro".to_string(),
            seller: "Carrefour Hiper".to_string(),
            status: "readyForDelivery".to_string(),
        };
        assert!(tx.is_delivered());
        tx.status = "canceled".to_string();
        assert!(!tx.is_delivered());
    }
}
