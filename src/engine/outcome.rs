//! Review rules for a joined row.
//!
//! The returned strings are operator-facing and intentionally kept in the
//! wording the back-office team works with; downstream tooling filters on
//! them verbatim. VTEX statuses arrive in Portuguese ("Faturado",
//! "Pagamento Aprovado", "Verificando Fatura") because the platform runs the
//! Brazilian stack.

use crate::types::{CdpTransaction, JanisTransaction, PaywayTransaction, VtexTransaction};

const VTEX_INVOICED: &str = "Faturado";
const VTEX_PAYMENT_APPROVED: &str = "Pagamento Aprovado";
const VTEX_VERIFYING_INVOICE: &str = "Verificando Fatura";
const VTEX_CANCELLED: &str = "Cancelado";
const PAYWAY_PREAUTHORIZED: &str = "Pre autorizada";
const CDP_ANNULLED: &str = "Anulado sin factura";
const JANIS_CANCELLED: &str = "canceled";

/// Decide whether a joined row needs operator attention. Empty string means
/// the row is consistent across platforms.
pub fn review_outcome(
    vtex: Option<&VtexTransaction>,
    payway: Option<&PaywayTransaction>,
    cdp: Option<&CdpTransaction>,
    janis: Option<&JanisTransaction>,
) -> String {
    let Some(vtex) = vtex else {
        return String::new();
    };

    // Stuck in invoice verification: either the gateway holds a preauth the
    // operator can capture by hand, or the order never reached the gateway.
    if vtex.status == VTEX_VERIFYING_INVOICE {
        return if payway.is_some_and(|p| p.status == PAYWAY_PREAUTHORIZED) {
            "Cobrar manualmente desde Payway, estado verificando factura en vtex".to_string()
        } else {
            "Levantar ticket a WebCenter, pedido no existe en decidir".to_string()
        };
    }

    let delivered = cdp.is_some_and(|c| c.is_delivered()) || janis.is_some_and(|j| j.is_delivered());
    let annulled = cdp.is_some_and(|c| c.status == CDP_ANNULLED)
        || janis.is_some_and(|j| j.status == JANIS_CANCELLED);
    let uncollected = payway.is_some_and(|p| p.is_uncollected());

    let mercadopago_food = vtex.payment_method.contains("MercadoPagoPro")
        && !(vtex.is_electro() || vtex.is_marketplace());

    if mercadopago_food {
        // MercadoPago collects on its own; only the fulfilment side can drift.
        if delivered {
            if vtex.status != VTEX_INVOICED {
                return "Verificar, entregado pero no facturado".to_string();
            }
        } else if annulled && vtex.status == VTEX_PAYMENT_APPROVED {
            return "Verificar, anulado pero no cancelado en vtex".to_string();
        }
        String::new()
    } else if vtex.is_food() {
        if delivered {
            if vtex.status != VTEX_INVOICED {
                return "Verificar, entregado pero no facturado".to_string();
            }
            if uncollected {
                return "Verificar, no cobrado en Payway".to_string();
            }
        } else if annulled {
            if vtex.status == VTEX_PAYMENT_APPROVED {
                return "Verificar, anulado pero no cancelado en vtex".to_string();
            }
            if payway.is_some_and(|p| p.status == PAYWAY_PREAUTHORIZED) {
                return "Verificar, anulado pero preautorizado en payway".to_string();
            }
        }
        String::new()
    } else if vtex.is_electro() {
        if uncollected {
            "Verificar, no cobrado en Payway".to_string()
        } else if vtex.status != VTEX_INVOICED && vtex.status != VTEX_CANCELLED {
            "Verificar, no facturado".to_string()
        } else {
            String::new()
        }
    } else {
        // Marketplace: the seller invoices, we only chase them.
        if vtex.status != VTEX_INVOICED {
            "Avisar a marketplace".to_string()
        } else {
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn vtex(status: &str, payment: &str, seller: &str) -> VtexTransaction {
        VtexTransaction {
            order_id: "1404930428916-01".to_string(),
            transaction_id: "1404930428916-1".to_string(),
            occurred_at: Utc::now(),
            payment_method: payment.to_string(),
            seller: seller.to_string(),
            status: status.to_string(),
            total_cents: Some(100000),
        }
    }

    fn payway(status: &str) -> PaywayTransaction {
        PaywayTransaction {
            transaction_id: "1404930428916-1".to_string(),
            occurred_at: Utc::now(),
            amount_cents: 100000,
            status: status.to_string(),
            card: "Visa".to_string(),
        }
    }

    fn cdp(status: &str) -> CdpTransaction {
        CdpTransaction {
            order_id: "1404930428916".to_string(),
            occurred_at: Utc::now(),
            store_number: 14,
            status: status.to_string(),
        }
    }

    fn janis(status: &str) -> JanisTransaction {
        JanisTransaction {
            order_id: "1404930428916-01".to_string(),
            transaction_id: "553124".to_string(),
            occurred_at: Utc::now(),
            delivered_at: None,
            payment_method: "Visa".to_string(),
            seller: "Carrefour Hiper".to_string(),
            status: status.to_string(),
        }
    }

    #[test]
    fn missing_vtex_row_is_silent() {
        assert_eq!(review_outcome(None, None, None, None), "");
    }

    #[test]
    fn verifying_invoice_with_preauth_asks_for_manual_capture() {
        let v = vtex("Verificando Fatura", "Visa", "Carrefour Hiper");
        let p = payway("Pre autorizada");
        let outcome = review_outcome(Some(&v), Some(&p), None, None);
        assert!(outcome.contains("Cobrar manualmente"));
    }

    #[test]
    fn verifying_invoice_without_gateway_record_raises_ticket() {
        let v = vtex("Verificando Fatura", "Visa", "Carrefour Hiper");
        let outcome = review_outcome(Some(&v), None, None, None);
        assert!(outcome.contains("WebCenter"));
    }

    #[test]
    fn food_delivered_but_not_invoiced_cdp() {
        let v = vtex("Pendiente", "Visa", "Carrefour Hiper");
        let c = cdp("Finalizado");
        let outcome = review_outcome(Some(&v), None, Some(&c), None);
        assert_eq!(outcome, "Verificar, entregado pero no facturado");
    }

    #[test]
    fn food_delivered_but_not_invoiced_janis() {
        let v = vtex("Pendiente", "Visa", "Maxi Centro");
        let j = janis("delivered");
        let outcome = review_outcome(Some(&v), None, None, Some(&j));
        assert_eq!(outcome, "Verificar, entregado pero no facturado");
    }

    #[test]
    fn food_delivered_invoiced_but_uncollected() {
        let v = vtex("Faturado", "Visa", "Carrefour Express");
        let p = payway("Vencida");
        let c = cdp("Disponible en Drive");
        let outcome = review_outcome(Some(&v), Some(&p), Some(&c), None);
        assert_eq!(outcome, "Verificar, no cobrado en Payway");
    }

    #[test]
    fn food_annulled_but_payment_still_approved() {
        let v = vtex("Pagamento Aprovado", "Visa", "Carrefour Hiper");
        let c = cdp("Anulado sin factura");
        let outcome = review_outcome(Some(&v), None, Some(&c), None);
        assert_eq!(outcome, "Verificar, anulado pero no cancelado en vtex");
    }

    #[test]
    fn food_annulled_with_dangling_preauth() {
        let v = vtex("Cancelado", "Visa", "Carrefour Hiper");
        let p = payway("Pre autorizada");
        let j = janis("canceled");
        let outcome = review_outcome(Some(&v), Some(&p), None, Some(&j));
        assert_eq!(outcome, "Verificar, anulado pero preautorizado en payway");
    }

    #[test]
    fn food_consistent_row_is_silent() {
        let v = vtex("Faturado", "Visa", "Carrefour Hiper");
        let p = payway("Aprobada");
        let c = cdp("Finalizado");
        let outcome = review_outcome(Some(&v), Some(&p), Some(&c), None);
        assert_eq!(outcome, "");
    }

    #[test]
    fn mercadopago_food_skips_gateway_checks() {
        // Uncollected in Payway, but MercadoPago orders never collect there.
        let v = vtex("Faturado", "MercadoPagoPro", "Carrefour Hiper");
        let p = payway("Pre autorizada");
        let c = cdp("Finalizado");
        let outcome = review_outcome(Some(&v), Some(&p), Some(&c), None);
        assert_eq!(outcome, "");
    }

    #[test]
    fn mercadopago_food_still_checks_delivery() {
        let v = vtex("Pagamento Aprovado", "MercadoPagoPro", "Carrefour Hiper");
        let c = cdp("Finalizado");
        let outcome = review_outcome(Some(&v), None, Some(&c), None);
        assert_eq!(outcome, "Verificar, entregado pero no facturado");
    }

    #[test]
    fn electro_uncollected() {
        let v = vtex("Faturado", "Visa", "Hogar & Electro");
        let p = payway("Pre autorizada");
        let outcome = review_outcome(Some(&v), Some(&p), None, None);
        assert_eq!(outcome, "Verificar, no cobrado en Payway");
    }

    #[test]
    fn electro_not_invoiced_not_cancelled() {
        let v = vtex("Pendiente", "Visa", "Hogar & Electro");
        let p = payway("Aprobada");
        let outcome = review_outcome(Some(&v), Some(&p), None, None);
        assert_eq!(outcome, "Verificar, no facturado");
    }

    #[test]
    fn electro_cancelled_is_silent() {
        let v = vtex("Cancelado", "Visa", "Hogar & Electro");
        let outcome = review_outcome(Some(&v), None, None, None);
        assert_eq!(outcome, "");
    }

    #[test]
    fn marketplace_not_invoiced_notifies_seller() {
        let v = vtex("Pendiente", "Visa", "Samsung Oficial");
        let outcome = review_outcome(Some(&v), None, None, None);
        assert_eq!(outcome, "Avisar a marketplace");
    }

    #[test]
    fn marketplace_invoiced_is_silent() {
        let v = vtex("Faturado", "Visa", "Samsung Oficial");
        let outcome = review_outcome(Some(&v), None, None, None);
        assert_eq!(outcome, "");
    }
}
