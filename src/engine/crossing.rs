//! The crossing pass: join the four platforms' rows by normalized ids.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::engine::normalize::{cdp_key, payway_key, split_key};
use crate::engine::outcome::review_outcome;
use crate::types::{
    CdpTransaction, CrossedTransaction, JanisTransaction, MatchStats, PaywayTransaction,
    VtexTransaction,
};

pub struct CrossingOutput {
    pub rows: Vec<CrossedTransaction>,
    pub stats: MatchStats,
}

const NOT_AVAILABLE: &str = "N/A";

/// Join transactions across platforms. VTEX drives the pass: every VTEX order
/// produces exactly one output row; rows on other platforms that never match
/// a VTEX order are left out, as the operators reconcile from the storefront
/// side. Map lookups mean first-match-wins and duplicate source ids collapse
/// to the last record ingested.
pub fn cross_transactions(
    vtex: &[VtexTransaction],
    payway: &[PaywayTransaction],
    cdp: &[CdpTransaction],
    janis: &[JanisTransaction],
) -> CrossingOutput {
    let vtex_by_order: HashMap<&str, &VtexTransaction> =
        vtex.iter().map(|t| (t.order_id.as_str(), t)).collect();
    let payway_by_tx: HashMap<&str, &PaywayTransaction> =
        payway.iter().map(|t| (t.transaction_id.as_str(), t)).collect();
    let cdp_by_order: HashMap<&str, &CdpTransaction> =
        cdp.iter().map(|t| (t.order_id.as_str(), t)).collect();
    let janis_by_order: HashMap<&str, &JanisTransaction> =
        janis.iter().map(|t| (t.order_id.as_str(), t)).collect();

    debug!(
        vtex = vtex_by_order.len(),
        payway = payway_by_tx.len(),
        cdp = cdp_by_order.len(),
        janis = janis_by_order.len(),
        "crossing index built"
    );

    let mut rows = Vec::with_capacity(vtex_by_order.len());
    let mut stats = MatchStats::default();

    for (order_id, vtex_tx) in &vtex_by_order {
        let cdp_tx = cdp_by_order.get(cdp_key(order_id)).copied();
        let janis_tx = janis_by_order.get(*order_id).copied();

        // Gateway match: derive the key from the order id; if the derived key
        // is absent, fall back to the transaction id VTEX itself recorded.
        // Either way, also look up the -2 record of a split payment.
        let mut payway_tx: Option<&PaywayTransaction> = None;
        let mut payway_tx_2: Option<&PaywayTransaction> = None;
        let candidate_keys = [
            payway_key(order_id),
            Some(vtex_tx.transaction_id.clone()),
        ];
        for key in candidate_keys.into_iter().flatten() {
            if let Some(found) = payway_by_tx.get(key.as_str()).copied() {
                payway_tx = Some(found);
                let second = split_key(&key);
                if second != key {
                    payway_tx_2 = payway_by_tx.get(second.as_str()).copied();
                }
                break;
            }
        }

        if payway_tx.is_some() {
            stats.payway_matches += 1;
        }
        if cdp_tx.is_some() {
            stats.cdp_matches += 1;
        }
        if janis_tx.is_some() {
            stats.janis_matches += 1;
        }

        let review = review_outcome(Some(vtex_tx), payway_tx, cdp_tx, janis_tx);
        if !review.is_empty() {
            stats.flagged += 1;
        }

        rows.push(CrossedTransaction {
            order_id: (*order_id).to_string(),
            occurred_at: Some(vtex_tx.occurred_at),
            delivered_at: janis_tx.and_then(|j| j.delivered_at),
            payment_method: vtex_tx.payment_method.clone(),
            seller: vtex_tx.seller.clone(),
            vtex_status: vtex_tx.status.clone(),
            payway_status: status_or_na(payway_tx.map(|t| t.status.as_str())),
            payway_status_2: status_or_na(payway_tx_2.map(|t| t.status.as_str())),
            cdp_status: status_or_na(cdp_tx.map(|t| t.status.as_str())),
            janis_status: status_or_na(janis_tx.map(|t| t.status.as_str())),
            review,
        });
    }

    stats.total = rows.len();
    info!(
        total = stats.total,
        payway_matches = stats.payway_matches,
        cdp_matches = stats.cdp_matches,
        janis_matches = stats.janis_matches,
        flagged = stats.flagged,
        payway_rate = format!("{:.1}%", stats.match_rate(stats.payway_matches)),
        "crossing pass finished"
    );

    CrossingOutput { rows, stats }
}

fn status_or_na(status: Option<&str>) -> String {
    status.unwrap_or(NOT_AVAILABLE).to_string()
}
