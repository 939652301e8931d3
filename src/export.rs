//! CSV rendering for operator downloads. Timestamps leave the system in
//! Argentina local time; everything is stored in UTC.

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::sources::argentina_offset;
use crate::types::{CrossedTransaction, PlatformBatch};

pub fn report_csv(batch: &PlatformBatch) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    match batch {
        PlatformBatch::Vtex(rows) => {
            writer.write_record([
                "order_id",
                "transaction_id",
                "date",
                "payment_method",
                "seller",
                "status",
                "total",
            ])?;
            for t in rows {
                writer.write_record([
                    t.order_id.as_str(),
                    t.transaction_id.as_str(),
                    &local(t.occurred_at),
                    t.payment_method.as_str(),
                    t.seller.as_str(),
                    t.status.as_str(),
                    &t.total_cents.map(format_amount).unwrap_or_default(),
                ])?;
            }
        }
        PlatformBatch::Payway(rows) => {
            writer.write_record(["transaction_id", "date", "amount", "status", "card"])?;
            for t in rows {
                writer.write_record([
                    t.transaction_id.as_str(),
                    &local(t.occurred_at),
                    &format_amount(t.amount_cents),
                    t.status.as_str(),
                    t.card.as_str(),
                ])?;
            }
        }
        PlatformBatch::Cdp(rows) => {
            writer.write_record(["order_id", "date", "store", "status"])?;
            for t in rows {
                writer.write_record([
                    t.order_id.as_str(),
                    &local(t.occurred_at),
                    &t.store_number.to_string(),
                    t.status.as_str(),
                ])?;
            }
        }
        PlatformBatch::Janis(rows) => {
            writer.write_record([
                "order_id",
                "transaction_id",
                "date",
                "delivered",
                "payment_method",
                "seller",
                "status",
            ])?;
            for t in rows {
                writer.write_record([
                    t.order_id.as_str(),
                    t.transaction_id.as_str(),
                    &local(t.occurred_at),
                    &t.delivered_at.map(local).unwrap_or_default(),
                    t.payment_method.as_str(),
                    t.seller.as_str(),
                    t.status.as_str(),
                ])?;
            }
        }
    }

    Ok(String::from_utf8(writer.into_inner()?)?)
}

pub fn crossing_csv(rows: &[CrossedTransaction], observations_only: bool) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "order_id",
        "date",
        "delivered",
        "payment_method",
        "seller",
        "vtex_status",
        "payway_status",
        "payway_status_2",
        "cdp_status",
        "janis_status",
        "review",
    ])?;

    for t in rows {
        if observations_only && !t.needs_review() {
            continue;
        }
        writer.write_record([
            t.order_id.as_str(),
            &t.occurred_at.map(local).unwrap_or_default(),
            &t.delivered_at.map(local).unwrap_or_default(),
            t.payment_method.as_str(),
            t.seller.as_str(),
            t.vtex_status.as_str(),
            t.payway_status.as_str(),
            t.payway_status_2.as_str(),
            t.cdp_status.as_str(),
            t.janis_status.as_str(),
            t.review.as_str(),
        ])?;
    }

    Ok(String::from_utf8(writer.into_inner()?)?)
}

fn local(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&argentina_offset())
        .format("%d/%m/%Y %H:%M:%S")
        .to_string()
}

/// Cents to the comma-decimal format the source exports use. The sign is
/// carried separately; `-50 / 100` is zero and would otherwise swallow it.
fn format_amount(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.abs();
    format!("{sign}{},{:02}", cents / 100, cents % 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PaywayTransaction;
    use chrono::TimeZone;

    fn crossed(order: &str, review: &str) -> CrossedTransaction {
        CrossedTransaction {
            order_id: order.to_string(),
            occurred_at: None,
            delivered_at: None,
            payment_method: "Visa".to_string(),
            seller: "Carrefour Hiper".to_string(),
            vtex_status: "Faturado".to_string(),
            payway_status: "N/A".to_string(),
            payway_status_2: "N/A".to_string(),
            cdp_status: "N/A".to_string(),
            janis_status: "N/A".to_string(),
            review: review.to_string(),
        }
    }

    #[test]
    fn payway_batch_renders_local_time_and_comma_amounts() {
        let batch = PlatformBatch::Payway(vec![PaywayTransaction {
            transaction_id: "1404930428916-1".to_string(),
            occurred_at: Utc.with_ymd_and_hms(2024, 12, 5, 17, 30, 0).unwrap(),
            amount_cents: 125050,
            status: "Aprobada".to_string(),
            card: "Visa".to_string(),
        }]);
        let csv = report_csv(&batch).unwrap();
        assert!(csv.contains("05/12/2024 14:30:00"));
        assert!(csv.contains("1250,50"));
    }

    #[test]
    fn observations_only_drops_clean_rows() {
        let rows = vec![crossed("1-01", ""), crossed("2-01", "Cobrar manualmente")];
        let full = crossing_csv(&rows, false).unwrap();
        let flagged = crossing_csv(&rows, true).unwrap();
        assert_eq!(full.lines().count(), 3);
        assert_eq!(flagged.lines().count(), 2);
        assert!(flagged.contains("2-01"));
    }

    #[test]
    fn amounts_keep_two_decimal_places() {
        assert_eq!(format_amount(1000), "10,00");
        assert_eq!(format_amount(5), "0,05");
        assert_eq!(format_amount(125050), "1250,50");
    }

    #[test]
    fn refund_amounts_keep_their_sign() {
        assert_eq!(format_amount(-50), "-0,50");
        assert_eq!(format_amount(-125050), "-1250,50");
        assert_eq!(format_amount(-100), "-1,00");
    }
}
