//! # Reporting Rollup
//!
//! Read-only financial aggregation across invoices in a date range.
//!
//! ## Two Paths Per Invoice
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  LINE PATH (per-line data exists)                               │
//! │    gross = Σ line_revenue − returns at frozen sell rates        │
//! │    cost  = Σ line_cost    − returns at frozen cost snapshots    │
//! │    discount/commission from header policy (pct-of-gross/fixed)  │
//! │    netSales = max(0, gross − discount − commission)             │
//! │                                                                 │
//! │  HEADER FALLBACK (legacy/partial records, no lines)             │
//! │    governed by GrossReconstructionPolicy:                       │
//! │      AssumeStoredTotalIsNet:   net = total                      │
//! │                                gross = total + disc + comm      │
//! │      AssumeStoredTotalIsGross: gross = total                    │
//! │                                net = max(0, gross − disc − comm)│
//! │    cost = 0 (no safe way to reconstruct it without lines)       │
//! │                                                                 │
//! │  profit = netSales − cost                                       │
//! │  margin = netSales > 0 ? profit/netSales × 100 : 0              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Daily aggregation sums each field and recomputes margin from the
//! summed fields — never by averaging daily margins.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::GrossReconstructionPolicy;
use crate::money::{non_negative, pct_of, round_amount};
use crate::types::{DiscountKind, Invoice, ReturnLine, SaleLine};

// =============================================================================
// Invoice Financials
// =============================================================================

/// Financial figures for one invoice.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct InvoiceFinancials {
    pub gross: f64,
    pub discount: f64,
    pub commission: f64,
    pub net_sales: f64,
    pub cost: f64,
    pub profit: f64,
    pub margin: f64,
}

/// Computes the financial figures for one invoice.
///
/// `commission_percent` is the already-resolved percent for the
/// invoice (override or default); returns are matched to their sale
/// line so revenue and cost shrink proportionally at the line's frozen
/// rates.
pub fn invoice_financials(
    invoice: &Invoice,
    lines: &[SaleLine],
    returns: &[ReturnLine],
    commission_percent: f64,
    policy: GrossReconstructionPolicy,
) -> InvoiceFinancials {
    let (gross, discount, commission, net_sales, cost) = if !lines.is_empty() {
        let mut gross: f64 = lines.iter().map(|l| l.line_revenue).sum();
        let mut cost: f64 = lines.iter().map(|l| l.line_cost).sum();

        // Net out returns against their original lines' frozen rates.
        let by_id: HashMap<&str, &SaleLine> =
            lines.iter().map(|l| (l.id.as_str(), l)).collect();
        for ret in returns {
            if let Some(line) = by_id.get(ret.sale_line_id.as_str()) {
                gross -= ret.quantity * line.sell_rate_per_unit;
                cost -= ret.quantity * line.unit_cost_snapshot;
            }
        }
        gross = non_negative(gross);
        cost = non_negative(cost);

        let discount = match invoice.discount_kind {
            DiscountKind::Percent => pct_of(gross, invoice.discount_value),
            DiscountKind::Amount => invoice.discount_value,
        };
        let commission = pct_of(gross, commission_percent);
        let net_sales = non_negative(gross - discount - commission);
        (gross, discount, commission, net_sales, cost)
    } else {
        // Header fallback: only the stored total is trustworthy.
        let total = invoice.total;
        let discount = match invoice.discount_kind {
            DiscountKind::Percent => pct_of(total, invoice.discount_value),
            DiscountKind::Amount => invoice.discount_value,
        };
        let commission = pct_of(total, commission_percent);
        let (gross, net_sales) = match policy {
            GrossReconstructionPolicy::AssumeStoredTotalIsNet => {
                (total + discount + commission, total)
            }
            GrossReconstructionPolicy::AssumeStoredTotalIsGross => {
                (total, non_negative(total - discount - commission))
            }
        };
        (gross, discount, commission, net_sales, 0.0)
    };

    let profit = net_sales - cost;
    let margin = if net_sales > 0.0 {
        profit / net_sales * 100.0
    } else {
        0.0
    };

    InvoiceFinancials {
        gross: round_amount(gross),
        discount: round_amount(discount),
        commission: round_amount(commission),
        net_sales: round_amount(net_sales),
        cost: round_amount(cost),
        profit: round_amount(profit),
        margin,
    }
}

// =============================================================================
// Daily Rollup
// =============================================================================

/// One day of aggregated figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRollupRow {
    pub date: NaiveDate,
    pub invoices: u32,
    pub gross: f64,
    pub discount: f64,
    pub commission: f64,
    pub net_sales: f64,
    pub cost: f64,
    pub profit: f64,
    pub margin: f64,
}

/// Buckets per-invoice financials by day, summing each field and
/// recomputing the margin from the summed fields.
pub fn daily_rollup(
    entries: impl IntoIterator<Item = (NaiveDate, InvoiceFinancials)>,
) -> Vec<DailyRollupRow> {
    let mut by_day: BTreeMap<NaiveDate, DailyRollupRow> = BTreeMap::new();

    for (date, fin) in entries {
        let row = by_day.entry(date).or_insert_with(|| DailyRollupRow {
            date,
            invoices: 0,
            gross: 0.0,
            discount: 0.0,
            commission: 0.0,
            net_sales: 0.0,
            cost: 0.0,
            profit: 0.0,
            margin: 0.0,
        });
        row.invoices += 1;
        row.gross += fin.gross;
        row.discount += fin.discount;
        row.commission += fin.commission;
        row.net_sales += fin.net_sales;
        row.cost += fin.cost;
        row.profit += fin.profit;
    }

    let mut rows: Vec<DailyRollupRow> = by_day.into_values().collect();
    for row in &mut rows {
        row.margin = if row.net_sales > 0.0 {
            row.profit / row.net_sales * 100.0
        } else {
            0.0
        };
    }
    rows
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaxMode;
    use chrono::{TimeZone, Utc};

    fn invoice(discount_kind: DiscountKind, discount_value: f64, total: f64) -> Invoice {
        Invoice {
            id: "inv1".into(),
            invoice_no: "INV260101".into(),
            invoice_date: NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(),
            customer_name: None,
            phone: None,
            notes: None,
            salesperson: None,
            commission_percent_override: None,
            discount_kind,
            discount_value,
            tax_mode: TaxMode::Inclusive,
            tax_percent: 0.0,
            subtotal: total,
            discount_amount: 0.0,
            tax_amount: 0.0,
            total,
            voided: false,
            created_at: Utc.with_ymd_and_hms(2026, 1, 10, 9, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2026, 1, 10, 9, 0, 0).unwrap(),
        }
    }

    fn line(id: &str, qty: f64, rate: f64, snapshot: f64) -> SaleLine {
        SaleLine {
            id: id.into(),
            invoice_id: "inv1".into(),
            item_id: "item1".into(),
            purpose: None,
            length: 0.0,
            width: 0.0,
            area_adjustment: 0.0,
            quantity: qty,
            sell_rate_per_unit: rate,
            line_revenue: qty * rate,
            unit_cost_snapshot: snapshot,
            line_cost: qty * snapshot,
            created_at: Utc.with_ymd_and_hms(2026, 1, 10, 9, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2026, 1, 10, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_line_path() {
        let inv = invoice(DiscountKind::Percent, 10.0, 0.0);
        let lines = vec![line("a", 10.0, 60.0, 40.0), line("b", 10.0, 40.0, 25.0)];
        let fin = invoice_financials(
            &inv,
            &lines,
            &[],
            5.0,
            GrossReconstructionPolicy::AssumeStoredTotalIsNet,
        );
        assert_eq!(fin.gross, 1000.0);
        assert_eq!(fin.discount, 100.0);
        assert_eq!(fin.commission, 50.0);
        assert_eq!(fin.net_sales, 850.0);
        assert_eq!(fin.cost, 650.0);
        assert_eq!(fin.profit, 200.0);
        assert!((fin.margin - 200.0 / 850.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_returns_reduce_revenue_and_cost() {
        let inv = invoice(DiscountKind::Amount, 0.0, 0.0);
        let lines = vec![line("a", 10.0, 60.0, 40.0)];
        let returns = vec![ReturnLine {
            id: "r1".into(),
            sale_line_id: "a".into(),
            invoice_id: "inv1".into(),
            item_id: "item1".into(),
            quantity: 2.0,
            return_date: NaiveDate::from_ymd_opt(2026, 1, 12).unwrap(),
            created_at: Utc.with_ymd_and_hms(2026, 1, 12, 9, 0, 0).unwrap(),
        }];
        let fin = invoice_financials(
            &inv,
            &lines,
            &returns,
            0.0,
            GrossReconstructionPolicy::AssumeStoredTotalIsNet,
        );
        // 600 - 2*60 = 480 gross; 400 - 2*40 = 320 cost
        assert_eq!(fin.gross, 480.0);
        assert_eq!(fin.cost, 320.0);
        assert_eq!(fin.profit, 160.0);
    }

    #[test]
    fn test_fallback_total_is_net() {
        let inv = invoice(DiscountKind::Amount, 100.0, 900.0);
        let fin = invoice_financials(
            &inv,
            &[],
            &[],
            5.0,
            GrossReconstructionPolicy::AssumeStoredTotalIsNet,
        );
        // net = 900; commission = 45; gross reconstructed = 900+100+45
        assert_eq!(fin.net_sales, 900.0);
        assert_eq!(fin.commission, 45.0);
        assert_eq!(fin.gross, 1045.0);
        assert_eq!(fin.cost, 0.0);
    }

    #[test]
    fn test_fallback_total_is_gross() {
        let inv = invoice(DiscountKind::Amount, 100.0, 900.0);
        let fin = invoice_financials(
            &inv,
            &[],
            &[],
            5.0,
            GrossReconstructionPolicy::AssumeStoredTotalIsGross,
        );
        assert_eq!(fin.gross, 900.0);
        assert_eq!(fin.net_sales, 900.0 - 100.0 - 45.0);
    }

    #[test]
    fn test_daily_rollup_sums_and_recomputes_margin() {
        let d1 = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2026, 1, 11).unwrap();
        let fin = |net: f64, profit: f64| InvoiceFinancials {
            gross: net,
            discount: 0.0,
            commission: 0.0,
            net_sales: net,
            cost: net - profit,
            profit,
            margin: profit / net * 100.0,
        };

        let rows = daily_rollup(vec![
            (d1, fin(1000.0, 100.0)),
            (d1, fin(500.0, 200.0)),
            (d2, fin(300.0, 30.0)),
        ]);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, d1);
        assert_eq!(rows[0].invoices, 2);
        assert_eq!(rows[0].net_sales, 1500.0);
        assert_eq!(rows[0].profit, 300.0);
        // Margin from summed fields (20%), NOT the average of 10% and 40%.
        assert!((rows[0].margin - 20.0).abs() < 1e-9);
        assert_eq!(rows[1].invoices, 1);
    }

    /// Daily aggregation must equal independently summed per-invoice
    /// figures — no double counting.
    #[test]
    fn test_rollup_consistency() {
        let d = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        let inv = invoice(DiscountKind::Percent, 5.0, 0.0);
        let fins: Vec<InvoiceFinancials> = (1..=4)
            .map(|i| {
                let lines = vec![line("a", i as f64, 100.0, 60.0)];
                invoice_financials(
                    &inv,
                    &lines,
                    &[],
                    2.0,
                    GrossReconstructionPolicy::AssumeStoredTotalIsNet,
                )
            })
            .collect();

        let expected_net: f64 = fins.iter().map(|f| f.net_sales).sum();
        let expected_profit: f64 = fins.iter().map(|f| f.profit).sum();

        let rows = daily_rollup(fins.into_iter().map(|f| (d, f)));
        assert_eq!(rows.len(), 1);
        assert!((rows[0].net_sales - expected_net).abs() < 1e-9);
        assert!((rows[0].profit - expected_profit).abs() < 1e-9);
    }
}
