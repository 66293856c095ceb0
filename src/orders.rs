//! Service-order numbering, totals and dashboard statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{OrderPriority, OrderStatus, ServiceOrder, ServiceOrderItem};

const FIRST_SEQUENCE: usize = 1001;

/// Next `OS-<year>-NNNN` number. The sequence is `1001 + count` of orders
/// already numbered in `year`, bumped past any number that is already taken
/// (deleting an order frees a slot in the count but not its number).
pub fn next_order_number(existing: &[ServiceOrder], year: i32) -> String {
    let prefix = format!("OS-{year}");
    let count = existing
        .iter()
        .filter(|o| o.number.starts_with(&prefix))
        .count();

    let mut seq = FIRST_SEQUENCE + count;
    loop {
        let number = format!("{prefix}-{seq:04}");
        if !existing.iter().any(|o| o.number == number) {
            return number;
        }
        seq += 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub subtotal: f64,
    pub discount: f64,
    pub discount_percent: f64,
    pub total: f64,
}

impl Totals {
    /// `discount = subtotal * pct / 100`, `total = subtotal - discount`, with
    /// `pct` clamped to `[0, 100]`.
    pub fn compute(items: &[ServiceOrderItem], discount_percent: f64) -> Self {
        let subtotal = items.iter().map(|i| i.quantity * i.unit_price).sum::<f64>();
        let discount_percent = if discount_percent.is_finite() {
            discount_percent.clamp(0.0, 100.0)
        } else {
            0.0
        };
        let discount = subtotal * discount_percent / 100.0;

        Self {
            subtotal,
            discount,
            discount_percent,
            total: subtotal - discount,
        }
    }
}

/// A line item as submitted by the order form; its total is derived.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDraft {
    #[serde(default)]
    pub id: Option<String>,
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
}

impl ItemDraft {
    fn into_item(self) -> ServiceOrderItem {
        ServiceOrderItem {
            id: self.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            total: self.quantity * self.unit_price,
            description: self.description,
            quantity: self.quantity,
            unit_price: self.unit_price,
        }
    }
}

/// Everything the form submits for a new order. Number, totals and
/// timestamps are filled in by [`OrderDraft::into_order`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    pub client_id: String,
    pub client_name: String,
    #[serde(default)]
    pub client_email: Option<String>,
    #[serde(default)]
    pub client_phone: Option<String>,
    #[serde(default)]
    pub client_address: Option<String>,
    #[serde(default = "default_status")]
    pub status: OrderStatus,
    #[serde(default = "default_priority")]
    pub priority: OrderPriority,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub items: Vec<ItemDraft>,
    #[serde(default)]
    pub discount_percent: f64,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub terms: Option<String>,
}

fn default_status() -> OrderStatus {
    OrderStatus::Pending
}

fn default_priority() -> OrderPriority {
    OrderPriority::Medium
}

impl OrderDraft {
    pub fn into_order(self, number: String, created_by: &str, now: DateTime<Utc>) -> ServiceOrder {
        let items: Vec<ServiceOrderItem> = self.items.into_iter().map(ItemDraft::into_item).collect();
        let totals = Totals::compute(&items, self.discount_percent);

        ServiceOrder {
            id: Uuid::new_v4().to_string(),
            number,
            client_id: self.client_id,
            client_name: self.client_name,
            client_email: self.client_email,
            client_phone: self.client_phone,
            client_address: self.client_address,
            status: self.status,
            priority: self.priority,
            title: self.title,
            description: self.description,
            items,
            subtotal: totals.subtotal,
            discount: totals.discount,
            discount_percent: totals.discount_percent,
            total: totals.total,
            notes: self.notes,
            terms: self.terms,
            created_at: now,
            updated_at: now,
            completed_at: (self.status == OrderStatus::Completed).then_some(now),
            created_by: created_by.to_owned(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatistics {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub cancelled: usize,
    /// Sum of totals over completed orders only.
    pub total_revenue: f64,
}

pub fn statistics(orders: &[ServiceOrder]) -> OrderStatistics {
    let mut stats = OrderStatistics {
        total: orders.len(),
        ..Default::default()
    };
    for order in orders {
        match order.status {
            OrderStatus::Pending => stats.pending += 1,
            OrderStatus::InProgress => stats.in_progress += 1,
            OrderStatus::Completed => {
                stats.completed += 1;
                stats.total_revenue += order.total;
            }
            OrderStatus::Cancelled => stats.cancelled += 1,
        }
    }
    stats
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn draft(title: &str, items: &[(f64, f64)], discount_percent: f64) -> OrderDraft {
        OrderDraft {
            client_id: "c1".into(),
            client_name: "Acme".into(),
            client_email: None,
            client_phone: None,
            client_address: None,
            status: OrderStatus::Pending,
            priority: OrderPriority::High,
            title: title.into(),
            description: String::new(),
            items: items
                .iter()
                .map(|&(quantity, unit_price)| ItemDraft {
                    id: None,
                    description: "Service".into(),
                    quantity,
                    unit_price,
                })
                .collect(),
            discount_percent,
            notes: None,
            terms: None,
        }
    }

    pub fn order(number: &str) -> ServiceOrder {
        draft("t", &[(1.0, 10.0)], 0.0).into_order(number.into(), "admin", Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn first_number_of_the_year() {
        assert_eq!(next_order_number(&[], 2025), "OS-2025-1001");
    }

    #[test]
    fn numbers_count_only_the_current_year() {
        let existing = vec![order("OS-2024-1001"), order("OS-2024-1002"), order("OS-2025-1001")];
        assert_eq!(next_order_number(&existing, 2025), "OS-2025-1002");
        assert_eq!(next_order_number(&existing, 2026), "OS-2026-1001");
    }

    #[test]
    fn number_skips_past_taken_slot_after_delete() {
        // 1001 was deleted, count is 1, so the naive number would be 1002
        let existing = vec![order("OS-2025-1002")];
        assert_eq!(next_order_number(&existing, 2025), "OS-2025-1003");
    }

    #[test]
    fn totals_hold_for_discount_range() {
        let items = draft("t", &[(2.0, 150.0), (1.0, 99.9), (3.0, 0.5)], 0.0)
            .into_order("n".into(), "admin", Utc::now())
            .items;
        for pct in [0.0, 5.0, 12.5, 33.3, 50.0, 99.99, 100.0] {
            let t = Totals::compute(&items, pct);
            assert_eq!(t.subtotal, 2.0 * 150.0 + 99.9 + 3.0 * 0.5);
            assert_eq!(t.discount, t.subtotal * pct / 100.0);
            assert_eq!(t.total, t.subtotal - t.discount);
        }
    }

    #[test]
    fn discount_percent_is_clamped() {
        let items = draft("t", &[(1.0, 100.0)], 0.0)
            .into_order("n".into(), "admin", Utc::now())
            .items;
        assert_eq!(Totals::compute(&items, 150.0).total, 0.0);
        assert_eq!(Totals::compute(&items, -10.0).total, 100.0);
        assert_eq!(Totals::compute(&items, f64::NAN).discount, 0.0);
    }

    #[test]
    fn draft_becomes_order_with_totals() {
        let now = Utc::now();
        let o = draft("Website", &[(2.0, 500.0)], 10.0).into_order("OS-2025-1001".into(), "admin", now);
        assert_eq!(o.items[0].total, 1000.0);
        assert_eq!(o.subtotal, 1000.0);
        assert_eq!(o.discount, 100.0);
        assert_eq!(o.total, 900.0);
        assert_eq!(o.created_by, "admin");
        assert_eq!(o.created_at, o.updated_at);
        assert!(o.completed_at.is_none());
    }

    #[test]
    fn statistics_count_revenue_from_completed_only() {
        let mut a = order("OS-2025-1001");
        a.status = OrderStatus::Completed;
        a.total = 300.0;
        let mut b = order("OS-2025-1002");
        b.status = OrderStatus::Cancelled;
        b.total = 1000.0;
        let c = order("OS-2025-1003");

        let stats = statistics(&[a, b, c]);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.cancelled, 1);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.total_revenue, 300.0);
    }
}
