use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::geo::{Coordinate, distance_km};
use crate::domain::status::ShipmentStatus;

/// The closed set of report metrics. The serde names are the public wire
/// names; exactly one is selected per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ReportMetric {
    #[serde(rename = "numeroEncomendas")]
    OrderCount,
    #[serde(rename = "totalProdutos")]
    ProductTotal,
    #[serde(rename = "comprasTotais")]
    PurchaseTotal,
    #[serde(rename = "vendasTotais")]
    SalesTotal,
    #[serde(rename = "numeroProdutosEncomendados")]
    DistinctProducts,
}

/// Which entity a report is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportTarget {
    Product,
    Client,
}

/// One order item flattened with everything the report pipeline needs.
///
/// Assembled once by the data-fetch layer; the fold itself never walks
/// entity relations or optional chains.
#[derive(Debug, Clone)]
pub struct ReportRow {
    pub order_id: Uuid,
    pub consumer_id: Uuid,
    pub consumer_name: String,
    pub product_id: Uuid,
    pub product_name: String,
    pub producer_id: Uuid,
    pub category_id: Option<Uuid>,
    pub quantity: i32,
    pub price: i64,
    pub placed_at: DateTime<Utc>,
    pub item_status: ShipmentStatus,
    pub order_status: ShipmentStatus,
    pub producer_coord: Option<Coordinate>,
    pub shipping_coord: Option<Coordinate>,
}

impl ReportRow {
    pub fn revenue(&self) -> i64 {
        self.price * i64::from(self.quantity)
    }
}

/// Radius predicate between the producer's unit and the shipping address.
/// Rows missing either coordinate fail the predicate.
pub fn within_radius(row: &ReportRow, radius_km: f64) -> bool {
    match (row.producer_coord, row.shipping_coord) {
        (Some(producer), Some(shipping)) => distance_km(producer, shipping) <= radius_km,
        _ => false,
    }
}

/// Running totals for one report entry.
#[derive(Debug, Clone, Default)]
pub struct ReportEntry {
    pub id: Uuid,
    pub name: String,
    pub orders: u64,
    pub cancelled_orders: u64,
    pub quantity: i64,
    pub cancelled_quantity: i64,
    pub revenue: i64,
    pub cancelled_revenue: i64,
    pub distinct_products: u64,
    seen_orders: HashSet<Uuid>,
    seen_products: HashSet<Uuid>,
}

impl ReportEntry {
    fn new(id: Uuid, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            ..Default::default()
        }
    }
}

/// Keyed fold of report rows into per-entity entries.
///
/// Entries live in an insertion-ordered vector with an id-to-index map:
/// O(1) lookup, output in first-seen order. Sum metrics accumulate on every
/// call; the counter metrics are guarded by per-entry seen-sets and
/// tolerate replays.
#[derive(Debug, Default)]
pub struct ReportAccumulator {
    entries: Vec<ReportEntry>,
    index: HashMap<Uuid, usize>,
}

impl ReportAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fold(&mut self, row: &ReportRow, metric: ReportMetric, target: ReportTarget) {
        let (key, name) = match target {
            ReportTarget::Product => (row.product_id, row.product_name.as_str()),
            ReportTarget::Client => (row.consumer_id, row.consumer_name.as_str()),
        };
        let idx = match self.index.get(&key) {
            Some(&idx) => idx,
            None => {
                self.entries.push(ReportEntry::new(key, name));
                let idx = self.entries.len() - 1;
                self.index.insert(key, idx);
                idx
            }
        };
        let entry = &mut self.entries[idx];

        match metric {
            ReportMetric::OrderCount => {
                if entry.seen_orders.insert(row.order_id) {
                    entry.orders += 1;
                    if row.order_status.is_cancelled() {
                        entry.cancelled_orders += 1;
                    }
                }
            }
            ReportMetric::ProductTotal => {
                entry.quantity += i64::from(row.quantity);
                if row.item_status.is_cancelled() {
                    entry.cancelled_quantity += i64::from(row.quantity);
                }
            }
            ReportMetric::PurchaseTotal | ReportMetric::SalesTotal => {
                entry.revenue += row.revenue();
                if row.item_status.is_cancelled() {
                    entry.cancelled_revenue += row.revenue();
                }
            }
            ReportMetric::DistinctProducts => {
                if entry.seen_products.insert(row.product_id) {
                    entry.distinct_products += 1;
                }
            }
        }
    }

    /// Entries in first-seen order.
    pub fn into_entries(self) -> Vec<ReportEntry> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn row(order_id: Uuid, product_id: Uuid, consumer_id: Uuid) -> ReportRow {
        ReportRow {
            order_id,
            consumer_id,
            consumer_name: "Maria".into(),
            product_id,
            product_name: "Olive oil".into(),
            producer_id: Uuid::new_v4(),
            category_id: None,
            quantity: 2,
            price: 1500,
            placed_at: Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap(),
            item_status: ShipmentStatus::Processing,
            order_status: ShipmentStatus::Processing,
            producer_coord: None,
            shipping_coord: None,
        }
    }

    #[test]
    fn order_count_is_deduplicated_per_order() {
        let item = row(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        let mut acc = ReportAccumulator::new();
        acc.fold(&item, ReportMetric::OrderCount, ReportTarget::Product);
        acc.fold(&item, ReportMetric::OrderCount, ReportTarget::Product);

        let entries = acc.into_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].orders, 1);
        assert_eq!(entries[0].cancelled_orders, 0);
    }

    #[test]
    fn cancelled_order_bumps_both_counters_once() {
        let mut item = row(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        item.order_status = ShipmentStatus::Cancelled;

        let mut acc = ReportAccumulator::new();
        acc.fold(&item, ReportMetric::OrderCount, ReportTarget::Client);
        acc.fold(&item, ReportMetric::OrderCount, ReportTarget::Client);

        let entries = acc.into_entries();
        assert_eq!(entries[0].orders, 1);
        assert_eq!(entries[0].cancelled_orders, 1);
    }

    #[test]
    fn quantity_sums_and_mirrors_cancelled_items() {
        let product = Uuid::new_v4();
        let live = row(Uuid::new_v4(), product, Uuid::new_v4());
        let mut cancelled = row(Uuid::new_v4(), product, Uuid::new_v4());
        cancelled.quantity = 5;
        cancelled.item_status = ShipmentStatus::Cancelled;

        let mut acc = ReportAccumulator::new();
        acc.fold(&live, ReportMetric::ProductTotal, ReportTarget::Product);
        acc.fold(&cancelled, ReportMetric::ProductTotal, ReportTarget::Product);

        let entries = acc.into_entries();
        assert_eq!(entries[0].quantity, 7);
        assert_eq!(entries[0].cancelled_quantity, 5);
    }

    #[test]
    fn revenue_is_quantity_times_price() {
        let item = row(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        let mut acc = ReportAccumulator::new();
        acc.fold(&item, ReportMetric::SalesTotal, ReportTarget::Product);
        acc.fold(&item, ReportMetric::SalesTotal, ReportTarget::Product);

        // Running sums are a reducer over a stream, not a set union.
        let entries = acc.into_entries();
        assert_eq!(entries[0].revenue, 2 * 2 * 1500);
        assert_eq!(entries[0].cancelled_revenue, 0);
    }

    #[test]
    fn distinct_products_counts_each_product_once_per_client() {
        let consumer = Uuid::new_v4();
        let product_a = Uuid::new_v4();
        let product_b = Uuid::new_v4();
        let first = row(Uuid::new_v4(), product_a, consumer);
        let again = row(Uuid::new_v4(), product_a, consumer);
        let other = row(Uuid::new_v4(), product_b, consumer);

        let mut acc = ReportAccumulator::new();
        for item in [&first, &again, &other] {
            acc.fold(item, ReportMetric::DistinctProducts, ReportTarget::Client);
        }

        let entries = acc.into_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].distinct_products, 2);
    }

    #[test]
    fn entries_keep_first_seen_order() {
        let product_a = Uuid::new_v4();
        let product_b = Uuid::new_v4();
        let mut first = row(Uuid::new_v4(), product_a, Uuid::new_v4());
        first.product_name = "Honey".into();
        let mut second = row(Uuid::new_v4(), product_b, Uuid::new_v4());
        second.product_name = "Cheese".into();

        let mut acc = ReportAccumulator::new();
        acc.fold(&first, ReportMetric::ProductTotal, ReportTarget::Product);
        acc.fold(&second, ReportMetric::ProductTotal, ReportTarget::Product);
        acc.fold(&first, ReportMetric::ProductTotal, ReportTarget::Product);

        let names: Vec<_> = acc
            .into_entries()
            .into_iter()
            .map(|entry| entry.name)
            .collect();
        assert_eq!(names, vec!["Honey".to_string(), "Cheese".to_string()]);
    }

    #[test]
    fn radius_predicate_requires_both_coordinates() {
        let mut item = row(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        assert!(!within_radius(&item, 100.0));

        item.producer_coord = Some(Coordinate { lat: 38.7223, lon: -9.1393 });
        item.shipping_coord = Some(Coordinate { lat: 38.7436, lon: -9.2302 });
        assert!(within_radius(&item, 20.0));
        assert!(!within_radius(&item, 1.0));
    }
}
