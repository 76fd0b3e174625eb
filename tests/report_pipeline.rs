use axum_marketplace_api::domain::{
    category::{CategoryNode, descendant_ids},
    daterange::{DateRange, filter_by_date_range},
    geo::Coordinate,
    reports::{ReportAccumulator, ReportMetric, ReportRow, ReportTarget, within_radius},
    status::ShipmentStatus,
};
use chrono::{NaiveDate, TimeZone, Utc};
use uuid::Uuid;

const LISBON: Coordinate = Coordinate {
    lat: 38.7223,
    lon: -9.1393,
};
const PORTO: Coordinate = Coordinate {
    lat: 41.1579,
    lon: -8.6291,
};

fn sample_row(day: u32, category_id: Uuid, shipping: Coordinate) -> ReportRow {
    ReportRow {
        order_id: Uuid::new_v4(),
        consumer_id: Uuid::new_v4(),
        consumer_name: "Maria".into(),
        product_id: Uuid::new_v4(),
        product_name: "Olive oil".into(),
        producer_id: Uuid::new_v4(),
        category_id: Some(category_id),
        quantity: 2,
        price: 1500,
        placed_at: Utc.with_ymd_and_hms(2024, 3, day, 14, 30, 0).unwrap(),
        item_status: ShipmentStatus::Processing,
        order_status: ShipmentStatus::Processing,
        producer_coord: Some(LISBON),
        shipping_coord: Some(shipping),
    }
}

// The report pipeline in the order the service applies it: date window,
// then radius, then category subtree, then the fold.
#[test]
fn pipeline_filters_then_folds() {
    let pantry = Uuid::new_v4();
    let oils = Uuid::new_v4();
    let dairy = Uuid::new_v4();
    let categories = vec![
        CategoryNode {
            id: pantry,
            parent_id: None,
        },
        CategoryNode {
            id: oils,
            parent_id: Some(pantry),
        },
        CategoryNode {
            id: dairy,
            parent_id: None,
        },
    ];

    let near = Coordinate {
        lat: 38.7436,
        lon: -9.2302,
    };

    let kept = sample_row(10, oils, near);
    let too_early = sample_row(1, oils, near);
    let too_far = sample_row(12, oils, PORTO);
    let wrong_category = sample_row(15, dairy, near);

    let rows = vec![
        kept.clone(),
        too_early.clone(),
        too_far.clone(),
        wrong_category.clone(),
    ];

    let range = DateRange::from_dates(
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
        NaiveDate::from_ymd_opt(2024, 3, 20).unwrap(),
    )
    .unwrap();
    let mut rows = filter_by_date_range(rows, &range, |row| row.placed_at);
    assert_eq!(rows.len(), 3);

    rows.retain(|row| within_radius(row, 20.0));
    assert_eq!(rows.len(), 2);

    let allowed = descendant_ids(&categories, pantry);
    rows.retain(|row| row.category_id.is_some_and(|id| allowed.contains(&id)));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].order_id, kept.order_id);

    let mut acc = ReportAccumulator::new();
    for row in &rows {
        acc.fold(row, ReportMetric::SalesTotal, ReportTarget::Product);
    }
    let entries = acc.into_entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].revenue, 3000);
    assert_eq!(entries[0].cancelled_revenue, 0);
}

// A cancelled order surfaces in both counters of the clients report, and
// the date filter keeps boundary days whatever their time-of-day.
#[test]
fn cancelled_orders_reach_the_client_report() {
    let category = Uuid::new_v4();
    let consumer = Uuid::new_v4();

    let mut live = sample_row(5, category, LISBON);
    live.consumer_id = consumer;
    let mut cancelled = sample_row(20, category, LISBON);
    cancelled.consumer_id = consumer;
    cancelled.order_status = ShipmentStatus::Cancelled;
    cancelled.item_status = ShipmentStatus::Cancelled;
    // Boundary day, late in the evening.
    cancelled.placed_at = Utc.with_ymd_and_hms(2024, 3, 20, 23, 59, 59).unwrap();

    let range = DateRange::from_dates(
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
        NaiveDate::from_ymd_opt(2024, 3, 20).unwrap(),
    )
    .unwrap();
    let rows = filter_by_date_range(vec![live, cancelled], &range, |row| row.placed_at);
    assert_eq!(rows.len(), 2);

    let mut acc = ReportAccumulator::new();
    for row in &rows {
        acc.fold(row, ReportMetric::OrderCount, ReportTarget::Client);
    }
    let entries = acc.into_entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].orders, 2);
    assert_eq!(entries[0].cancelled_orders, 1);
}
