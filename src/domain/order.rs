use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::status::{ShipmentStatus, actual_status};
use crate::domain::{DomainError, DomainResult};
use crate::models::{OrderItem, OrderItemView};

/// Overall status of a group of order items.
///
/// Any cancelled item absorbs the whole group. Otherwise the least-advanced
/// item determines the result: an order is only as far along as its slowest
/// shipment.
pub fn aggregate_status(items: &[OrderItemView]) -> DomainResult<ShipmentStatus> {
    aggregate(items.iter())
}

/// Same resolution restricted to one producer's items.
///
/// The filter is applied before aggregation, so another producer's progress
/// cannot mask a cancelled or lagging item inside the scoped subset.
pub fn aggregate_status_for_producer(
    items: &[OrderItemView],
    producer_id: Uuid,
) -> DomainResult<ShipmentStatus> {
    aggregate(items.iter().filter(|view| view.producer_id == producer_id))
}

fn aggregate<'a, I>(items: I) -> DomainResult<ShipmentStatus>
where
    I: IntoIterator<Item = &'a OrderItemView>,
{
    let mut statuses = Vec::new();
    for view in items {
        statuses.push(actual_status(&view.events)?);
    }
    if statuses.iter().any(ShipmentStatus::is_cancelled) {
        return Ok(ShipmentStatus::Cancelled);
    }
    statuses
        .into_iter()
        .min_by_key(|status| status.rank())
        .ok_or(DomainError::EmptyOrder)
}

/// True while every item is still at or before `Processing` and none has
/// been cancelled already.
pub fn is_cancelable(items: &[OrderItemView]) -> DomainResult<bool> {
    if items.is_empty() {
        return Err(DomainError::EmptyOrder);
    }
    for view in items {
        let status = actual_status(&view.events)?;
        if status.is_cancelled() || status.rank() > ShipmentStatus::Processing.rank() {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Order total in cents: unit price snapshot times quantity per item.
pub fn total_price(items: &[OrderItem]) -> i64 {
    items
        .iter()
        .map(|item| item.price * i64::from(item.quantity))
        .sum()
}

/// The order's "placed" date: the earliest event of the first item.
///
/// This is the first item's history, not the minimum across all items — a
/// multi-producer order whose shipments started independently may carry an
/// earlier event on a later item.
pub fn first_event_date(items: &[OrderItemView]) -> DomainResult<DateTime<Utc>> {
    let first = items.first().ok_or(DomainError::EmptyOrder)?;
    first
        .events
        .iter()
        .map(|event| event.date)
        .min()
        .ok_or(DomainError::EmptyShipment)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::models::ShipmentEvent;

    fn view(producer_id: Uuid, statuses: &[ShipmentStatus]) -> OrderItemView {
        let shipment_id = Uuid::new_v4();
        let events = statuses
            .iter()
            .enumerate()
            .map(|(i, status)| ShipmentEvent {
                id: Uuid::new_v4(),
                shipment_id,
                status: *status,
                date: Utc
                    .with_ymd_and_hms(2024, 3, 1 + i as u32, 9, 0, 0)
                    .unwrap(),
                address_id: Uuid::new_v4(),
            })
            .collect();
        OrderItemView {
            item: OrderItem {
                id: Uuid::new_v4(),
                order_id: Uuid::new_v4(),
                product_id: Uuid::new_v4(),
                shipment_id,
                quantity: 2,
                price: 1000,
                created_at: Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
            },
            producer_id,
            events,
        }
    }

    #[test]
    fn least_advanced_item_wins() {
        let producer = Uuid::new_v4();
        let items = vec![
            view(producer, &[ShipmentStatus::Processing, ShipmentStatus::Shipped]),
            view(producer, &[ShipmentStatus::Processing]),
        ];
        assert_eq!(
            aggregate_status(&items).unwrap(),
            ShipmentStatus::Processing
        );
    }

    #[test]
    fn cancelled_absorbs_regardless_of_progress() {
        let producer = Uuid::new_v4();
        let items = vec![
            view(
                producer,
                &[
                    ShipmentStatus::Processing,
                    ShipmentStatus::Shipped,
                    ShipmentStatus::Delivered,
                ],
            ),
            view(producer, &[ShipmentStatus::Cancelled]),
        ];
        assert_eq!(aggregate_status(&items).unwrap(), ShipmentStatus::Cancelled);
    }

    #[test]
    fn empty_order_is_rejected() {
        assert_eq!(aggregate_status(&[]), Err(DomainError::EmptyOrder));
        assert_eq!(is_cancelable(&[]), Err(DomainError::EmptyOrder));
    }

    #[test]
    fn producer_scope_filters_before_aggregating() {
        let mine = Uuid::new_v4();
        let theirs = Uuid::new_v4();
        let items = vec![
            view(mine, &[ShipmentStatus::Processing, ShipmentStatus::Shipped]),
            view(theirs, &[ShipmentStatus::Processing]),
        ];
        // Scoped to `mine`, the other producer's lagging item is invisible.
        assert_eq!(
            aggregate_status_for_producer(&items, mine).unwrap(),
            ShipmentStatus::Shipped
        );
        assert_eq!(
            aggregate_status_for_producer(&items, theirs).unwrap(),
            ShipmentStatus::Processing
        );
    }

    #[test]
    fn producer_scope_with_no_items_is_rejected() {
        let items = vec![view(Uuid::new_v4(), &[ShipmentStatus::Processing])];
        assert_eq!(
            aggregate_status_for_producer(&items, Uuid::new_v4()),
            Err(DomainError::EmptyOrder)
        );
    }

    #[test]
    fn cancelable_only_while_everything_is_processing() {
        let producer = Uuid::new_v4();
        let processing = vec![
            view(producer, &[ShipmentStatus::Processing]),
            view(producer, &[ShipmentStatus::Processing]),
        ];
        assert!(is_cancelable(&processing).unwrap());

        let shipped = vec![
            view(producer, &[ShipmentStatus::Processing]),
            view(producer, &[ShipmentStatus::Processing, ShipmentStatus::Shipped]),
        ];
        assert!(!is_cancelable(&shipped).unwrap());

        let cancelled = vec![view(producer, &[ShipmentStatus::Cancelled])];
        assert!(!is_cancelable(&cancelled).unwrap());
    }

    #[test]
    fn total_price_sums_price_times_quantity() {
        let a = view(Uuid::new_v4(), &[ShipmentStatus::Processing]);
        let mut b = view(Uuid::new_v4(), &[ShipmentStatus::Processing]);
        b.item.quantity = 3;
        b.item.price = 250;
        let items = vec![a.item, b.item];
        assert_eq!(total_price(&items), 2 * 1000 + 3 * 250);
    }

    #[test]
    fn first_event_date_uses_first_item_earliest_event() {
        let producer = Uuid::new_v4();
        let items = vec![
            view(producer, &[ShipmentStatus::Processing, ShipmentStatus::Shipped]),
            view(producer, &[ShipmentStatus::Processing]),
        ];
        let placed = first_event_date(&items).unwrap();
        assert_eq!(placed, Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap());
    }

    #[test]
    fn first_event_date_rejects_empty_history() {
        let mut item = view(Uuid::new_v4(), &[ShipmentStatus::Processing]);
        item.events.clear();
        assert_eq!(first_event_date(&[item]), Err(DomainError::EmptyShipment));
    }
}
