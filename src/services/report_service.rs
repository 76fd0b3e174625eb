use std::collections::{HashMap, HashSet};

use sea_orm::{ConnectionTrait, EntityTrait, QueryOrder};
use uuid::Uuid;

use crate::{
    domain::category::{CategoryNode, descendant_ids},
    domain::daterange::{DateRange, filter_by_date_range},
    domain::evolution::{self, EvolutionRow, EvolutionValue, MonthYear},
    domain::geo::Coordinate,
    domain::order::{aggregate_status, first_event_date},
    domain::reports::{ReportAccumulator, ReportMetric, ReportRow, ReportTarget, within_radius},
    domain::status::actual_status,
    dto::reports::{EvolutionPoint, EvolutionSeries, ReportEntryDto, ReportEntryList, ReportQuery},
    entity::{
        addresses::Entity as Addresses,
        categories::Entity as Categories,
        order_items::{Column as OrderItemCol, Entity as OrderItems},
        orders::Entity as Orders,
        products::Entity as Products,
        shipment_events::{Column as EventCol, Entity as ShipmentEvents},
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::OrderItemView,
    response::{ApiResponse, Meta},
    services::order_service::{order_item_from_entity, shipment_event_from_entity},
    state::AppState,
};

pub async fn products_report(
    state: &AppState,
    user: &AuthUser,
    query: ReportQuery,
) -> AppResult<ApiResponse<ReportEntryList>> {
    let rows = filtered_rows(state, user, &query).await?;

    let mut acc = ReportAccumulator::new();
    for row in &rows {
        acc.fold(row, query.metric, ReportTarget::Product);
    }

    let items = acc
        .into_entries()
        .into_iter()
        .map(ReportEntryDto::from)
        .collect();
    Ok(ApiResponse::success(
        "Products report",
        ReportEntryList { items },
        Some(Meta::empty()),
    ))
}

pub async fn clients_report(
    state: &AppState,
    user: &AuthUser,
    query: ReportQuery,
) -> AppResult<ApiResponse<ReportEntryList>> {
    let rows = filtered_rows(state, user, &query).await?;

    let mut acc = ReportAccumulator::new();
    for row in &rows {
        acc.fold(row, query.metric, ReportTarget::Client);
    }

    let items = acc
        .into_entries()
        .into_iter()
        .map(ReportEntryDto::from)
        .collect();
    Ok(ApiResponse::success(
        "Clients report",
        ReportEntryList { items },
        Some(Meta::empty()),
    ))
}

pub async fn evolution_report(
    state: &AppState,
    user: &AuthUser,
    query: ReportQuery,
) -> AppResult<ApiResponse<EvolutionSeries>> {
    let rows = filtered_rows(state, user, &query).await?;

    let evolution_rows = evolution_rows(&rows, query.metric);
    let points = evolution::aggregate(&evolution_rows)
        .into_iter()
        .map(EvolutionPoint::from)
        .collect();

    Ok(ApiResponse::success(
        "Evolution report",
        EvolutionSeries { points },
        Some(Meta::empty()),
    ))
}

/// Map filtered rows to tagged time-series rows for the selected metric.
/// Count-style metrics are deduplicated here, so each order (or each
/// consumer-product pair) lands in its bucket exactly once.
fn evolution_rows(rows: &[ReportRow], metric: ReportMetric) -> Vec<EvolutionRow> {
    match metric {
        ReportMetric::OrderCount => {
            let mut seen: HashSet<Uuid> = HashSet::new();
            rows.iter()
                .filter(|row| seen.insert(row.order_id))
                .map(|row| EvolutionRow {
                    period: MonthYear::from_date(row.placed_at),
                    value: EvolutionValue::Count,
                })
                .collect()
        }
        ReportMetric::DistinctProducts => {
            let mut seen: HashSet<(Uuid, Uuid)> = HashSet::new();
            rows.iter()
                .filter(|row| seen.insert((row.consumer_id, row.product_id)))
                .map(|row| EvolutionRow {
                    period: MonthYear::from_date(row.placed_at),
                    value: EvolutionValue::Count,
                })
                .collect()
        }
        ReportMetric::ProductTotal => rows
            .iter()
            .map(|row| EvolutionRow {
                period: MonthYear::from_date(row.placed_at),
                value: EvolutionValue::Quantity(i64::from(row.quantity)),
            })
            .collect(),
        ReportMetric::PurchaseTotal | ReportMetric::SalesTotal => rows
            .iter()
            .map(|row| EvolutionRow {
                period: MonthYear::from_date(row.placed_at),
                value: EvolutionValue::Revenue(row.revenue()),
            })
            .collect(),
    }
}

/// Fetch, flatten and filter the raw rows: date window, then radius, then
/// category subtree, then caller scoping.
async fn filtered_rows(
    state: &AppState,
    user: &AuthUser,
    query: &ReportQuery,
) -> AppResult<Vec<ReportRow>> {
    if user.role != "admin" && user.role != "producer" {
        return Err(AppError::Forbidden);
    }

    let range = DateRange::from_dates(query.start_date, query.end_date)?;

    let mut rows = load_rows(&state.orm).await?;
    rows = filter_by_date_range(rows, &range, |row| row.placed_at);

    if let Some(radius) = query.radius_km {
        rows.retain(|row| within_radius(row, radius));
    }

    if let Some(category_id) = query.category_id {
        let nodes: Vec<CategoryNode> = Categories::find()
            .all(&state.orm)
            .await?
            .into_iter()
            .map(|category| CategoryNode {
                id: category.id,
                parent_id: category.parent_id,
            })
            .collect();
        let allowed = descendant_ids(&nodes, category_id);
        rows.retain(|row| row.category_id.is_some_and(|id| allowed.contains(&id)));
    }

    if user.role == "producer" {
        rows.retain(|row| row.producer_id == user.user_id);
    }

    Ok(rows)
}

/// Batched fetch of every order item with its populated relations, joined
/// in memory into flat rows. Orders with inconsistent histories (no items,
/// or an item without events) are logged and skipped rather than failing
/// the whole report.
async fn load_rows<C>(conn: &C) -> AppResult<Vec<ReportRow>>
where
    C: ConnectionTrait,
{
    let orders = Orders::find().all(conn).await?;
    let item_models = OrderItems::find()
        .order_by_asc(OrderItemCol::CreatedAt)
        .all(conn)
        .await?;
    let products = Products::find().all(conn).await?;
    let users = Users::find().all(conn).await?;
    let addresses = Addresses::find().all(conn).await?;
    let event_models = ShipmentEvents::find()
        .order_by_asc(EventCol::Date)
        .all(conn)
        .await?;

    let product_by_id: HashMap<Uuid, _> = products
        .into_iter()
        .map(|product| (product.id, product))
        .collect();
    let user_by_id: HashMap<Uuid, _> = users.into_iter().map(|user| (user.id, user)).collect();
    let address_by_id: HashMap<Uuid, _> = addresses
        .into_iter()
        .map(|address| (address.id, address))
        .collect();

    let mut events_by_shipment: HashMap<Uuid, Vec<_>> = HashMap::new();
    for model in event_models {
        let event = shipment_event_from_entity(model)?;
        events_by_shipment
            .entry(event.shipment_id)
            .or_default()
            .push(event);
    }

    let mut items_by_order: HashMap<Uuid, Vec<OrderItemView>> = HashMap::new();
    for model in item_models {
        let item = order_item_from_entity(model);
        let Some(product) = product_by_id.get(&item.product_id) else {
            tracing::warn!(item_id = %item.id, "order item without product, skipping");
            continue;
        };
        let events = events_by_shipment
            .remove(&item.shipment_id)
            .unwrap_or_default();
        items_by_order.entry(item.order_id).or_default().push(OrderItemView {
            item,
            producer_id: product.producer_id,
            events,
        });
    }

    let mut rows = Vec::new();
    for order in orders {
        let Some(views) = items_by_order.remove(&order.id) else {
            tracing::warn!(order_id = %order.id, "order without items, skipping");
            continue;
        };
        let (placed_at, order_status) =
            match (first_event_date(&views), aggregate_status(&views)) {
                (Ok(placed_at), Ok(status)) => (placed_at, status),
                _ => {
                    tracing::warn!(order_id = %order.id, "order with empty shipment history, skipping");
                    continue;
                }
            };

        let consumer = user_by_id.get(&order.user_id);
        let consumer_name = consumer
            .map(|user| user.name.clone())
            .unwrap_or_default();
        let shipping_coord = address_by_id
            .get(&order.shipping_address_id)
            .map(|address| Coordinate {
                lat: address.latitude,
                lon: address.longitude,
            });

        for view in views {
            // An item's status can lag or outrun its order's.
            let item_status = match actual_status(&view.events) {
                Ok(status) => status,
                Err(_) => {
                    tracing::warn!(item_id = %view.item.id, "item without events, skipping");
                    continue;
                }
            };
            let Some(product) = product_by_id.get(&view.item.product_id) else {
                continue;
            };
            let producer_coord = user_by_id
                .get(&product.producer_id)
                .and_then(|producer| producer.address_id)
                .and_then(|address_id| address_by_id.get(&address_id))
                .map(|address| Coordinate {
                    lat: address.latitude,
                    lon: address.longitude,
                });

            rows.push(ReportRow {
                order_id: order.id,
                consumer_id: order.user_id,
                consumer_name: consumer_name.clone(),
                product_id: product.id,
                product_name: product.name.clone(),
                producer_id: product.producer_id,
                category_id: product.category_id,
                quantity: view.item.quantity,
                price: view.item.price,
                placed_at,
                item_status,
                order_status,
                producer_coord,
                shipping_coord,
            });
        }
    }

    Ok(rows)
}
