use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, FromQueryResult,
    JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    domain::DomainError,
    domain::order::{
        aggregate_status, aggregate_status_for_producer, first_event_date, is_cancelable,
        total_price,
    },
    domain::status::ShipmentStatus,
    dto::orders::{
        CheckoutRequest, EmitEventRequest, OrderList, OrderSummary, OrderWithItems,
        PayOrderRequest, ProducerOrderView,
    },
    entity::{
        addresses::Entity as Addresses,
        carriers::Entity as Carriers,
        cart_items::{Column as CartCol, Entity as CartItems, Relation as CartRelation},
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{
            ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel,
        },
        products::{Column as ProdCol, Entity as Products},
        shipment_events::{
            ActiveModel as ShipmentEventActive, Column as EventCol, Entity as ShipmentEvents,
            Model as ShipmentEventModel,
        },
        shipments::{ActiveModel as ShipmentActive, Column as ShipmentCol, Entity as Shipments},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin, ensure_producer},
    models::{Order, OrderItem, OrderItemView, ShipmentEvent},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
};

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut finder = Orders::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let order_ids: Vec<Uuid> = orders.iter().map(|order| order.id).collect();
    let mut views = load_item_views_for_orders(&state.orm, &order_ids).await?;

    let mut summaries = Vec::with_capacity(orders.len());
    for order in orders {
        let items = views.remove(&order.id).unwrap_or_default();
        let status = aggregate_status(&items)?;
        summaries.push(OrderSummary {
            order: order_from_entity(order),
            status,
        });
    }

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: summaries },
        Some(meta),
    ))
}

pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let txn = state.orm.begin().await?;

    let shipping_address = Addresses::find_by_id(payload.shipping_address_id)
        .one(&txn)
        .await?;
    if shipping_address.is_none() {
        return Err(AppError::BadRequest("Shipping address not found".into()));
    }

    #[derive(Debug, FromQueryResult)]
    struct CartProductRow {
        #[sea_orm(column_name = "cart_items.product_id")]
        product_id: Uuid,
        #[sea_orm(column_name = "cart_items.quantity")]
        quantity: i32,
        #[sea_orm(column_name = "products.price")]
        price: i64,
        #[sea_orm(column_name = "products.stock")]
        stock: i32,
        #[sea_orm(column_name = "products.producer_id")]
        producer_id: Uuid,
    }

    let rows = CartItems::find()
        .select_only()
        .column_as(CartCol::ProductId, "cart_items.product_id")
        .column_as(CartCol::Quantity, "cart_items.quantity")
        .join(JoinType::InnerJoin, CartRelation::Products.def())
        .column_as(ProdCol::Price, "products.price")
        .column_as(ProdCol::Stock, "products.stock")
        .column_as(ProdCol::ProducerId, "products.producer_id")
        .filter(CartCol::UserId.eq(user.user_id))
        .lock(LockType::Update)
        .into_model::<CartProductRow>()
        .all(&txn)
        .await?;

    if rows.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }

    for row in &rows {
        if row.quantity <= 0 {
            return Err(AppError::BadRequest("Cart has invalid quantity".into()));
        }
        if row.stock < row.quantity {
            return Err(AppError::BadRequest(format!(
                "Insufficient stock for product {}",
                row.product_id
            )));
        }
    }

    let order_id = Uuid::new_v4();
    let invoice_number = build_invoice_number(order_id);
    let now = Utc::now();

    // Snapshot the cart: one item per line at the product's current price.
    // The stored price never changes again, whatever happens to the catalog.
    let items: Vec<OrderItem> = rows
        .iter()
        .map(|row| OrderItem {
            id: Uuid::new_v4(),
            order_id,
            product_id: row.product_id,
            shipment_id: Uuid::new_v4(),
            quantity: row.quantity,
            price: row.price,
            created_at: now,
        })
        .collect();

    let total_amount = total_price(&items);

    let order = OrderActive {
        id: Set(order_id),
        user_id: Set(user.user_id),
        shipping_address_id: Set(payload.shipping_address_id),
        total_amount: Set(total_amount),
        invoice_number: Set(invoice_number),
        payment_id: Set(None),
        paid_at: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut views: Vec<OrderItemView> = Vec::with_capacity(items.len());

    for (row, item) in rows.iter().zip(&items) {
        ShipmentActive {
            id: Set(item.shipment_id),
            carrier_id: Set(None),
        }
        .insert(&txn)
        .await?;

        // Seed the history so every shipment has a current status from day one.
        let event = ShipmentEventActive {
            id: Set(Uuid::new_v4()),
            shipment_id: Set(item.shipment_id),
            status: Set(ShipmentStatus::Processing.as_str().to_string()),
            date: Set(now.into()),
            address_id: Set(payload.shipping_address_id),
        }
        .insert(&txn)
        .await?;

        let stored = OrderItemActive {
            id: Set(item.id),
            order_id: Set(order.id),
            product_id: Set(item.product_id),
            shipment_id: Set(item.shipment_id),
            quantity: Set(item.quantity),
            price: Set(item.price),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;

        // reduce stock
        Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(item.quantity))
            .filter(ProdCol::Id.eq(item.product_id))
            .exec(&txn)
            .await?;

        views.push(OrderItemView {
            item: order_item_from_entity(stored),
            producer_id: row.producer_id,
            events: vec![shipment_event_from_entity(event)?],
        });
    }

    // clear cart
    CartItems::delete_many()
        .filter(CartCol::UserId.eq(user.user_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        state,
        Some(user.user_id),
        "checkout",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let status = aggregate_status(&views)?;
    let placed_at = first_event_date(&views)?;

    Ok(ApiResponse::success(
        "Checkout success",
        OrderWithItems {
            order: order_from_entity(order),
            status,
            placed_at,
            items: views,
        },
        Some(Meta::empty()),
    ))
}

pub async fn pay_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: PayOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let txn = state.orm.begin().await?;

    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    if order.payment_id.is_some() {
        return Err(AppError::BadRequest("Order already paid".into()));
    }

    let shipping_address_id = order.shipping_address_id;
    let mut active: OrderActive = order.into();
    active.payment_id = Set(Some(payload.payment_id));
    active.paid_at = Set(Some(Utc::now().into()));
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    // Record the payment on every item's shipment history.
    append_event_to_items(
        &txn,
        order.id,
        ShipmentStatus::Processing,
        shipping_address_id,
    )
    .await?;

    let items = load_item_views(&txn, order.id).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        state,
        Some(user.user_id),
        "order_paid",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let status = aggregate_status(&items)?;
    let placed_at = first_event_date(&items)?;

    Ok(ApiResponse::success(
        "Payment recorded",
        OrderWithItems {
            order: order_from_entity(order),
            status,
            placed_at,
            items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let txn = state.orm.begin().await?;

    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let items = load_item_views(&txn, order.id).await?;
    if !is_cancelable(&items)? {
        return Err(AppError::BadRequest(
            "Order can no longer be cancelled".into(),
        ));
    }

    append_event_to_items(
        &txn,
        order.id,
        ShipmentStatus::Cancelled,
        order.shipping_address_id,
    )
    .await?;

    let mut active: OrderActive = order.into();
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    let items = load_item_views(&txn, order.id).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        state,
        Some(user.user_id),
        "order_cancelled",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let status = aggregate_status(&items)?;
    let placed_at = first_event_date(&items)?;

    Ok(ApiResponse::success(
        "Order cancelled",
        OrderWithItems {
            order: order_from_entity(order),
            status,
            placed_at,
            items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn emit_order_event(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: EmitEventRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;

    let order = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let address = Addresses::find_by_id(payload.address_id).one(&txn).await?;
    if address.is_none() {
        return Err(AppError::BadRequest("Event address not found".into()));
    }

    if let Some(carrier_id) = payload.carrier_id {
        let carrier = Carriers::find_by_id(carrier_id).one(&txn).await?;
        if carrier.is_none() {
            return Err(AppError::BadRequest("Carrier not found".into()));
        }
        let shipment_ids: Vec<Uuid> = OrderItems::find()
            .filter(OrderItemCol::OrderId.eq(order.id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|item| item.shipment_id)
            .collect();
        Shipments::update_many()
            .col_expr(ShipmentCol::CarrierId, Expr::value(carrier_id))
            .filter(ShipmentCol::Id.is_in(shipment_ids))
            .exec(&txn)
            .await?;
    }

    append_event_to_items(&txn, order.id, payload.status, payload.address_id).await?;

    let mut active: OrderActive = order.into();
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    let items = load_item_views(&txn, order.id).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        state,
        Some(user.user_id),
        "shipment_event",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "status": payload.status.as_str() })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let status = aggregate_status(&items)?;
    let placed_at = first_event_date(&items)?;

    Ok(ApiResponse::success(
        "Event recorded",
        OrderWithItems {
            order: order_from_entity(order),
            status,
            placed_at,
            items,
        },
        Some(Meta::empty()),
    ))
}

/// Delete an unpaid order whose checkout session expired, releasing the
/// reserved stock back to the source products.
pub async fn expire_unpaid(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;

    let order = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    if order.payment_id.is_some() {
        return Err(AppError::BadRequest("Order is already paid".into()));
    }

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&txn)
        .await?;

    for item in &items {
        Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).add(item.quantity))
            .filter(ProdCol::Id.eq(item.product_id))
            .exec(&txn)
            .await?;
    }

    let shipment_ids: Vec<Uuid> = items.iter().map(|item| item.shipment_id).collect();
    ShipmentEvents::delete_many()
        .filter(EventCol::ShipmentId.is_in(shipment_ids.clone()))
        .exec(&txn)
        .await?;
    OrderItems::delete_many()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .exec(&txn)
        .await?;
    Shipments::delete_many()
        .filter(ShipmentCol::Id.is_in(shipment_ids))
        .exec(&txn)
        .await?;
    Orders::delete_by_id(order.id).exec(&txn).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        state,
        Some(user.user_id),
        "order_expired",
        Some("orders"),
        Some(serde_json::json!({ "order_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order expired",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let items = load_item_views(&state.orm, order.id).await?;
    let status = aggregate_status(&items)?;
    let placed_at = first_event_date(&items)?;

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order: order_from_entity(order),
            status,
            placed_at,
            items,
        },
        Some(Meta::empty()),
    ))
}

/// A producer's view of an order: only their items, with the aggregate
/// status resolved over that subset.
pub async fn get_order_for_producer(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<ProducerOrderView>> {
    ensure_producer(user)?;

    let order = Orders::find_by_id(id).one(&state.orm).await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let items = load_item_views(&state.orm, order.id).await?;
    let scoped: Vec<OrderItemView> = items
        .iter()
        .filter(|view| view.producer_id == user.user_id)
        .cloned()
        .collect();
    if scoped.is_empty() {
        return Err(AppError::NotFound);
    }

    let status = aggregate_status_for_producer(&items, user.user_id)?;

    Ok(ApiResponse::success(
        "OK",
        ProducerOrderView {
            order_id: order.id,
            status,
            items: scoped,
        },
        Some(Meta::empty()),
    ))
}

/// Append one event to the shipment of every item in the order — a fan-out
/// write. Writes are sequential; all-or-nothing comes from the caller's
/// transaction.
async fn append_event_to_items<C>(
    conn: &C,
    order_id: Uuid,
    status: ShipmentStatus,
    address_id: Uuid,
) -> AppResult<()>
where
    C: ConnectionTrait,
{
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .all(conn)
        .await?;
    if items.is_empty() {
        return Err(DomainError::EmptyOrder.into());
    }

    let now = Utc::now();
    for item in &items {
        ShipmentEventActive {
            id: Set(Uuid::new_v4()),
            shipment_id: Set(item.shipment_id),
            status: Set(status.as_str().to_string()),
            date: Set(now.into()),
            address_id: Set(address_id),
        }
        .insert(conn)
        .await?;
    }

    Ok(())
}

pub(crate) async fn load_item_views<C>(conn: &C, order_id: Uuid) -> AppResult<Vec<OrderItemView>>
where
    C: ConnectionTrait,
{
    let mut views = load_item_views_for_orders(conn, &[order_id]).await?;
    Ok(views.remove(&order_id).unwrap_or_default())
}

/// Batched fetch of every order's items with their producer and event
/// history, joined in memory.
pub(crate) async fn load_item_views_for_orders<C>(
    conn: &C,
    order_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, Vec<OrderItemView>>>
where
    C: ConnectionTrait,
{
    if order_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.is_in(order_ids.to_vec()))
        .order_by_asc(OrderItemCol::CreatedAt)
        .all(conn)
        .await?;

    let product_ids: Vec<Uuid> = items.iter().map(|item| item.product_id).collect();
    let producers: HashMap<Uuid, Uuid> = Products::find()
        .filter(ProdCol::Id.is_in(product_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|product| (product.id, product.producer_id))
        .collect();

    let shipment_ids: Vec<Uuid> = items.iter().map(|item| item.shipment_id).collect();
    let event_models = ShipmentEvents::find()
        .filter(EventCol::ShipmentId.is_in(shipment_ids))
        .order_by_asc(EventCol::Date)
        .all(conn)
        .await?;
    let mut events_by_shipment: HashMap<Uuid, Vec<ShipmentEvent>> = HashMap::new();
    for model in event_models {
        let event = shipment_event_from_entity(model)?;
        events_by_shipment
            .entry(event.shipment_id)
            .or_default()
            .push(event);
    }

    let mut views: HashMap<Uuid, Vec<OrderItemView>> = HashMap::new();
    for model in items {
        let item = order_item_from_entity(model);
        let producer_id = producers
            .get(&item.product_id)
            .copied()
            .ok_or(AppError::NotFound)?;
        let events = events_by_shipment
            .remove(&item.shipment_id)
            .unwrap_or_default();
        views.entry(item.order_id).or_default().push(OrderItemView {
            item,
            producer_id,
            events,
        });
    }

    Ok(views)
}

pub(crate) fn order_from_entity(model: OrderModel) -> Order {
    Order {
        id: model.id,
        user_id: model.user_id,
        shipping_address_id: model.shipping_address_id,
        total_amount: model.total_amount,
        invoice_number: model.invoice_number,
        payment_id: model.payment_id,
        paid_at: model.paid_at.map(|dt| dt.with_timezone(&Utc)),
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub(crate) fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        shipment_id: model.shipment_id,
        quantity: model.quantity,
        price: model.price,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub(crate) fn shipment_event_from_entity(model: ShipmentEventModel) -> AppResult<ShipmentEvent> {
    Ok(ShipmentEvent {
        id: model.id,
        shipment_id: model.shipment_id,
        status: model.status.parse()?,
        date: model.date.with_timezone(&Utc),
        address_id: model.address_id,
    })
}

fn build_invoice_number(order_id: Uuid) -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix = order_id.to_string();
    let short = &suffix[..8];
    format!("INV-{}-{}", date, short)
}
