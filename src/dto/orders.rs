use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::status::ShipmentStatus;
use crate::models::{Order, OrderItemView};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub shipping_address_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PayOrderRequest {
    pub payment_id: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EmitEventRequest {
    pub status: ShipmentStatus,
    pub address_id: Uuid,
    /// Assign this carrier to every item's shipment along with the event.
    pub carrier_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderSummary {
    pub order: Order,
    pub status: ShipmentStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<OrderSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub status: ShipmentStatus,
    pub placed_at: DateTime<Utc>,
    pub items: Vec<OrderItemView>,
}

/// One producer's slice of an order: only their items, with the status
/// resolved over that subset alone.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProducerOrderView {
    pub order_id: Uuid,
    pub status: ShipmentStatus,
    pub items: Vec<OrderItemView>,
}
