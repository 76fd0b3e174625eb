use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{DomainError, DomainResult};
use crate::models::ShipmentEvent;

/// Shipment lifecycle states.
///
/// Forward progress is ordered `Processing < Shipped < Delivered`.
/// `Cancelled` sits outside that ordering: it absorbs any group it appears
/// in and is never compared by rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ShipmentStatus {
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl ShipmentStatus {
    /// Position in the forward progression. `Cancelled` has no rank;
    /// callers must resolve it before comparing.
    pub fn rank(&self) -> Option<u8> {
        match self {
            ShipmentStatus::Processing => Some(1),
            ShipmentStatus::Shipped => Some(2),
            ShipmentStatus::Delivered => Some(3),
            ShipmentStatus::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ShipmentStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentStatus::Processing => "processing",
            ShipmentStatus::Shipped => "shipped",
            ShipmentStatus::Delivered => "delivered",
            ShipmentStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ShipmentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(ShipmentStatus::Processing),
            "shipped" => Ok(ShipmentStatus::Shipped),
            "delivered" => Ok(ShipmentStatus::Delivered),
            "cancelled" => Ok(ShipmentStatus::Cancelled),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}

/// Status of the shipment's latest event by date.
///
/// Events are append-only, so a date tie resolves to the later event in
/// append order. An empty history is a caller error, not a default.
pub fn actual_status(events: &[ShipmentEvent]) -> DomainResult<ShipmentStatus> {
    events
        .iter()
        .max_by_key(|event| event.date)
        .map(|event| event.status)
        .ok_or(DomainError::EmptyShipment)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use super::*;

    fn event(day: u32, status: ShipmentStatus) -> ShipmentEvent {
        ShipmentEvent {
            id: Uuid::new_v4(),
            shipment_id: Uuid::new_v4(),
            status,
            date: Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap(),
            address_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn actual_status_follows_latest_event() {
        let events = vec![
            event(1, ShipmentStatus::Processing),
            event(5, ShipmentStatus::Shipped),
            event(3, ShipmentStatus::Processing),
        ];
        assert_eq!(actual_status(&events).unwrap(), ShipmentStatus::Shipped);
    }

    #[test]
    fn actual_status_tie_resolves_to_later_append() {
        let first = event(2, ShipmentStatus::Processing);
        let mut second = event(2, ShipmentStatus::Shipped);
        second.date = first.date;
        assert_eq!(
            actual_status(&[first, second]).unwrap(),
            ShipmentStatus::Shipped
        );
    }

    #[test]
    fn actual_status_rejects_empty_history() {
        assert_eq!(actual_status(&[]), Err(DomainError::EmptyShipment));
    }

    #[test]
    fn status_string_round_trip() {
        for status in [
            ShipmentStatus::Processing,
            ShipmentStatus::Shipped,
            ShipmentStatus::Delivered,
            ShipmentStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<ShipmentStatus>().unwrap(), status);
        }
        assert!("paid".parse::<ShipmentStatus>().is_err());
    }

    #[test]
    fn cancelled_has_no_rank() {
        assert_eq!(ShipmentStatus::Cancelled.rank(), None);
        assert!(ShipmentStatus::Processing.rank() < ShipmentStatus::Shipped.rank());
        assert!(ShipmentStatus::Shipped.rank() < ShipmentStatus::Delivered.rank());
    }
}
