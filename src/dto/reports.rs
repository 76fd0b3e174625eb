use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::evolution::MonthYear;
use crate::domain::reports::{ReportEntry, ReportMetric};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReportQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub metric: ReportMetric,
    pub category_id: Option<Uuid>,
    pub radius_km: Option<f64>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportEntryDto {
    pub id: Uuid,
    pub name: String,
    pub orders: u64,
    pub cancelled_orders: u64,
    pub quantity: i64,
    pub cancelled_quantity: i64,
    pub revenue: i64,
    pub cancelled_revenue: i64,
    pub distinct_products: u64,
}

impl From<ReportEntry> for ReportEntryDto {
    fn from(entry: ReportEntry) -> Self {
        Self {
            id: entry.id,
            name: entry.name,
            orders: entry.orders,
            cancelled_orders: entry.cancelled_orders,
            quantity: entry.quantity,
            cancelled_quantity: entry.cancelled_quantity,
            revenue: entry.revenue,
            cancelled_revenue: entry.cancelled_revenue,
            distinct_products: entry.distinct_products,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ReportEntryList {
    #[schema(value_type = Vec<ReportEntryDto>)]
    pub items: Vec<ReportEntryDto>,
}

/// One month/year bucket, e.g. `{"period": "3/2024", "total": 8}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct EvolutionPoint {
    pub period: String,
    pub total: i64,
}

impl From<(MonthYear, i64)> for EvolutionPoint {
    fn from((period, total): (MonthYear, i64)) -> Self {
        Self {
            period: period.to_string(),
            total,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct EvolutionSeries {
    #[schema(value_type = Vec<EvolutionPoint>)]
    pub points: Vec<EvolutionPoint>,
}
