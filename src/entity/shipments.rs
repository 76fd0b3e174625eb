use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "shipments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    pub carrier_id: Option<Uuid>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::carriers::Entity",
        from = "Column::CarrierId",
        to = "super::carriers::Column::Id"
    )]
    Carriers,
    #[sea_orm(has_many = "super::shipment_events::Entity")]
    ShipmentEvents,
    #[sea_orm(has_many = "super::order_items::Entity")]
    OrderItems,
}

impl Related<super::carriers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Carriers.def()
    }
}

impl Related<super::shipment_events::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ShipmentEvents.def()
    }
}

impl Related<super::order_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
