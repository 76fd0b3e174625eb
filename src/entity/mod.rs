pub mod addresses;
pub mod audit_logs;
pub mod carriers;
pub mod cart_items;
pub mod categories;
pub mod order_items;
pub mod orders;
pub mod products;
pub mod shipment_events;
pub mod shipments;
pub mod users;

pub use addresses::Entity as Addresses;
pub use audit_logs::Entity as AuditLogs;
pub use carriers::Entity as Carriers;
pub use cart_items::Entity as CartItems;
pub use categories::Entity as Categories;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
pub use shipment_events::Entity as ShipmentEvents;
pub use shipments::Entity as Shipments;
pub use users::Entity as Users;
