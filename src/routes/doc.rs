use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    domain::reports::ReportMetric,
    domain::status::ShipmentStatus,
    dto::{
        cart::{CartItemDto, CartList},
        orders::{
            CheckoutRequest, EmitEventRequest, OrderList, OrderSummary, OrderWithItems,
            PayOrderRequest, ProducerOrderView,
        },
        products,
        reports::{EvolutionPoint, EvolutionSeries, ReportEntryDto, ReportEntryList},
    },
    models::{Address, Carrier, CartItem, Category, Order, OrderItem, OrderItemView, Product,
        Shipment, ShipmentEvent, User},
    response::{ApiResponse, Meta},
    routes::{cart, health, orders, params, products as product_routes, reports},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        cart::cart_list,
        cart::add_to_cart,
        cart::remove_from_cart,
        product_routes::list_products,
        product_routes::list_categories,
        product_routes::create_product,
        product_routes::get_product,
        product_routes::update_product,
        product_routes::delete_product,
        orders::list_orders,
        orders::checkout,
        orders::get_order,
        orders::pay_order,
        orders::cancel_order,
        orders::emit_event,
        orders::expire_order,
        orders::producer_view,
        reports::products_report,
        reports::clients_report,
        reports::evolution_report
    ),
    components(
        schemas(
            User,
            Address,
            Category,
            Carrier,
            Product,
            CartItem,
            Order,
            OrderItem,
            OrderItemView,
            Shipment,
            ShipmentEvent,
            ShipmentStatus,
            ReportMetric,
            CartList,
            CartItemDto,
            CheckoutRequest,
            PayOrderRequest,
            EmitEventRequest,
            OrderSummary,
            OrderList,
            OrderWithItems,
            ProducerOrderView,
            ReportEntryDto,
            ReportEntryList,
            EvolutionPoint,
            EvolutionSeries,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            products::ProductList,
            Meta,
            ApiResponse<Product>,
            ApiResponse<products::ProductList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<ReportEntryList>,
            ApiResponse<EvolutionSeries>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Order lifecycle endpoints"),
        (name = "Reports", description = "Producer and admin reporting endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
