use axum_marketplace_api::{
    db::{create_orm_conn, run_migrations},
    domain::reports::ReportMetric,
    domain::status::ShipmentStatus,
    dto::cart::AddToCartRequest,
    dto::orders::{CheckoutRequest, EmitEventRequest, PayOrderRequest},
    dto::products::UpdateProductRequest,
    dto::reports::ReportQuery,
    entity::{
        addresses::ActiveModel as AddressActive, categories::ActiveModel as CategoryActive,
        products::ActiveModel as ProductActive, users::ActiveModel as UserActive,
    },
    middleware::auth::AuthUser,
    services::{cart_service, order_service, product_service, report_service},
    state::AppState,
};
use chrono::{Duration, Utc};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set, Statement};
use uuid::Uuid;

// Integration flow: consumer fills the cart and checks out, pays, the admin
// moves the shipment along, and the reports pick the order up.
#[tokio::test]
async fn checkout_pay_ship_and_report_flow() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let state = setup_state(&database_url).await?;

    // Addresses for the producer's unit and the consumer's door.
    let producer_address = create_address(&state, "Porto", 41.1579, -8.6291).await?;
    let shipping_address = create_address(&state, "Lisboa", 38.7223, -9.1393).await?;

    let consumer_id = create_user(&state, "consumer", "maria@example.com", None).await?;
    let producer_id =
        create_user(&state, "producer", "farm@example.com", Some(producer_address)).await?;
    let admin_id = create_user(&state, "admin", "admin@example.com", None).await?;

    let category_id = Uuid::new_v4();
    CategoryActive {
        id: Set(category_id),
        name: Set("Pantry".into()),
        parent_id: Set(None),
    }
    .insert(&state.orm)
    .await?;

    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        producer_id: Set(producer_id),
        category_id: Set(Some(category_id)),
        name: Set("Olive oil".into()),
        description: Set(Some("A product for testing".into())),
        price: Set(1000),
        stock: Set(10),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let consumer = AuthUser {
        user_id: consumer_id,
        role: "consumer".into(),
    };
    let producer = AuthUser {
        user_id: producer_id,
        role: "producer".into(),
    };
    let admin = AuthUser {
        user_id: admin_id,
        role: "admin".into(),
    };

    // Add to cart and check out.
    cart_service::add_to_cart(
        &state,
        &consumer,
        AddToCartRequest {
            product_id: product.id,
            quantity: 2,
        },
    )
    .await?;

    let checkout_resp = order_service::checkout(
        &state,
        &consumer,
        CheckoutRequest {
            shipping_address_id: shipping_address,
        },
    )
    .await?;
    let placed = checkout_resp.data.unwrap();
    assert_eq!(placed.order.total_amount, 2000);
    assert_eq!(placed.status, ShipmentStatus::Processing);
    assert_eq!(placed.items.len(), 1);
    let order_id = placed.order.id;

    // Catalog price changes must not touch the stored snapshot.
    product_service::update_product(
        &state,
        &producer,
        product.id,
        UpdateProductRequest {
            name: None,
            description: None,
            price: Some(9999),
            stock: None,
            category_id: None,
        },
    )
    .await?;
    let fetched = order_service::get_order(&state, &consumer, order_id)
        .await?
        .data
        .unwrap();
    assert_eq!(fetched.items[0].item.price, 1000);

    // Pay.
    let pay_resp = order_service::pay_order(
        &state,
        &consumer,
        order_id,
        PayOrderRequest {
            payment_id: "pm_test_123".into(),
        },
    )
    .await?;
    let paid = pay_resp.data.unwrap();
    assert_eq!(paid.order.payment_id.as_deref(), Some("pm_test_123"));
    assert_eq!(paid.status, ShipmentStatus::Processing);

    // The producer sees their slice with the scoped status.
    let producer_resp = order_service::get_order_for_producer(&state, &producer, order_id)
        .await?
        .data
        .unwrap();
    assert_eq!(producer_resp.status, ShipmentStatus::Processing);
    assert_eq!(producer_resp.items.len(), 1);

    // Admin marks the whole order shipped.
    let shipped = order_service::emit_order_event(
        &state,
        &admin,
        order_id,
        EmitEventRequest {
            status: ShipmentStatus::Shipped,
            address_id: producer_address,
            carrier_id: None,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(shipped.status, ShipmentStatus::Shipped);

    // A shipped order can no longer be cancelled.
    assert!(
        order_service::cancel_order(&state, &consumer, order_id)
            .await
            .is_err()
    );

    // Reports pick the order up.
    let window = ReportQuery {
        start_date: (Utc::now() - Duration::days(1)).date_naive(),
        end_date: (Utc::now() + Duration::days(1)).date_naive(),
        metric: ReportMetric::OrderCount,
        category_id: Some(category_id),
        radius_km: None,
    };
    let products_resp = report_service::products_report(&state, &admin, window)
        .await?
        .data
        .unwrap();
    assert_eq!(products_resp.items.len(), 1);
    assert_eq!(products_resp.items[0].orders, 1);
    assert_eq!(products_resp.items[0].cancelled_orders, 0);

    let evolution_query = ReportQuery {
        start_date: (Utc::now() - Duration::days(1)).date_naive(),
        end_date: (Utc::now() + Duration::days(1)).date_naive(),
        metric: ReportMetric::ProductTotal,
        category_id: None,
        radius_km: None,
    };
    let series = report_service::evolution_report(&state, &admin, evolution_query)
        .await?
        .data
        .unwrap();
    assert_eq!(series.points.len(), 1);
    assert_eq!(series.points[0].total, 2);

    // Unpaid orders can be expired, releasing the reserved stock.
    cart_service::add_to_cart(
        &state,
        &consumer,
        AddToCartRequest {
            product_id: product.id,
            quantity: 3,
        },
    )
    .await?;
    let second = order_service::checkout(
        &state,
        &consumer,
        CheckoutRequest {
            shipping_address_id: shipping_address,
        },
    )
    .await?
    .data
    .unwrap();
    let stock_after_second = product_service::get_product(&state, product.id)
        .await?
        .data
        .unwrap()
        .stock;
    assert_eq!(stock_after_second, 5);

    order_service::expire_unpaid(&state, &admin, second.order.id).await?;
    let stock_after_expiry = product_service::get_product(&state, product.id)
        .await?
        .data
        .unwrap()
        .stock;
    assert_eq!(stock_after_expiry, 8);

    Ok(())
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE shipment_events, order_items, shipments, orders, cart_items, audit_logs, products, categories, carriers, users, addresses RESTART IDENTITY CASCADE",
    ))
    .await?;

    Ok(AppState { orm })
}

async fn create_address(
    state: &AppState,
    city: &str,
    latitude: f64,
    longitude: f64,
) -> anyhow::Result<Uuid> {
    let address = AddressActive {
        id: Set(Uuid::new_v4()),
        street: Set("Rua Principal 1".into()),
        city: Set(city.to_string()),
        postal_code: Set("1000-001".into()),
        country: Set("PT".into()),
        latitude: Set(latitude),
        longitude: Set(longitude),
    }
    .insert(&state.orm)
    .await?;

    Ok(address.id)
}

async fn create_user(
    state: &AppState,
    role: &str,
    email: &str,
    address_id: Option<Uuid>,
) -> anyhow::Result<Uuid> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        name: Set(email.split('@').next().unwrap_or("user").to_string()),
        role: Set(role.into()),
        address_id: Set(address_id),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(user.id)
}
