use std::sync::Arc;

use axum::Router;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, NotSet, QueryFilter, Set};
use tokio::sync::mpsc;

use storefront_api::{
    auth,
    config::AppConfig,
    db::{self, DbConfig},
    entities::{cart_line, category, product, profile, sale},
    events::{self, EventSender},
    handlers::AppServices,
    AppState,
};

pub const TEST_JWT_SECRET: &str = "test_secret_key_for_testing_purposes_only";

/// Test harness: application state and router backed by a private
/// in-memory SQLite database (single pooled connection, so the whole
/// test sees one consistent store).
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let cfg = AppConfig::new(
            "sqlite::memory:",
            TEST_JWT_SECRET,
            "127.0.0.1",
            18_080,
            "test",
        );

        let db_cfg = DbConfig {
            url: cfg.database_url.clone(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let pool = db::establish_connection_with_config(&db_cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool).await.expect("migrations failed");
        let db_arc = Arc::new(pool);

        let (event_tx, event_rx) = mpsc::channel(64);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let services = AppServices::new(
            db_arc.clone(),
            Arc::new(event_sender.clone()),
            Arc::new(cfg.clone()),
        );

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        };
        let router = storefront_api::build_router(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
        }
    }

    /// Bearer token for an identified caller, as the external identity
    /// provider would issue it.
    pub fn token_for(&self, user_id: i32) -> String {
        auth::mint_token(user_id, TEST_JWT_SECRET, 3600)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub async fn seed_category(app: &TestApp) -> i32 {
    category::ActiveModel {
        id: NotSet,
        title: Set("Household".to_string()),
        parent_id: Set(None),
    }
    .insert(&*app.state.db)
    .await
    .expect("failed to seed category")
    .id
}

pub async fn seed_product(app: &TestApp, title: &str, price: Decimal, count: i32) -> i32 {
    let category_id = seed_category(app).await;
    product::ActiveModel {
        id: NotSet,
        category_id: Set(category_id),
        title: Set(title.to_string()),
        description: Set(format!("{title} description")),
        full_description: Set(format!("{title} full description")),
        price: Set(price),
        count: Set(count),
        sold: Set(0),
        free_delivery: Set(false),
        is_limited: Set(false),
        rating: Set(0.0),
        created_at: Set(Utc::now()),
    }
    .insert(&*app.state.db)
    .await
    .expect("failed to seed product")
    .id
}

pub async fn seed_sale(
    app: &TestApp,
    product_id: i32,
    sale_price: Decimal,
    date_from: NaiveDate,
    date_to: NaiveDate,
) -> i32 {
    sale::ActiveModel {
        id: NotSet,
        product_id: Set(product_id),
        old_price: Set(Decimal::ZERO),
        sale_price: Set(sale_price),
        date_from: Set(date_from),
        date_to: Set(date_to),
        is_applied: Set(false),
        is_active: Set(false),
    }
    .insert(&*app.state.db)
    .await
    .expect("failed to seed sale")
    .id
}

pub async fn seed_profile(app: &TestApp, user_id: i32, full_name: &str, email: &str, phone: &str) {
    profile::ActiveModel {
        id: NotSet,
        user_id: Set(user_id),
        full_name: Set(Some(full_name.to_string())),
        email: Set(Some(email.to_string())),
        phone: Set(Some(phone.to_string())),
    }
    .insert(&*app.state.db)
    .await
    .expect("failed to seed profile");
}

pub async fn set_product_price(app: &TestApp, product_id: i32, price: Decimal) {
    let record = fetch_product(app, product_id).await;
    let mut update: product::ActiveModel = record.into();
    update.price = Set(price);
    update
        .update(&*app.state.db)
        .await
        .expect("failed to update product price");
}

pub async fn fetch_product(app: &TestApp, product_id: i32) -> product::Model {
    product::Entity::find_by_id(product_id)
        .one(&*app.state.db)
        .await
        .expect("product query failed")
        .expect("product missing")
}

pub async fn fetch_sale(app: &TestApp, product_id: i32) -> Option<sale::Model> {
    sale::Entity::find()
        .filter(sale::Column::ProductId.eq(product_id))
        .one(&*app.state.db)
        .await
        .expect("sale query failed")
}

pub async fn cart_rows(app: &TestApp) -> Vec<cart_line::Model> {
    cart_line::Entity::find()
        .all(&*app.state.db)
        .await
        .expect("cart query failed")
}
