pub mod basket;
pub mod catalog;
pub mod common;
pub mod orders;
pub mod payment;
pub mod profile;
pub mod sales;

use std::sync::Arc;

use crate::{config::AppConfig, db::DbPool, events::EventSender};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub pricing: Arc<crate::services::pricing::PricingService>,
    pub cart: Arc<crate::services::cart::CartService>,
    pub orders: Arc<crate::services::orders::OrderService>,
    pub checkout: Arc<crate::services::checkout::CheckoutService>,
    pub catalog: Arc<crate::services::catalog::CatalogService>,
    pub profiles: Arc<crate::services::profiles::ProfileService>,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>, config: Arc<AppConfig>) -> Self {
        Self {
            pricing: Arc::new(crate::services::pricing::PricingService::new(
                db.clone(),
                event_sender.clone(),
                config,
            )),
            cart: Arc::new(crate::services::cart::CartService::new(
                db.clone(),
                event_sender.clone(),
            )),
            orders: Arc::new(crate::services::orders::OrderService::new(
                db.clone(),
                event_sender.clone(),
            )),
            checkout: Arc::new(crate::services::checkout::CheckoutService::new(
                db.clone(),
                event_sender.clone(),
            )),
            catalog: Arc::new(crate::services::catalog::CatalogService::new(db.clone())),
            profiles: Arc::new(crate::services::profiles::ProfileService::new(
                db,
                event_sender,
            )),
        }
    }
}
