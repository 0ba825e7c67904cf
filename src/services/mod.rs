//! Business logic layer. One service per storefront concern; each holds
//! the shared connection pool and the event sender.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod orders;
pub mod pricing;
pub mod profiles;

use serde::Serialize;

use crate::entities::product_image;

/// Image reference as rendered to clients.
#[derive(Debug, Clone, Serialize)]
pub struct ImageView {
    pub src: String,
    pub alt: String,
}

impl From<product_image::Model> for ImageView {
    fn from(model: product_image::Model) -> Self {
        Self {
            src: model.src,
            alt: model.alt,
        }
    }
}
