use crate::{
    entities::{product, Product, ProductImage},
    errors::ServiceError,
    services::ImageView,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use serde::Serialize;
use std::sync::Arc;

const POPULAR_LIMIT: u64 = 4;

/// Read-side product browsing. Prices observed here are always
/// sale-adjusted because the price ledger runs ahead of every
/// storefront request.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Full product card.
    pub async fn get_product(&self, product_id: i32) -> Result<ProductView, ServiceError> {
        let record = Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        self.render(&*self.db, record).await
    }

    /// Best sellers still in stock.
    pub async fn popular_products(&self) -> Result<Vec<ProductView>, ServiceError> {
        let records = Product::find()
            .filter(product::Column::Count.gt(0))
            .order_by_desc(product::Column::Sold)
            .limit(POPULAR_LIMIT)
            .all(&*self.db)
            .await?;

        self.render_all(records).await
    }

    /// Limited-run products, priciest first.
    pub async fn limited_products(&self) -> Result<Vec<ProductView>, ServiceError> {
        let records = Product::find()
            .filter(product::Column::IsLimited.eq(true))
            .order_by_desc(product::Column::Price)
            .all(&*self.db)
            .await?;

        self.render_all(records).await
    }

    async fn render_all(
        &self,
        records: Vec<product::Model>,
    ) -> Result<Vec<ProductView>, ServiceError> {
        let mut views = Vec::with_capacity(records.len());
        for record in records {
            views.push(self.render(&*self.db, record).await?);
        }
        Ok(views)
    }

    async fn render(
        &self,
        conn: &impl ConnectionTrait,
        record: product::Model,
    ) -> Result<ProductView, ServiceError> {
        let images = record
            .find_related(ProductImage)
            .all(conn)
            .await?
            .into_iter()
            .map(ImageView::from)
            .collect();

        Ok(ProductView {
            id: record.id,
            category: record.category_id,
            title: record.title,
            description: record.description,
            full_description: record.full_description,
            price: record.price,
            count: record.count,
            free_delivery: record.free_delivery,
            images,
            rating: record.rating,
            date: record.created_at,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    pub id: i32,
    pub category: i32,
    pub title: String,
    pub description: String,
    pub full_description: String,
    pub price: Decimal,
    pub count: i32,
    pub free_delivery: bool,
    pub images: Vec<ImageView>,
    pub rating: f64,
    pub date: DateTime<Utc>,
}
