use crate::{
    entities::{cart_line, sale, CartLine, Product, ProductImage, Sale},
    errors::ServiceError,
    events::{Event, EventSender},
    services::ImageView,
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    ModelTrait, NotSet, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

/// Who a cart belongs to. Anonymous carts are keyed by a client session
/// id, identified carts by the authenticated user id. The two paths
/// stay separate: authenticating does not merge an anonymous cart into
/// the user's cart. A future merge step would slot in at login, reading
/// the session-keyed lines and folding them into the user-keyed ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartOwner {
    Anonymous(String),
    Identified(i32),
}

impl CartOwner {
    fn condition(&self) -> Condition {
        match self {
            CartOwner::Identified(user_id) => {
                Condition::all().add(cart_line::Column::UserId.eq(*user_id))
            }
            CartOwner::Anonymous(session_id) => {
                Condition::all().add(cart_line::Column::SessionId.eq(session_id.clone()))
            }
        }
    }
}

/// Cart aggregator: a multiset of (product, quantity) entries per owner.
///
/// At most one line exists per (owner, product); adds merge quantities
/// and removes floor at zero by deleting the line.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Current cart content for the owner, materialized with live
    /// product data. An owner with no lines gets an empty list; nothing
    /// is persisted by reading.
    pub async fn list(&self, owner: &CartOwner) -> Result<Vec<CartLineView>, ServiceError> {
        self.materialize(&*self.db, owner).await
    }

    /// Add `count` of a product to the owner's cart, merging into an
    /// existing line when one exists. Returns the refreshed line list.
    #[instrument(skip(self))]
    pub async fn add(
        &self,
        owner: &CartOwner,
        product_id: i32,
        count: i32,
    ) -> Result<Vec<CartLineView>, ServiceError> {
        if count < 1 {
            return Err(ServiceError::ValidationError(
                "count must be at least 1".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let product = Product::find_by_id(product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let existing = CartLine::find()
            .filter(owner.condition())
            .filter(cart_line::Column::ProductId.eq(product_id))
            .one(&txn)
            .await?;

        if let Some(line) = existing {
            let merged = line.count + count;
            let mut line: cart_line::ActiveModel = line.into();
            line.count = Set(merged);
            line.update(&txn).await?;
        } else {
            let (user_id, session_id) = match owner {
                CartOwner::Identified(user_id) => (Some(*user_id), None),
                CartOwner::Anonymous(session_id) => (None, Some(session_id.clone())),
            };

            cart_line::ActiveModel {
                id: NotSet,
                user_id: Set(user_id),
                session_id: Set(session_id),
                product_id: Set(product_id),
                count: Set(count),
            }
            .insert(&txn)
            .await?;

            // First line for this product: re-sync the charge price
            // against an active sale in case the ledger has not caught
            // up with it yet.
            let active_sale = Sale::find()
                .filter(sale::Column::ProductId.eq(product_id))
                .filter(sale::Column::IsActive.eq(true))
                .one(&txn)
                .await?;
            if let Some(active_sale) = active_sale {
                if product.price != active_sale.sale_price {
                    let sale_price = active_sale.sale_price;
                    let mut product: crate::entities::product::ActiveModel = product.into();
                    product.price = Set(sale_price);
                    product.update(&txn).await?;
                }
            }
        }

        let lines = self.materialize(&txn, owner).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartLineAdded { product_id, count })
            .await;

        info!(product_id, count, "added product to cart");
        Ok(lines)
    }

    /// Remove `count` of a product from the owner's cart. A line
    /// reaching zero or below is deleted; removing from a missing line
    /// is a no-op. Returns the refreshed line list.
    #[instrument(skip(self))]
    pub async fn remove(
        &self,
        owner: &CartOwner,
        product_id: i32,
        count: i32,
    ) -> Result<Vec<CartLineView>, ServiceError> {
        let txn = self.db.begin().await?;

        let existing = CartLine::find()
            .filter(owner.condition())
            .filter(cart_line::Column::ProductId.eq(product_id))
            .one(&txn)
            .await?;

        if let Some(line) = existing {
            let remaining = line.count - count;
            if remaining <= 0 {
                line.delete(&txn).await?;
            } else {
                let mut line: cart_line::ActiveModel = line.into();
                line.count = Set(remaining);
                line.update(&txn).await?;
            }
        }

        let lines = self.materialize(&txn, owner).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartLineRemoved { product_id, count })
            .await;

        Ok(lines)
    }

    /// Render the owner's lines with current product fields. The price
    /// shown is the live `product.price`, which the price ledger keeps
    /// sale-adjusted.
    async fn materialize(
        &self,
        conn: &impl ConnectionTrait,
        owner: &CartOwner,
    ) -> Result<Vec<CartLineView>, ServiceError> {
        let rows = CartLine::find()
            .filter(owner.condition())
            .order_by_asc(cart_line::Column::ProductId)
            .find_also_related(Product)
            .all(conn)
            .await?;

        let mut views = Vec::with_capacity(rows.len());
        for (line, product) in rows {
            let Some(product) = product else {
                continue;
            };
            let images = product
                .find_related(ProductImage)
                .all(conn)
                .await?
                .into_iter()
                .map(ImageView::from)
                .collect();

            views.push(CartLineView {
                id: product.id,
                category: product.category_id,
                title: product.title,
                description: product.description,
                price: product.price,
                count: line.count,
                free_delivery: product.free_delivery,
                images,
                rating: product.rating,
            });
        }

        Ok(views)
    }
}

/// A cart line rendered for display: product fields plus the quantity
/// held in this cart.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineView {
    pub id: i32,
    pub category: i32,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub count: i32,
    pub free_delivery: bool,
    pub images: Vec<ImageView>,
    pub rating: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_paths_are_distinct() {
        assert_ne!(
            CartOwner::Anonymous("7".to_string()),
            CartOwner::Identified(7)
        );
    }

    #[test]
    fn cart_line_view_serializes_camel_case() {
        let view = CartLineView {
            id: 1,
            category: 2,
            title: "Mug".to_string(),
            description: "A mug".to_string(),
            price: rust_decimal_macros::dec!(4.20),
            count: 3,
            free_delivery: true,
            images: vec![],
            rating: 4.5,
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["freeDelivery"], serde_json::json!(true));
        assert_eq!(json["count"], serde_json::json!(3));
        assert!(json.get("free_delivery").is_none());
    }
}
