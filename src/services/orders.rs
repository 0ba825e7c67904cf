use crate::{
    entities::{
        order, order_history, order_line, profile, Order, OrderHistory, OrderLine, Product, Profile,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, NotSet,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

/// Order assembler: snapshots cart lines into immutable orders.
///
/// Creation validates stock for every line up front and rejects the
/// whole order on any shortfall; it never mutates stock or carts
/// itself — that is deferred to payment. An order can sit in
/// `status="created"` indefinitely without consuming inventory.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Create an order from the caller's materialized cart lines.
    ///
    /// Line prices are taken from the caller-supplied payload, so the
    /// order snapshots what the client displayed at the time. When the
    /// caller is identified, contact fields are copied from their
    /// profile.
    #[instrument(skip(self, lines))]
    pub async fn create(
        &self,
        lines: Vec<OrderLineInput>,
        caller: Option<i32>,
    ) -> Result<i32, ServiceError> {
        if lines.is_empty() {
            return Err(ServiceError::ValidationError(
                "order must contain at least one line".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        // All-or-nothing stock check before anything is written.
        for line in &lines {
            let product = Product::find_by_id(line.id)
                .one(&txn)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", line.id)))?;

            if product.count - line.count < 0 {
                return Err(ServiceError::InsufficientStock(format!(
                    "product {}: requested {}, in stock {}",
                    line.id, line.count, product.count
                )));
            }
        }

        let mut shell = order::ActiveModel {
            id: NotSet,
            created_at: Set(Utc::now()),
            full_name: Set(None),
            email: Set(None),
            phone: Set(None),
            delivery_type: Set(None),
            payment_type: Set(None),
            total_cost: Set(None),
            status: Set(None),
            city: Set(None),
            address: Set(None),
        };

        if let Some(user_id) = caller {
            let contact = Profile::find()
                .filter(profile::Column::UserId.eq(user_id))
                .one(&txn)
                .await?;
            if let Some(contact) = contact {
                shell.full_name = Set(contact.full_name);
                shell.email = Set(contact.email);
                shell.phone = Set(contact.phone);
            }
        }

        let created = shell.insert(&txn).await?;

        for line in &lines {
            order_line::ActiveModel {
                id: NotSet,
                order_id: Set(created.id),
                product_id: Set(line.id),
                count: Set(line.count),
                price: Set(line.price),
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderCreated(created.id))
            .await;

        info!(order_id = created.id, lines = lines.len(), "order created");
        Ok(created.id)
    }

    /// Attach delivery/contact/payment metadata to an existing order.
    ///
    /// Re-invoking overwrites previous values. `total_cost` defaults to
    /// the sum of the order's own line snapshots when the caller does
    /// not supply one.
    #[instrument(skip(self, input))]
    pub async fn add_order_info(
        &self,
        order_id: i32,
        input: OrderInfoInput,
    ) -> Result<i32, ServiceError> {
        let txn = self.db.begin().await?;

        let existing = Order::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let total_cost = match input.total_cost {
            Some(total) => total,
            None => self.line_total(&txn, order_id).await?,
        };

        let mut update: order::ActiveModel = existing.into();
        update.full_name = Set(input.full_name);
        update.email = Set(input.email);
        update.phone = Set(input.phone);
        update.delivery_type = Set(Some(
            input
                .delivery_type
                .unwrap_or_else(|| "ordinary".to_string()),
        ));
        update.payment_type = Set(Some(
            input.payment_type.unwrap_or_else(|| "online".to_string()),
        ));
        update.total_cost = Set(Some(total_cost));
        update.status = Set(Some(input.status.unwrap_or_else(|| "created".to_string())));
        update.city = Set(input.city);
        update.address = Set(input.address);
        update.update(&txn).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderUpdated(order_id))
            .await;

        Ok(order_id)
    }

    /// Order snapshot with its line items.
    pub async fn get(&self, order_id: i32) -> Result<OrderView, ServiceError> {
        let record = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        self.render(&*self.db, record).await
    }

    /// Orders this user has completed payment for, newest first.
    pub async fn history(&self, user_id: i32) -> Result<Vec<OrderView>, ServiceError> {
        let entries = OrderHistory::find()
            .filter(order_history::Column::UserId.eq(user_id))
            .order_by_desc(order_history::Column::Id)
            .all(&*self.db)
            .await?;

        let mut views = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some(record) = Order::find_by_id(entry.order_id).one(&*self.db).await? else {
                continue;
            };
            views.push(self.render(&*self.db, record).await?);
        }
        Ok(views)
    }

    async fn line_total(
        &self,
        conn: &impl ConnectionTrait,
        order_id: i32,
    ) -> Result<Decimal, ServiceError> {
        let lines = OrderLine::find()
            .filter(order_line::Column::OrderId.eq(order_id))
            .all(conn)
            .await?;

        Ok(lines
            .iter()
            .map(|line| line.price * Decimal::from(line.count))
            .sum())
    }

    async fn render(
        &self,
        conn: &impl ConnectionTrait,
        record: order::Model,
    ) -> Result<OrderView, ServiceError> {
        let lines = OrderLine::find()
            .filter(order_line::Column::OrderId.eq(record.id))
            .order_by_asc(order_line::Column::Id)
            .all(conn)
            .await?;

        let mut products = Vec::with_capacity(lines.len());
        for line in lines {
            let title = Product::find_by_id(line.product_id)
                .one(conn)
                .await?
                .map(|p| p.title)
                .unwrap_or_default();
            products.push(OrderProductView {
                id: line.product_id,
                title,
                count: line.count,
                price: line.price,
            });
        }

        Ok(OrderView {
            id: record.id,
            created_at: record.created_at,
            full_name: record.full_name,
            email: record.email,
            phone: record.phone,
            delivery_type: record.delivery_type,
            payment_type: record.payment_type,
            total_cost: record.total_cost,
            status: record.status,
            city: record.city,
            address: record.address,
            products,
        })
    }
}

/// One cart line as echoed by the client at order creation:
/// `{id, count, price}` with `id` the product id.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OrderLineInput {
    pub id: i32,
    #[validate(range(min = 1))]
    pub count: i32,
    pub price: Decimal,
}

/// Delivery/contact metadata attached after order creation.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderInfoInput {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub delivery_type: Option<String>,
    pub payment_type: Option<String>,
    pub total_cost: Option<Decimal>,
    pub status: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: i32,
    pub created_at: DateTime<Utc>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub delivery_type: Option<String>,
    pub payment_type: Option<String>,
    pub total_cost: Option<Decimal>,
    pub status: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub products: Vec<OrderProductView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderProductView {
    pub id: i32,
    pub title: String,
    pub count: i32,
    pub price: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn order_line_input_deserializes_from_client_payload() {
        let json = r#"{"id": 5, "count": 2, "price": "10.00"}"#;
        let input: OrderLineInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.id, 5);
        assert_eq!(input.count, 2);
        assert_eq!(input.price, dec!(10.00));
    }

    #[test]
    fn order_info_input_fields_all_optional() {
        let input: OrderInfoInput = serde_json::from_str("{}").unwrap();
        assert!(input.delivery_type.is_none());
        assert!(input.total_cost.is_none());
    }

    #[test]
    fn order_info_input_accepts_camel_case() {
        let json = r#"{"fullName": "Jo Doe", "deliveryType": "express", "totalCost": "20.00"}"#;
        let input: OrderInfoInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.full_name.as_deref(), Some("Jo Doe"));
        assert_eq!(input.delivery_type.as_deref(), Some("express"));
        assert_eq!(input.total_cost, Some(dec!(20.00)));
    }
}
