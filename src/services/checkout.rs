use crate::{
    entities::{cart_line, order, order_history, product, CartLine, Order, Product},
    errors::ServiceError,
    events::{Event, EventSender},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, NotSet,
    QueryFilter, Set, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};

/// Payment committer: turns a created order plus the caller's cart into
/// committed stock movement and a paid order, all or nothing.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

/// Payment instrument as submitted by the client.
#[derive(Debug, Clone, Deserialize)]
pub struct CardDetails {
    pub name: String,
    pub number: String,
    pub year: String,
    pub month: String,
    pub code: String,
}

/// Format-only instrument check: holder name of 2-3 words, 16-digit
/// number, 2-digit year and month, 3-digit code. No Luhn, expiry, or
/// network validation; payment here is a stub.
pub fn validate_card(card: &CardDetails) -> bool {
    let digits = |s: &str, len: usize| s.len() == len && s.chars().all(|c| c.is_ascii_digit());

    let words = card.name.split_whitespace().count();
    let valid_name = !card.name.trim().is_empty() && (2..=3).contains(&words);

    valid_name
        && digits(&card.number, 16)
        && digits(&card.year, 2)
        && digits(&card.month, 2)
        && digits(&card.code, 3)
}

impl CheckoutService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Commit payment for an order.
    ///
    /// An instrument failing the format check is rejected before any
    /// state is touched. Otherwise one transaction walks every cart
    /// line of the paying user: decrement stock, bump the sold counter,
    /// delete the line. Any shortfall aborts the whole transaction,
    /// including lines already processed in the loop. The same
    /// transaction marks the order paid and appends the history record,
    /// so a partially committed payment cannot be observed.
    #[instrument(skip(self, card))]
    pub async fn pay(
        &self,
        order_id: i32,
        user_id: i32,
        card: &CardDetails,
    ) -> Result<(), ServiceError> {
        if !validate_card(card) {
            return Err(ServiceError::PaymentRejected(
                "malformed payment instrument".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let lines = CartLine::find()
            .filter(cart_line::Column::UserId.eq(user_id))
            .all(&txn)
            .await?;

        for line in lines {
            let stock = Product::find_by_id(line.product_id)
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Product {} not found", line.product_id))
                })?;

            if stock.count - line.count < 0 {
                // Dropping the transaction rolls back every mutation
                // made so far in this loop.
                return Err(ServiceError::InsufficientStock(format!(
                    "product {}: requested {}, in stock {}",
                    line.product_id, line.count, stock.count
                )));
            }

            let new_count = stock.count - line.count;
            let new_sold = stock.sold + line.count;
            let mut stock: product::ActiveModel = stock.into();
            stock.count = Set(new_count);
            stock.sold = Set(new_sold);
            stock.update(&txn).await?;

            line.delete(&txn).await?;
        }

        let paid_order = Order::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let mut paid_order: order::ActiveModel = paid_order.into();
        paid_order.status = Set(Some("Paid".to_string()));
        paid_order.update(&txn).await?;

        order_history::ActiveModel {
            id: NotSet,
            user_id: Set(user_id),
            order_id: Set(order_id),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        self.event_sender.send_or_log(Event::OrderPaid(order_id)).await;

        info!(order_id, user_id, "payment committed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_card() -> CardDetails {
        CardDetails {
            name: "Jane Doe".to_string(),
            number: "1234567812345678".to_string(),
            year: "27".to_string(),
            month: "05".to_string(),
            code: "123".to_string(),
        }
    }

    #[test]
    fn accepts_well_formed_card() {
        assert!(validate_card(&valid_card()));
    }

    #[test]
    fn accepts_three_word_name() {
        let mut card = valid_card();
        card.name = "Jane Q Doe".to_string();
        assert!(validate_card(&card));
    }

    #[test]
    fn rejects_single_word_name() {
        let mut card = valid_card();
        card.name = "Jane".to_string();
        assert!(!validate_card(&card));
    }

    #[test]
    fn rejects_four_word_name() {
        let mut card = valid_card();
        card.name = "Jane Q Public Doe".to_string();
        assert!(!validate_card(&card));
    }

    #[test]
    fn rejects_blank_name() {
        let mut card = valid_card();
        card.name = "   ".to_string();
        assert!(!validate_card(&card));
    }

    #[test]
    fn rejects_short_number() {
        let mut card = valid_card();
        card.number = "123456781234567".to_string();
        assert!(!validate_card(&card));
    }

    #[test]
    fn rejects_non_digit_number() {
        let mut card = valid_card();
        card.number = "123456781234567a".to_string();
        assert!(!validate_card(&card));
    }

    #[test]
    fn rejects_bad_year_month_code() {
        let mut card = valid_card();
        card.year = "2027".to_string();
        assert!(!validate_card(&card));

        let mut card = valid_card();
        card.month = "5".to_string();
        assert!(!validate_card(&card));

        let mut card = valid_card();
        card.code = "12".to_string();
        assert!(!validate_card(&card));
    }

    #[test]
    fn no_expiry_semantics_are_applied() {
        // Month "99" is formally valid: the stub checks shape only.
        let mut card = valid_card();
        card.month = "99".to_string();
        assert!(validate_card(&card));
    }
}
