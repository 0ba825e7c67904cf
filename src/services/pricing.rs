use crate::{
    config::AppConfig,
    entities::{product, sale, Product, ProductImage, Sale},
    errors::ServiceError,
    events::{Event, EventSender},
    services::ImageView,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, Set, TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Price ledger: keeps `product.price` consistent with the product's
/// optional sale record.
///
/// A product's price is discounted if and only if an applied, active,
/// non-expired sale exists for it. Activation and restoration each run
/// in their own transaction so a sale can never be observed
/// half-applied: either the sale flags and the product price both moved,
/// or neither did.
#[derive(Clone)]
pub struct PricingService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
}

/// Counters describing what a reconcile pass did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub activated: usize,
    pub expired: usize,
    pub removed: usize,
}

impl ReconcileSummary {
    pub fn is_noop(&self) -> bool {
        self.activated == 0 && self.expired == 0 && self.removed == 0
    }
}

impl PricingService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            db,
            event_sender,
            config,
        }
    }

    /// Reconcile every sale record against `today`.
    ///
    /// Pure function of store state plus the supplied date: callers pick
    /// the clock. Running it twice with the same `today` is a no-op the
    /// second time.
    ///
    /// Pass 1 walks unapplied sales: activate those whose window
    /// contains `today`, leave future ones pending, and delete those
    /// whose window already ended without ever applying (including
    /// degenerate `date_from > date_to` windows). Pass 2 walks active
    /// sales and restores-then-deletes the ones whose window has ended.
    #[instrument(skip(self))]
    pub async fn reconcile(&self, today: NaiveDate) -> Result<ReconcileSummary, ServiceError> {
        let mut summary = ReconcileSummary::default();

        let pending = Sale::find()
            .filter(sale::Column::IsApplied.eq(false))
            .all(&*self.db)
            .await?;

        for record in pending {
            if record.window_contains(today) {
                let product_id = record.product_id;
                self.activate(record).await?;
                summary.activated += 1;
                self.event_sender
                    .send_or_log(Event::SaleActivated { product_id })
                    .await;
            } else if today < record.date_from {
                // Pending: window not open yet.
                continue;
            } else {
                // Window ended without the sale ever applying; the
                // product price was never touched, so only the record
                // goes away.
                let product_id = record.product_id;
                record.delete(&*self.db).await?;
                summary.removed += 1;
                self.event_sender
                    .send_or_log(Event::SaleRemoved { product_id })
                    .await;
            }
        }

        let active = Sale::find()
            .filter(sale::Column::IsActive.eq(true))
            .all(&*self.db)
            .await?;

        for record in active {
            if !record.window_contains(today) {
                let product_id = record.product_id;
                self.expire(record).await?;
                summary.expired += 1;
                self.event_sender
                    .send_or_log(Event::SaleExpired { product_id })
                    .await;
            }
        }

        if !summary.is_noop() {
            info!(
                activated = summary.activated,
                expired = summary.expired,
                removed = summary.removed,
                "sale reconciliation applied changes"
            );
        }

        Ok(summary)
    }

    /// Push the discount into the product price. Snapshot first, then
    /// flip the flags and the price inside one transaction.
    async fn activate(&self, record: sale::Model) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;

        let product = Product::find_by_id(record.product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", record.product_id))
            })?;

        let sale_price = record.sale_price;
        let current_price = product.price;

        let mut sale_update: sale::ActiveModel = record.into();
        sale_update.old_price = Set(current_price);
        sale_update.is_applied = Set(true);
        sale_update.is_active = Set(true);
        sale_update.update(&txn).await?;

        let mut product_update: product::ActiveModel = product.into();
        product_update.price = Set(sale_price);
        product_update.update(&txn).await?;

        txn.commit().await?;
        Ok(())
    }

    /// Restore the snapshotted price verbatim (no recomputation, so
    /// repeated apply/restore cycles cannot drift) and drop the record.
    async fn expire(&self, record: sale::Model) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;

        let product = Product::find_by_id(record.product_id).one(&txn).await?;

        match product {
            Some(product) => {
                let old_price = record.old_price;
                let mut product_update: product::ActiveModel = product.into();
                product_update.price = Set(old_price);
                product_update.update(&txn).await?;
            }
            None => {
                warn!(
                    product_id = record.product_id,
                    "expiring sale for missing product"
                );
            }
        }

        record.delete(&txn).await?;
        txn.commit().await?;
        Ok(())
    }

    /// Paginated view of currently active sales for the storefront.
    pub async fn active_sales(&self, current_page: u64) -> Result<SalesPage, ServiceError> {
        let paginator = Sale::find()
            .filter(sale::Column::IsActive.eq(true))
            .paginate(&*self.db, self.config.sales_page_size);

        let last_page = paginator.num_pages().await?.max(1);
        let page = current_page.max(1);
        let records = paginator.fetch_page(page - 1).await?;

        let mut items = Vec::with_capacity(records.len());
        for record in records {
            let product = record.find_related(Product).one(&*self.db).await?;
            let Some(product) = product else {
                continue;
            };
            let images = product
                .find_related(ProductImage)
                .all(&*self.db)
                .await?
                .into_iter()
                .map(ImageView::from)
                .collect();

            items.push(SaleItemView {
                id: product.id,
                price: record.old_price,
                sale_price: record.sale_price,
                date_from: record.date_from,
                date_to: record.date_to,
                title: product.title,
                images,
            });
        }

        Ok(SalesPage {
            items,
            current_page: page,
            last_page,
        })
    }
}

/// One active sale as rendered to clients. `price` is the pre-discount
/// price captured at activation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleItemView {
    pub id: i32,
    pub price: Decimal,
    pub sale_price: Decimal,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub title: String,
    pub images: Vec<ImageView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesPage {
    pub items: Vec<SaleItemView>,
    pub current_page: u64,
    pub last_page: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_noop_detection() {
        assert!(ReconcileSummary::default().is_noop());
        assert!(!ReconcileSummary {
            activated: 1,
            ..Default::default()
        }
        .is_noop());
    }

    #[test]
    fn sale_item_view_serializes_camel_case() {
        let view = SaleItemView {
            id: 3,
            price: rust_decimal_macros::dec!(10.00),
            sale_price: rust_decimal_macros::dec!(7.50),
            date_from: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            date_to: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            title: "Lamp".to_string(),
            images: vec![],
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["salePrice"], serde_json::json!("7.50"));
        assert_eq!(json["dateFrom"], serde_json::json!("2024-03-01"));
        assert!(json.get("sale_price").is_none());
    }
}
