use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Promotional price window, at most one per product.
///
/// `old_price` is a snapshot of the product price taken at activation and
/// restored verbatim at expiry; it is meaningless while `is_applied` is
/// false. An expired sale is deleted outright, never kept in a disabled
/// state.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sales")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub product_id: i32,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub old_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub sale_price: Decimal,
    pub date_from: Date,
    pub date_to: Date,
    pub is_applied: bool,
    pub is_active: bool,
}

impl Model {
    /// Whether `today` falls inside the inclusive sale window.
    pub fn window_contains(&self, today: Date) -> bool {
        self.date_from <= today && today <= self.date_to
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
