use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One (owner, product) pairing with a quantity.
///
/// Exactly one of `user_id` / `session_id` is set; a line never exists
/// at `count <= 0` (it is deleted instead). Uniqueness of
/// (owner, product) is enforced by the service layer plus partial
/// indexes in the schema.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cart_lines")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(nullable)]
    pub user_id: Option<i32>,
    #[sea_orm(nullable)]
    pub session_id: Option<String>,
    pub product_id: i32,
    pub count: i32,
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
