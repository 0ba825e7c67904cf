//! Storefront entities, one module per table.

pub mod cart_line;
pub mod category;
pub mod order;
pub mod order_history;
pub mod order_line;
pub mod product;
pub mod product_image;
pub mod profile;
pub mod sale;

// Re-export entities under their domain names
pub use cart_line::{Entity as CartLine, Model as CartLineModel};
pub use category::{Entity as Category, Model as CategoryModel};
pub use order::{Entity as Order, Model as OrderModel};
pub use order_history::{Entity as OrderHistory, Model as OrderHistoryModel};
pub use order_line::{Entity as OrderLine, Model as OrderLineModel};
pub use product::{Entity as Product, Model as ProductModel};
pub use product_image::{Entity as ProductImage, Model as ProductImageModel};
pub use profile::{Entity as Profile, Model as ProfileModel};
pub use sale::{Entity as Sale, Model as SaleModel};
