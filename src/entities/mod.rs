pub mod account;
pub mod blog_category;
pub mod blog_comment;
pub mod blog_post;
pub mod blog_tag;
pub mod cart;
pub mod cart_item;
pub mod customer;
pub mod expense;
pub mod feedback;
pub mod inventory_level;
pub mod ledger_transaction;
pub mod order;
pub mod order_item;
pub mod post_tag;
pub mod product;
pub mod product_category;
pub mod product_image;
pub mod product_variant;
pub mod purchase;
pub mod purchase_item;
pub mod sale;
pub mod sale_item;
pub mod supplier;
pub mod user;

pub use account::Entity as Account;
pub use blog_category::Entity as BlogCategory;
pub use blog_comment::Entity as BlogComment;
pub use blog_post::Entity as BlogPost;
pub use blog_tag::Entity as BlogTag;
pub use cart::Entity as Cart;
pub use cart_item::Entity as CartItem;
pub use customer::Entity as Customer;
pub use expense::Entity as Expense;
pub use feedback::Entity as Feedback;
pub use inventory_level::Entity as InventoryLevel;
pub use ledger_transaction::Entity as LedgerTransaction;
pub use order::Entity as Order;
pub use order_item::Entity as OrderItem;
pub use post_tag::Entity as PostTag;
pub use product::Entity as Product;
pub use product_category::Entity as ProductCategory;
pub use product_image::Entity as ProductImage;
pub use product_variant::Entity as ProductVariant;
pub use purchase::Entity as Purchase;
pub use purchase_item::Entity as PurchaseItem;
pub use sale::Entity as Sale;
pub use sale_item::Entity as SaleItem;
pub use supplier::Entity as Supplier;
pub use user::Entity as User;

pub use cart::Model as CartModel;
pub use order::Model as OrderModel;
pub use product::Model as ProductModel;
