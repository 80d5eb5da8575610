pub mod branch;
pub mod cash_flow;
pub mod inventory;
pub mod menu;
pub mod menu_item;
pub mod product;
pub mod product_unit;
pub mod transaction;
pub mod transaction_item;
pub mod transaction_item_detail;
pub mod unit;

pub use branch::Entity as Branch;
pub use cash_flow::Entity as CashFlow;
pub use inventory::Entity as Inventory;
pub use menu::Entity as Menu;
pub use menu_item::Entity as MenuItem;
pub use product::Entity as Product;
pub use product_unit::Entity as ProductUnit;
pub use transaction::Entity as Transaction;
pub use transaction_item::Entity as TransactionItem;
pub use transaction_item_detail::Entity as TransactionItemDetail;
pub use unit::Entity as Unit;
