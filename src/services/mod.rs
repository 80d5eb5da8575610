// Checkout pipeline
pub mod checkout;
pub mod recipe;
pub mod units;

// Stock management
pub mod inventory;
pub mod restock;

// Financial ledger
pub mod cash_flow;

// Read-only sale projections
pub mod sales;
