//! # checkout-ledger
//!
//! Durable `FulfillmentLedger` implementation for hosted-checkout-rs.
//!
//! ```rust,ignore
//! use checkout_ledger::SqliteLedger;
//!
//! let ledger = SqliteLedger::open("data/fulfillment.db", Arc::new(LoggingFulfiller)).await?;
//! match ledger.claim_and_fulfill(&observed).await? {
//!     FulfillmentOutcome::NewlyFulfilled { record } => { /* side effects ran */ }
//!     FulfillmentOutcome::AlreadyFulfilled { record } => { /* nothing ran */ }
//!     FulfillmentOutcome::NotPaid { status } => { /* nothing written */ }
//! }
//! ```

pub mod sqlite;

pub use sqlite::SqliteLedger;
