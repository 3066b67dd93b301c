//! Payment back-ends and per-purchase charging.
//!
//! Two kinds of back-end exist: a [`CurrencyProvider`] charges an entry's
//! final price, an [`ItemCostProvider`] takes the entry's required items.
//! [`Payments`] holds whichever of the two were hooked at startup and picks
//! one for each purchase.

mod error;
mod memory;
mod provider;
mod registry;
mod setup;

pub use error::{PaymentDecline, PaymentError};
pub use memory::{InMemoryInventory, InMemoryWallet};
pub use provider::{CurrencyProvider, ItemCostProvider};
pub use registry::{CurrencyFactory, ITEM_PROVIDER_NAME, PaymentRegistry, ProviderInit};
pub use setup::{PaymentMethod, Payments};
