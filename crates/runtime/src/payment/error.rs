//! Errors raised while registering providers and charging visitors.

use thiserror::Error;

/// Registration and setup failures. Setup errors are surfaced to the
/// bootstrap; a purchase never produces one.
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment provider name must not be empty")]
    EmptyName,

    #[error("payment provider name `{0}` is reserved")]
    Reserved(String),

    #[error("payment provider `{0}` is already registered")]
    Duplicate(String),

    #[error("payment provider `{name}` failed to initialize")]
    Init {
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Why a visitor could not pay for an allocation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PaymentDecline {
    #[error("insufficient funds: {price} required, {balance} available")]
    InsufficientFunds { price: f64, balance: f64 },

    #[error("required items are missing")]
    InsufficientItems,

    #[error("the payment back-end rejected the withdrawal")]
    Failed,
}
