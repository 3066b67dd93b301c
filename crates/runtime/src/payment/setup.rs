//! Economy setup and per-purchase charging.

use std::fmt;
use std::sync::Arc;

use market_core::{Allocation, EconomyConfig, VisitorId};
use serde::{Deserialize, Serialize};

use super::error::{PaymentDecline, PaymentError};
use super::provider::{CurrencyProvider, ItemCostProvider};
use super::registry::{ITEM_PROVIDER_NAME, PaymentRegistry};

/// How a completed purchase was paid for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PaymentMethod {
    Free,
    Currency { provider: String, amount: f64 },
    Items,
}

/// Back-ends hooked for this run.
#[derive(Clone, Default)]
pub struct Payments {
    currency: Option<Arc<dyn CurrencyProvider>>,
    items: Option<Arc<dyn ItemCostProvider>>,
}

impl Payments {
    /// Nothing hooked: every purchase without required items is free.
    pub fn free() -> Self {
        Self::default()
    }

    /// Hooks the configured currency provider.
    ///
    /// A disabled economy or an unknown provider name leaves currency
    /// unhooked and is only logged. A provider whose constructor fails is an
    /// error, so a broken back-end is caught before the market opens.
    pub fn setup(config: &EconomyConfig, registry: &PaymentRegistry) -> Result<Self, PaymentError> {
        if !config.enabled {
            tracing::info!("economy disabled; currency prices are free");
            return Ok(Self::free());
        }

        let name = config.provider.trim();
        if name.is_empty() {
            tracing::warn!("economy provider name is empty; currency prices are free");
            return Ok(Self::free());
        }

        match registry.build(name) {
            Some(provider) => {
                let provider = provider?;
                tracing::info!(
                    configured = %name,
                    provider = provider.name(),
                    "hooked currency provider"
                );
                Ok(Self::free().with_currency(provider))
            }
            None => {
                tracing::warn!(
                    configured = %name,
                    available = ?registry.names(),
                    "unknown currency provider; only item-cost trades are charged"
                );
                Ok(Self::free())
            }
        }
    }

    pub fn with_currency(mut self, provider: Arc<dyn CurrencyProvider>) -> Self {
        self.currency = Some(provider);
        self
    }

    pub fn with_items(mut self, provider: Arc<dyn ItemCostProvider>) -> Self {
        self.items = Some(provider);
        self
    }

    pub fn currency(&self) -> Option<&Arc<dyn CurrencyProvider>> {
        self.currency.as_ref()
    }

    pub fn is_hooked(&self) -> bool {
        self.currency.is_some()
    }

    /// Charges `visitor` for `allocation`.
    ///
    /// Entries with required items always pay in items. Otherwise a hooked
    /// currency provider is charged the final price when it is positive; in
    /// every other case the purchase is free.
    pub fn charge(
        &self,
        visitor: VisitorId,
        allocation: &Allocation,
    ) -> Result<PaymentMethod, PaymentDecline> {
        let entry = allocation.entry();

        if entry.uses_item_cost() {
            let Some(items) = &self.items else {
                tracing::warn!(
                    key = %entry.key,
                    "entry costs items but no {} provider is hooked",
                    ITEM_PROVIDER_NAME
                );
                return Err(PaymentDecline::Failed);
            };
            if !items.has(visitor, &entry.required_items) {
                return Err(PaymentDecline::InsufficientItems);
            }
            if !items.withdraw(visitor, &entry.required_items) {
                return Err(PaymentDecline::Failed);
            }
            return Ok(PaymentMethod::Items);
        }

        let price = allocation.final_price();
        match &self.currency {
            Some(currency) if price > 0.0 => {
                if !currency.has(visitor, price) {
                    return Err(PaymentDecline::InsufficientFunds {
                        price,
                        balance: currency.balance(visitor),
                    });
                }
                if !currency.withdraw(visitor, price) {
                    return Err(PaymentDecline::Failed);
                }
                Ok(PaymentMethod::Currency {
                    provider: currency.name().to_string(),
                    amount: price,
                })
            }
            _ => Ok(PaymentMethod::Free),
        }
    }
}

impl fmt::Debug for Payments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payments")
            .field("currency", &self.currency.as_ref().map(|c| c.name()))
            .field("items", &self.items.is_some())
            .finish()
    }
}
