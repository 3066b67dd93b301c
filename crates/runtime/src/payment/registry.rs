//! Named currency providers available to the economy setup.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::error::PaymentError;
use super::provider::CurrencyProvider;

/// Name under which item-cost trades are reported. Cannot be registered.
pub const ITEM_PROVIDER_NAME: &str = "ITEM";

/// Result of constructing a currency provider.
pub type ProviderInit = Result<Arc<dyn CurrencyProvider>, Box<dyn std::error::Error + Send + Sync>>;

/// Deferred constructor, run once when the economy is set up.
pub type CurrencyFactory = Arc<dyn Fn() -> ProviderInit + Send + Sync>;

/// Registry of currency providers keyed by upper-cased name.
#[derive(Default, Clone)]
pub struct PaymentRegistry {
    factories: HashMap<String, CurrencyFactory>,
}

impl PaymentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider constructor under `name`.
    ///
    /// Names are trimmed and upper-cased. Empty names, the reserved item
    /// provider name and names already taken are rejected.
    pub fn register<F>(&mut self, name: &str, factory: F) -> Result<(), PaymentError>
    where
        F: Fn() -> ProviderInit + Send + Sync + 'static,
    {
        let name = normalize(name);
        if name.is_empty() {
            return Err(PaymentError::EmptyName);
        }
        if name == ITEM_PROVIDER_NAME {
            return Err(PaymentError::Reserved(name));
        }
        if self.factories.contains_key(&name) {
            return Err(PaymentError::Duplicate(name));
        }

        tracing::info!(provider = %name, "currency provider registered");
        self.factories.insert(name, Arc::new(factory));
        Ok(())
    }

    /// Registers an already constructed provider.
    pub fn register_provider(
        &mut self,
        name: &str,
        provider: Arc<dyn CurrencyProvider>,
    ) -> Result<(), PaymentError> {
        self.register(name, move || Ok(Arc::clone(&provider)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&normalize(name))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.factories.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Constructs the provider registered under `name`, if any.
    pub fn build(&self, name: &str) -> Option<Result<Arc<dyn CurrencyProvider>, PaymentError>> {
        let name = normalize(name);
        let factory = self.factories.get(&name)?;
        Some(factory().map_err(|source| PaymentError::Init { name, source }))
    }
}

impl fmt::Debug for PaymentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentRegistry")
            .field("providers", &self.names())
            .finish()
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::InMemoryWallet;

    fn wallet() -> Arc<dyn CurrencyProvider> {
        Arc::new(InMemoryWallet::new("Gems"))
    }

    #[test]
    fn names_are_normalized() {
        let mut registry = PaymentRegistry::new();
        registry.register_provider("  gems ", wallet()).unwrap();

        assert!(registry.contains("GEMS"));
        assert!(registry.contains("Gems"));
        assert_eq!(registry.names(), vec!["GEMS".to_string()]);
    }

    #[test]
    fn rejects_empty_reserved_and_duplicate_names() {
        let mut registry = PaymentRegistry::new();
        registry.register_provider("gems", wallet()).unwrap();

        assert!(matches!(
            registry.register_provider("   ", wallet()),
            Err(PaymentError::EmptyName)
        ));
        assert!(matches!(
            registry.register_provider("item", wallet()),
            Err(PaymentError::Reserved(name)) if name == "ITEM"
        ));
        assert!(matches!(
            registry.register_provider("GEMS", wallet()),
            Err(PaymentError::Duplicate(name)) if name == "GEMS"
        ));
    }

    #[test]
    fn failing_constructor_surfaces_on_build() {
        let mut registry = PaymentRegistry::new();
        registry
            .register("broken", || Err("backend offline".into()))
            .unwrap();

        let Some(Err(PaymentError::Init { name, .. })) = registry.build("broken") else {
            panic!("expected an init error");
        };
        assert_eq!(name, "BROKEN");
        assert!(registry.build("missing").is_none());
    }
}
