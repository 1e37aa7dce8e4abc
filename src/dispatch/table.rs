//! Enum-keyed strategy table.

use std::collections::HashMap;
use std::sync::Arc;

use crate::dispatch::strategy::BroadcastStrategy;
use crate::dispatch::{
    AuthMethod, CustomStrategy, DelegatedStrategy, ExtensionStrategy, LocalKeyStrategy,
    PushStrategy,
};

/// Strategies by method. Adding a method means adding an enum variant and a
/// table entry.
#[derive(Clone, Default)]
pub struct StrategyTable {
    strategies: HashMap<AuthMethod, Arc<dyn BroadcastStrategy>>,
}

impl StrategyTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// All built-in strategies. `http` is shared by the ledger and
    /// delegated-signer calls; endpoints are read from each invocation's
    /// configuration snapshot, so the table survives reloads unchanged.
    pub fn with_defaults(http: reqwest::Client) -> Self {
        let mut table = Self::new();
        table.register(Arc::new(LocalKeyStrategy::new(http.clone())));
        table.register(Arc::new(ExtensionStrategy));
        table.register(Arc::new(DelegatedStrategy::new(http)));
        table.register(Arc::new(PushStrategy));
        table.register(Arc::new(CustomStrategy));
        table
    }

    /// Insert under the strategy's own method, returning any replaced entry.
    pub fn register(
        &mut self,
        strategy: Arc<dyn BroadcastStrategy>,
    ) -> Option<Arc<dyn BroadcastStrategy>> {
        self.strategies.insert(strategy.method(), strategy)
    }

    pub fn get(&self, method: AuthMethod) -> Option<&Arc<dyn BroadcastStrategy>> {
        self.strategies.get(&method)
    }

    pub fn contains(&self, method: AuthMethod) -> bool {
        self.strategies.contains_key(&method)
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl std::fmt::Debug for StrategyTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut methods: Vec<_> = self.strategies.keys().collect();
        methods.sort();
        f.debug_struct("StrategyTable").field("methods", &methods).finish()
    }
}
