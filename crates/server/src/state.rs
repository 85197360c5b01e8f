use std::sync::Arc;
use plugin_store_core::{
    Authenticator, CatalogService, CatalogSource, Config, CounterService, PluginStore, Reconciler,
    SanitizedConfig,
};

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    store: Arc<dyn PluginStore>,
    catalog: CatalogService,
    counters: CounterService,
}

impl AppState {
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        store: Arc<dyn PluginStore>,
        source: Arc<dyn CatalogSource>,
    ) -> Self {
        let reconciler = Reconciler::new(source, Arc::clone(&store));
        let catalog = CatalogService::new(reconciler, Arc::clone(&store));
        let counters = CounterService::new(Arc::clone(&store));

        Self {
            config,
            authenticator,
            store,
            catalog,
            counters,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn store(&self) -> &dyn PluginStore {
        self.store.as_ref()
    }

    pub fn catalog(&self) -> &CatalogService {
        &self.catalog
    }

    pub fn counters(&self) -> &CounterService {
        &self.counters
    }
}
