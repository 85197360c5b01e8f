pub mod auth;
pub mod catalog;
pub mod config;
pub mod counter;
pub mod metrics;
pub mod reconcile;
pub mod store;
pub mod testing;
pub mod timestamp;
pub mod upstream;

pub use auth::{
    create_authenticator, AuthError, AuthRequest, Authenticator, Identity, TokenAuthenticator,
    TOKEN_HEADER,
};
pub use catalog::{CatalogError, CatalogService, PluginListing, VersionListing};
pub use config::{
    load_config, load_config_from_str, validate_config, AdminConfig, Config, ConfigError,
    DatabaseConfig, SanitizedConfig, ServerConfig, UpstreamConfig,
};
pub use counter::CounterService;
pub use reconcile::{reconcile, Reconciler, SyncError, SyncReport};
pub use store::{
    CounterKind, MergeOutcome, NewPlugin, NewPluginVersion, Plugin, PluginFilter, PluginStore,
    PluginUpsert, PluginVersion, SqlitePluginStore, StoreError, VersionUpsert,
};
pub use upstream::{
    CachedCatalogSource, CatalogSource, UpstreamError, UpstreamPlugin, UpstreamSnapshot,
    UpstreamVersion,
};
