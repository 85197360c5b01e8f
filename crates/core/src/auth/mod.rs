mod token;
mod traits;
mod types;

pub use token::*;
pub use traits::*;
pub use types::*;

use crate::config::AdminConfig;

/// Factory function to create the curation authenticator from config.
///
/// Never fails: a missing token yields an authenticator that rejects every
/// request with [`AuthError::NotConfigured`].
pub fn create_authenticator(config: &AdminConfig) -> Box<dyn Authenticator> {
    Box::new(TokenAuthenticator::new(config.token().map(str::to_string)))
}
