//! Process-wide signing configuration.
//!
//! The secret and product id are explicit values handed to the
//! service at construction, never read from ambient globals, so
//! multiple secrets and products can coexist in one process (and in
//! tests). Rotating the secret invalidates verification of all
//! previously issued keys; there is no key-versioning scheme.

use crate::error::{ServiceError, ServiceResult};
use std::env;
use std::fmt;

/// Environment variable holding the signing secret.
pub const SIGNING_SECRET_VAR: &str = "KEYMINT_SIGNING_SECRET";

/// Environment variable holding the product identifier.
pub const PRODUCT_ID_VAR: &str = "KEYMINT_PRODUCT_ID";

const DEFAULT_PRODUCT_ID: &str = "keymint-product-v1";

/// Signing secret plus product identifier, loaded once at startup.
#[derive(Clone)]
pub struct ServiceConfig {
    pub signing_secret: String,
    pub product_id: String,
}

impl ServiceConfig {
    /// Creates a config from explicit values.
    #[must_use]
    pub fn new(signing_secret: impl Into<String>, product_id: impl Into<String>) -> Self {
        Self {
            signing_secret: signing_secret.into(),
            product_id: product_id.into(),
        }
    }

    /// Loads the config from the environment.
    ///
    /// The secret is required — there is deliberately no baked-in
    /// fallback. The product id defaults when unset.
    ///
    /// # Errors
    ///
    /// `Config` when the secret variable is missing or blank.
    pub fn from_env() -> ServiceResult<Self> {
        let signing_secret = env::var(SIGNING_SECRET_VAR)
            .map_err(|_| ServiceError::Config(format!("{SIGNING_SECRET_VAR} is not set")))?;
        if signing_secret.trim().is_empty() {
            return Err(ServiceError::Config(format!(
                "{SIGNING_SECRET_VAR} must not be blank"
            )));
        }

        let product_id =
            env::var(PRODUCT_ID_VAR).unwrap_or_else(|_| DEFAULT_PRODUCT_ID.to_string());

        Ok(Self {
            signing_secret,
            product_id,
        })
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print the secret.
        f.debug_struct("ServiceConfig")
            .field("product_id", &self.product_id)
            .finish_non_exhaustive()
    }
}
