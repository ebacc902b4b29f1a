use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use jsonschema::Validator;
use serde_json::Value;
use tracing::{debug, error, info};

/// Compiled JSON Schema validators, keyed by what they validate.
///
/// Keys look like `handlers::basic:POST:request` or `openapi:GET:/v1/basic:response`.
/// Validators are shared behind `Arc`; compilation happens at most once per key unless
/// two threads race on a miss, in which case the first insert wins.
#[derive(Default)]
pub struct SchemaCache {
    validators: RwLock<HashMap<String, Arc<Validator>>>,
}

impl SchemaCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached validator for `key`, compiling `schema` on a miss.
    ///
    /// `None` when the schema does not compile; the failure is logged and not cached.
    pub fn get_or_compile(&self, key: &str, schema: &Value) -> Option<Arc<Validator>> {
        {
            let cache = self
                .validators
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(validator) = cache.get(key) {
                debug!(cache_key = key, "Schema validator cache hit");
                return Some(Arc::clone(validator));
            }
        }

        match jsonschema::validator_for(schema) {
            Ok(compiled) => {
                let validator = Arc::new(compiled);
                let mut cache = self
                    .validators
                    .write()
                    .unwrap_or_else(PoisonError::into_inner);
                if let Some(existing) = cache.get(key) {
                    debug!(cache_key = key, "Schema validator compiled by another thread");
                    return Some(Arc::clone(existing));
                }
                cache.insert(key.to_string(), Arc::clone(&validator));
                info!(
                    cache_key = key,
                    cache_size = cache.len(),
                    "Schema validator compiled and cached"
                );
                Some(validator)
            }
            Err(e) => {
                error!(cache_key = key, error = %e, "Failed to compile JSON Schema");
                None
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.validators
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
