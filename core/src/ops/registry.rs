//! The process-wide operator schema registry.
//!
//! Schemas are keyed by `(op_type, domain, since_version)` and written once.
//! Lookups resolve to the highest version at or below the requested one.
use crate::errors::{GraphError, GraphResult};
use crate::ops::{OpSchema, canonical_domain};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::{Arc, Once};

lazy_static::lazy_static! {
    static ref REGISTRY: RwLock<SchemaRegistry> = RwLock::new(SchemaRegistry::default());
}

#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<(String, String), BTreeMap<i64, Arc<OpSchema>>>,
}

impl SchemaRegistry {
    pub fn insert(&mut self, schema: OpSchema) -> GraphResult<Arc<OpSchema>> {
        let schema = schema.finalize()?;
        let key = (schema.name().to_string(), schema.domain_name().to_string());
        let versions = self.schemas.entry(key).or_default();
        if versions.contains_key(&schema.version()) {
            return Err(GraphError::SchemaRegistration(format!(
                "{} (domain {:?}, version {}) is already registered",
                schema.name(),
                schema.domain_name(),
                schema.version()
            )));
        }
        debug!("Registering {} (domain {:?}, version {})", schema.name(), schema.domain_name(), schema.version());
        let schema = Arc::new(schema);
        versions.insert(schema.version(), schema.clone());
        Ok(schema)
    }

    /// The highest registered version not above `max_version`, or the
    /// highest overall when no bound is given.
    pub fn lookup(&self, op_type: &str, domain: &str, max_version: Option<i64>) -> Option<Arc<OpSchema>> {
        let versions =
            self.schemas.get(&(op_type.to_string(), canonical_domain(domain).to_string()))?;
        match max_version {
            Some(max) => versions.range(..=max).next_back(),
            None => versions.iter().next_back(),
        }
        .map(|(_, schema)| schema.clone())
    }

    pub fn contains(&self, op_type: &str, domain: &str, version: i64) -> bool {
        self.schemas
            .get(&(op_type.to_string(), canonical_domain(domain).to_string()))
            .is_some_and(|versions| versions.contains_key(&version))
    }

    pub fn len(&self) -> usize {
        self.schemas.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

/// Validates a schema and adds it to the process-wide registry.
pub fn register(schema: OpSchema) -> GraphResult<Arc<OpSchema>> {
    REGISTRY.write().insert(schema)
}

/// Registers the builtin operator set. Runs once per process, later calls
/// return immediately. A schema registered earlier under the same key as a
/// builtin is kept, and the builtin is skipped.
pub fn register_builtin_ops() {
    static BUILTINS: Once = Once::new();
    BUILTINS.call_once(|| {
        let mut registry = REGISTRY.write();
        for schema in super::builtin::schemas().into_iter().chain(super::ml::schemas()) {
            if registry.contains(schema.name(), schema.domain_name(), schema.version()) {
                debug!(
                    "Keeping registered {} (domain {:?}, version {}) over the builtin",
                    schema.name(),
                    schema.domain_name(),
                    schema.version()
                );
                continue;
            }
            if let Err(e) = registry.insert(schema) {
                error!("Builtin operator registration failed: {e}");
            }
        }
    });
}

/// Latest version of an operator.
pub fn schema(op_type: &str, domain: &str) -> Option<Arc<OpSchema>> {
    register_builtin_ops();
    REGISTRY.read().lookup(op_type, domain, None)
}

/// Version of an operator in effect for an operator set version.
pub fn schema_for_opset(op_type: &str, domain: &str, opset: Option<i64>) -> Option<Arc<OpSchema>> {
    register_builtin_ops();
    REGISTRY.read().lookup(op_type, domain, opset)
}
