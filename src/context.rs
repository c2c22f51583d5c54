//! Contexts are named connection profiles, so the CLI doesn't need the database path on every
//! call.
use crate::analyze::StoreParams;
use crate::cache;
use crate::cache::Cacheable;
use crate::JoinStrategy;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub name: ContextName,
    pub store: StoreParams,
    #[serde(default)]
    pub join_strategy: JoinStrategy,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ContextName(String);

impl ContextName {
    pub fn current() -> Result<ContextName, crate::Error> {
        // All context names use the same cache key, because that's how we save the current
        // context. Reading a context named "any" will just get us the current context.
        cache::read(&ContextName("any".to_string()).cache_key())
    }
}

impl Context {
    /// The context currently in use.
    pub fn current() -> Result<Context, crate::Error> {
        cache::read(&ContextName::current()?)
    }
}

impl From<String> for ContextName {
    fn from(value: String) -> Self {
        ContextName(value)
    }
}

impl From<&str> for ContextName {
    fn from(value: &str) -> Self {
        ContextName(value.to_string())
    }
}

impl From<ContextName> for String {
    fn from(value: ContextName) -> Self {
        value.0
    }
}

impl Display for ContextName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn older_contexts_default_to_shared_column_joins() {
        let json = r#"{"name": "punjab", "store": {"path": "/data/punjab.db"}}"#;

        let context: Context = serde_json::from_str(json).unwrap();

        assert_eq!(ContextName::from("punjab"), context.name);
        assert_eq!(JoinStrategy::SharedColumn, context.join_strategy);
        assert!(context.store.foreign_keys);
    }
}
