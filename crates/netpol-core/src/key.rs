//! Entity keys
//!
//! A stable namespace/name identity used uniformly across the cache, the
//! work queue and retry bookkeeping. The string form is reversible:
//! `"namespace/name"` parses back into the original components.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Separator between namespace and name in the string form
const KEY_SEPARATOR: char = '/';

/// Stable identity of a source object
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    /// Namespace of the source object
    pub namespace: String,
    /// Name of the source object
    pub name: String,
}

impl EntityKey {
    /// Create a key from namespace and name
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Name of the derived NetworkPolicy for this key
    ///
    /// Deterministic: namespace and name joined with `-`. The derived
    /// object lives in the same namespace as the source object.
    pub fn policy_name(&self) -> String {
        format!("{}-{}", self.namespace, self.name)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.namespace, KEY_SEPARATOR, self.name)
    }
}

impl FromStr for EntityKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(KEY_SEPARATOR) {
            Some((namespace, name))
                if !namespace.is_empty()
                    && !name.is_empty()
                    && !name.contains(KEY_SEPARATOR) =>
            {
                Ok(Self::new(namespace, name))
            }
            _ => Err(Error::InvalidKey(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_string_form() {
        let key = EntityKey::new("default", "web-0");
        let parsed: EntityKey = key.to_string().parse().unwrap();
        assert_eq!(parsed, key);
        assert_eq!(parsed.namespace, "default");
        assert_eq!(parsed.name, "web-0");
    }

    #[test]
    fn rejects_malformed_keys() {
        for bad in ["", "no-separator", "/name", "ns/", "a/b/c"] {
            assert!(bad.parse::<EntityKey>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn policy_name_is_deterministic() {
        let key = EntityKey::new("prod", "api");
        assert_eq!(key.policy_name(), "prod-api");
        assert_eq!(key.policy_name(), key.policy_name());
    }
}
