//! Cache key derivation.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::Result;

/// Suffix of the record holding a group's sliding expiration.
pub const GROUP_EXPIRATION_SUFFIX: &str = "SlidingExpiration";

/// Key of the expiration record kept next to a group's membership entry.
pub fn group_expiration_key(group: &str) -> String {
    format!("{}{}", group, GROUP_EXPIRATION_SUFFIX)
}

/// Derives content-addressed keys (`{prefix}:{sha256}`) from a request's canonical JSON.
///
/// Object fields are hashed in sorted order, so two requests that serialize to the same
/// fields always share a key.
#[derive(Debug, Clone)]
pub struct CacheKeyBuilder {
    prefix: String,
    salt: Option<String>,
}

impl CacheKeyBuilder {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            salt: None,
        }
    }

    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        self.salt = Some(salt.into());
        self
    }

    pub fn build<T: Serialize>(&self, value: &T) -> Result<String> {
        let canonical = serde_json::to_string(&serde_json::to_value(value)?)?;
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        if let Some(ref s) = self.salt {
            hasher.update(s.as_bytes());
        }
        let hash: String = hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();
        Ok(format!("{}:{}", self.prefix, hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expiration_key_appends_suffix() {
        assert_eq!(group_expiration_key("products"), "productsSlidingExpiration");
    }

    #[test]
    fn field_order_does_not_change_the_key() {
        let builder = CacheKeyBuilder::new("products:list");
        let a = builder.build(&json!({"page": 1, "size": 20})).unwrap();
        let b = builder.build(&json!({"size": 20, "page": 1})).unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("products:list:"));
        assert_eq!(a.len(), "products:list:".len() + 64);
    }

    #[test]
    fn salt_and_content_change_the_key() {
        let plain = CacheKeyBuilder::new("p");
        let salted = CacheKeyBuilder::new("p").with_salt("v2");
        let value = json!({"page": 1});
        assert_ne!(plain.build(&value).unwrap(), salted.build(&value).unwrap());
        assert_ne!(
            plain.build(&value).unwrap(),
            plain.build(&json!({"page": 2})).unwrap()
        );
    }
}
