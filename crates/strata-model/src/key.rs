//! The canonical entity key.
//!
//! `entity_id + schema_key + file_id` together identify "which thing
//! changed". The triple recurs through every layer: change records carry
//! it, change-set elements are unique per it, and cache rows are keyed by
//! it plus a version.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of one logical entity inside one file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityKey {
    pub entity_id: String,
    pub schema_key: String,
    pub file_id: String,
}

impl EntityKey {
    pub fn new(
        entity_id: impl Into<String>,
        schema_key: impl Into<String>,
        file_id: impl Into<String>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            schema_key: schema_key.into(),
            file_id: file_id.into(),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.entity_id, self.schema_key, self.file_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_order_by_entity_then_schema_then_file() {
        let a = EntityKey::new("e1", "para", "f1");
        let b = EntityKey::new("e1", "para", "f2");
        let c = EntityKey::new("e2", "para", "f1");
        assert!(a < b);
        assert!(b < c);
    }
}
