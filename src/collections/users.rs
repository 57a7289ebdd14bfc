//! Users collection

use super::{non_blank, required, Collection};
use flowmuse_core::{Entity, Result};
use flowmuse_engine::CollectionDescriptor;
use flowmuse_storage::Backend;
use serde::{Deserialize, Serialize};

/// Collection name
pub const COLLECTION: &str = "users";

/// A user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Display name
    pub name: String,
}

impl User {
    /// User named `name`
    pub fn new(name: impl Into<String>) -> Self {
        User { name: name.into() }
    }
}

/// Users facade
pub type Users<B> = Collection<B, User>;

/// Descriptor of the users collection
pub fn descriptor() -> Result<CollectionDescriptor<User>> {
    Ok(CollectionDescriptor::<User>::new(COLLECTION)?
        .validator(|_, user| non_blank("name", &user.name))
        .seed(|| {
            vec![
                ("u1".to_string(), User::new("User A")),
                ("u2".to_string(), User::new("User B")),
            ]
        }))
}

impl<B: Backend> Collection<B, User> {
    /// Create a user with a generated id
    ///
    /// # Errors
    ///
    /// `Validation` if `name` is blank.
    pub async fn create(&self, name: &str) -> Result<Entity<User>> {
        let name = required("name", name)?;
        self.insert(None, User { name }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_name_rejected() {
        let d = descriptor().unwrap();
        assert!(d.validate("u9", &User::new("  ")).unwrap_err().is_validation());
        assert!(d.validate("u9", &User::new("Ada")).is_ok());
    }

    #[test]
    fn test_seed_users() {
        let seeds = descriptor().unwrap().seed_entities();
        let ids: Vec<&str> = seeds.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["u1", "u2"]);
        assert_eq!(seeds[0].1.name, "User A");
    }
}
