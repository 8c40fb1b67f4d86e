//! User directory seam.
//!
//! Credential verification is deliberately a black box behind this trait; the
//! issuing flow only needs a yes/no plus the principal's identity attributes.
//! The seeded implementation backs development and tests.

use crate::error::AuthError;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;

/// An authenticated identity as the directory knows it.
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    /// Stable principal id, the token subject.
    pub id: String,
    /// Login and display name.
    pub username: String,
    /// Contact email, when known.
    pub email: Option<String>,
    /// Granted roles.
    pub roles: Vec<String>,
}

/// Verifies credentials and resolves principals.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Checks a username/password pair.
    ///
    /// `Ok(None)` means the credentials do not match any account; errors are
    /// reserved for directory failures.
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Principal>, AuthError>;
}

struct SeededUser {
    principal: Principal,
    password: String,
}

/// In-memory directory seeded with demo accounts.
#[derive(Default)]
pub struct SeededDirectory {
    users: RwLock<HashMap<String, SeededUser>>,
}

impl SeededDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory with the two demo accounts: `user` and `admin`, both with
    /// password `password`.
    pub fn with_default_users() -> Self {
        let directory = Self::new();
        directory.add_user(
            Principal {
                id: "user".to_string(),
                username: "user".to_string(),
                email: Some("user@example.com".to_string()),
                roles: vec!["ROLE_USER".to_string()],
            },
            "password",
        );
        directory.add_user(
            Principal {
                id: "admin".to_string(),
                username: "admin".to_string(),
                email: Some("admin@example.com".to_string()),
                roles: vec!["ROLE_ADMIN".to_string()],
            },
            "password",
        );
        directory
    }

    /// Adds or replaces an account.
    pub fn add_user(&self, principal: Principal, password: &str) {
        self.users.write().insert(
            principal.username.clone(),
            SeededUser {
                principal,
                password: password.to_string(),
            },
        );
    }
}

#[async_trait]
impl UserDirectory for SeededDirectory {
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Principal>, AuthError> {
        let users = self.users.read();
        let principal = users
            .get(username)
            .filter(|user| user.password == password)
            .map(|user| user.principal.clone());
        Ok(principal)
    }
}
