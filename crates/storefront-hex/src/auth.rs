use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use storefront_types::domain::order::UserId;
use storefront_types::ports::auth::AuthGate;
use uuid::Uuid;

/// Opaque bearer tokens held in memory.
#[derive(Clone, Default)]
pub struct TokenRegistry {
    tokens: Arc<DashMap<String, UserId>>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, UserId)>,
    {
        let registry = Self::new();
        for (token, user) in pairs {
            registry.tokens.insert(token, user);
        }
        registry
    }

    /// Mints a fresh token for `user`.
    pub fn issue(&self, user: UserId) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.tokens.insert(token.clone(), user);
        tracing::debug!(%user, "issued bearer token");
        token
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.tokens.remove(token).is_some()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl AuthGate for TokenRegistry {
    async fn authenticate(&self, token: &str) -> Option<UserId> {
        self.tokens.get(token).map(|u| *u.value())
    }
}
