use async_trait::async_trait;

use crate::domain::order::UserId;

/// Resolves a bearer credential to a user. Credential checks live entirely
/// behind this trait.
#[async_trait]
pub trait AuthGate: Send + Sync + 'static {
    async fn authenticate(&self, token: &str) -> Option<UserId>;
}
