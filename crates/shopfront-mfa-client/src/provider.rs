use async_trait::async_trait;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::ClientError;
use crate::events::ProviderEvent;

/// Session held by the external auth provider. Observed, never minted here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub user_id: Uuid,
    pub email: String,
    pub access_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub is_admin: bool,
}

/// Password sign-in and session lifecycle of the hosted auth provider.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, ClientError>;

    async fn current_session(&self) -> Result<Option<AuthSession>, ClientError>;

    async fn sign_out(&self) -> Result<(), ClientError>;

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}

#[async_trait]
pub trait ProfileLoader: Send + Sync {
    async fn load_profile(&self, session: &AuthSession) -> Result<UserProfile, ClientError>;
}
