use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::api::{HttpVerificationApi, VerificationApi};
use crate::config::ClientConfig;
use crate::countdown::{Clock, system_clock};
use crate::error::ClientError;
use crate::events::{AuthEventBus, MfaEvent};
use crate::flow::MfaFlow;
use crate::pending::{FilePendingStorage, PendingStorage, PendingVerificationStore};
use crate::provider::{AuthProvider, ProfileLoader, UserProfile};
use crate::session::{AuthState, SessionReconciler};

pub struct AuthDeps {
    pub provider: Arc<dyn AuthProvider>,
    pub profiles: Arc<dyn ProfileLoader>,
    pub api: Arc<dyn VerificationApi>,
    pub storage: Arc<dyn PendingStorage>,
    pub clock: Arc<dyn Clock>,
}

/// Owns the auth state for the lifetime of the app. Create one at startup.
pub struct AuthController {
    provider: Arc<dyn AuthProvider>,
    api: Arc<dyn VerificationApi>,
    pending: PendingVerificationStore,
    reconciler: SessionReconciler,
    clock: Arc<dyn Clock>,
    task: JoinHandle<()>,
}

impl AuthController {
    /// Sweeps a stale pending record, then starts reconciling. Needs a tokio runtime.
    pub fn start(deps: AuthDeps, grace: chrono::Duration) -> Result<Self, ClientError> {
        let bus = AuthEventBus::new();
        let pending = PendingVerificationStore::new(deps.storage, bus);
        pending.sweep_stale(deps.clock.now(), grace)?;

        let reconciler =
            SessionReconciler::new(deps.provider.clone(), deps.profiles, pending.clone());
        let task = reconciler.clone().spawn();

        Ok(Self {
            provider: deps.provider,
            api: deps.api,
            pending,
            reconciler,
            clock: deps.clock,
            task,
        })
    }

    pub fn from_config(
        config: &ClientConfig,
        provider: Arc<dyn AuthProvider>,
        profiles: Arc<dyn ProfileLoader>,
    ) -> Result<Self, ClientError> {
        let deps = AuthDeps {
            provider,
            profiles,
            api: Arc::new(HttpVerificationApi::from_config(config)?),
            storage: Arc::new(FilePendingStorage::new(&config.state_dir)),
            clock: system_clock(),
        };
        Self::start(deps, config.pending_grace())
    }

    pub fn flow(&self) -> MfaFlow {
        MfaFlow::new(
            self.api.clone(),
            self.provider.clone(),
            self.pending.clone(),
            self.reconciler.clone(),
            self.clock.clone(),
        )
    }

    pub fn auth_state(&self) -> watch::Receiver<AuthState> {
        self.reconciler.state()
    }

    pub fn profile(&self) -> watch::Receiver<Option<UserProfile>> {
        self.reconciler.profile()
    }

    pub fn events(&self) -> broadcast::Receiver<MfaEvent> {
        self.pending.bus().subscribe()
    }

    pub fn pending(&self) -> &PendingVerificationStore {
        &self.pending
    }

    pub async fn sign_out(&self) -> Result<(), ClientError> {
        self.pending.clear()?;
        self.provider.sign_out().await?;
        self.reconciler.reconcile().await;
        Ok(())
    }
}

impl Drop for AuthController {
    fn drop(&mut self) {
        self.task.abort();
    }
}
