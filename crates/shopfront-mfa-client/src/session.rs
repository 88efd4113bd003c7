use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::ClientError;
use crate::pending::PendingVerificationStore;
use crate::provider::{AuthProvider, AuthSession, ProfileLoader, UserProfile};

/// What the rest of the app treats as the signed-in state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated { verification_pending: bool },
    Authenticated { session: AuthSession },
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    pub fn session(&self) -> Option<&AuthSession> {
        match self {
            Self::Authenticated { session } => Some(session),
            Self::Unauthenticated { .. } => None,
        }
    }
}

/// Derives [`AuthState`] from the pending record and the provider session.
///
/// Every call recomputes from scratch, so running it on any event, in any order,
/// converges on the same answer.
#[derive(Clone)]
pub struct SessionReconciler {
    provider: Arc<dyn AuthProvider>,
    profiles: Arc<dyn ProfileLoader>,
    pending: PendingVerificationStore,
    state_tx: Arc<watch::Sender<AuthState>>,
    profile_tx: Arc<watch::Sender<Option<UserProfile>>>,
    /// User whose profile load is in flight.
    profile_loading: Arc<Mutex<Option<Uuid>>>,
}

const BLOCKED: AuthState = AuthState::Unauthenticated {
    verification_pending: true,
};
const SIGNED_OUT: AuthState = AuthState::Unauthenticated {
    verification_pending: false,
};

impl SessionReconciler {
    pub fn new(
        provider: Arc<dyn AuthProvider>,
        profiles: Arc<dyn ProfileLoader>,
        pending: PendingVerificationStore,
    ) -> Self {
        let (state_tx, _) = watch::channel(SIGNED_OUT);
        let (profile_tx, _) = watch::channel(None);
        Self {
            provider,
            profiles,
            pending,
            state_tx: Arc::new(state_tx),
            profile_tx: Arc::new(profile_tx),
            profile_loading: Arc::default(),
        }
    }

    pub fn state(&self) -> watch::Receiver<AuthState> {
        self.state_tx.subscribe()
    }

    pub fn profile(&self) -> watch::Receiver<Option<UserProfile>> {
        self.profile_tx.subscribe()
    }

    pub fn current(&self) -> AuthState {
        self.state_tx.borrow().clone()
    }

    pub async fn reconcile(&self) -> AuthState {
        let state = self.derive().await;
        self.publish(&state);
        state
    }

    async fn derive(&self) -> AuthState {
        match self.has_pending() {
            Ok(false) => {}
            Ok(true) => return BLOCKED,
            Err(e) => {
                tracing::warn!(error = %e, "pending record unreadable, treating as pending");
                return BLOCKED;
            }
        }
        let session = match self.provider.current_session().await {
            Ok(Some(session)) => session,
            Ok(None) => return SIGNED_OUT,
            Err(e) => {
                tracing::warn!(error = %e, "provider session lookup failed");
                return SIGNED_OUT;
            }
        };
        // A sign-in may have stored a pending record while the session was fetched.
        if !matches!(self.has_pending(), Ok(false)) {
            return BLOCKED;
        }
        AuthState::Authenticated { session }
    }

    fn has_pending(&self) -> Result<bool, ClientError> {
        Ok(self.pending.record()?.is_some())
    }

    fn publish(&self, state: &AuthState) {
        self.state_tx.send_if_modified(|current| {
            if current == state {
                return false;
            }
            *current = state.clone();
            true
        });

        match state {
            AuthState::Authenticated { session } => {
                // a missing profile (first sign-in or an earlier failed load) is retried
                self.profile_tx.send_if_modified(|p| {
                    p.take_if(|loaded| loaded.user_id != session.user_id)
                        .is_some()
                });
                if self.profile_tx.borrow().is_none() {
                    self.spawn_profile_load(session.clone());
                }
            }
            AuthState::Unauthenticated { .. } => {
                self.profile_tx.send_if_modified(|p| p.take().is_some());
            }
        }
    }

    fn spawn_profile_load(&self, session: AuthSession) {
        {
            let mut loading = self
                .profile_loading
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if *loading == Some(session.user_id) {
                return;
            }
            *loading = Some(session.user_id);
        }
        let profiles = self.profiles.clone();
        let state_rx = self.state_tx.subscribe();
        let profile_tx = self.profile_tx.clone();
        let profile_loading = self.profile_loading.clone();
        tokio::spawn(async move {
            let result = profiles.load_profile(&session).await;
            {
                let mut loading = profile_loading.lock().unwrap_or_else(PoisonError::into_inner);
                if *loading == Some(session.user_id) {
                    *loading = None;
                }
            }
            let profile = match result {
                Ok(profile) => profile,
                Err(e) => {
                    tracing::warn!(error = %e, user_id = %session.user_id, "profile load failed");
                    return;
                }
            };
            // drop the result if the user changed or signed out meanwhile
            let still_current = state_rx
                .borrow()
                .session()
                .is_some_and(|s| s.user_id == session.user_id);
            if still_current {
                profile_tx.send_replace(Some(profile));
            }
        });
    }

    /// Reconciles once, then again after every provider or pending-record event.
    pub fn spawn(self) -> JoinHandle<()> {
        let mut provider_rx = self.provider.subscribe();
        let mut mfa_rx = self.pending.bus().subscribe();
        tokio::spawn(async move {
            self.reconcile().await;
            loop {
                tokio::select! {
                    event = provider_rx.recv() => match event {
                        Ok(event) => tracing::debug!(?event, "provider event"),
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            tracing::debug!(skipped = n, "provider events lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    event = mfa_rx.recv() => match event {
                        Ok(event) => tracing::debug!(event = event.name(), "mfa event"),
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            tracing::debug!(skipped = n, "mfa events lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
                self.reconcile().await;
            }
            tracing::debug!("session reconciler stopped");
        })
    }
}
