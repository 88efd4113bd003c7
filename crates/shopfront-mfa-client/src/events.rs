use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 64;

/// Change to the locally persisted pending-verification state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MfaEvent {
    SessionStored { email: String },
    SessionCleared,
}

impl MfaEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SessionStored { .. } => "mfa-session-stored",
            Self::SessionCleared => "mfa-session-cleared",
        }
    }
}

/// Session lifecycle notification from the external auth provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderEvent {
    InitialSession,
    SignedIn,
    TokenRefreshed,
    SignedOut,
}

/// Process-wide pub/sub for [`MfaEvent`]s. Cloning shares the same channel.
#[derive(Debug, Clone)]
pub struct AuthEventBus {
    sender: broadcast::Sender<MfaEvent>,
}

impl AuthEventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to every current subscriber. Having none is not an error.
    pub fn emit(&self, event: MfaEvent) -> usize {
        tracing::debug!(event = event.name(), "mfa event");
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MfaEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for AuthEventBus {
    fn default() -> Self {
        Self::new()
    }
}
