use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::domain::repository::ChallengeRepository;
use crate::error::MfaServiceError;
use crate::infra::db::DbChallengeRepository;

pub struct PurgeExpiredUseCase<C: ChallengeRepository> {
    pub challenges: C,
}

impl<C: ChallengeRepository> PurgeExpiredUseCase<C> {
    pub async fn execute(&self) -> Result<u64, MfaServiceError> {
        let removed = self.challenges.purge_expired(Utc::now()).await?;
        if removed > 0 {
            info!(removed, "purged expired verification challenges");
        } else {
            debug!("no expired verification challenges");
        }
        Ok(removed)
    }
}

/// Run [`PurgeExpiredUseCase`] every `every` until the runtime shuts down.
pub fn spawn_sweeper(challenges: DbChallengeRepository, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let usecase = PurgeExpiredUseCase { challenges };
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = usecase.execute().await {
                error!(error = %e, "challenge sweep failed");
            }
        }
    })
}
