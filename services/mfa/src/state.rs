use deadpool_redis::Pool as RedisPool;
use sea_orm::DatabaseConnection;

use crate::infra::cache::RedisResendGate;
use crate::infra::db::DbChallengeRepository;
use crate::infra::mailer::HttpCodeMailer;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub redis: RedisPool,
    pub mailer: HttpCodeMailer,
    pub jwt_secret: String,
    pub cookie_domain: String,
}

impl AppState {
    pub fn challenge_repo(&self) -> DbChallengeRepository {
        DbChallengeRepository {
            db: self.db.clone(),
        }
    }

    pub fn resend_gate(&self) -> RedisResendGate {
        RedisResendGate {
            pool: self.redis.clone(),
        }
    }

    pub fn mailer(&self) -> HttpCodeMailer {
        self.mailer.clone()
    }
}
