use anyhow::Context as _;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, QueryOrder, TransactionTrait, sea_query::Expr,
};
use uuid::Uuid;

use shopfront_mfa_schema::verification_challenges::{self, Column, Entity};

use crate::domain::repository::ChallengeRepository;
use crate::domain::types::{MAX_VERIFY_ATTEMPTS, VerificationChallenge};
use crate::error::MfaServiceError;

#[derive(Clone)]
pub struct DbChallengeRepository {
    pub db: DatabaseConnection,
}

impl ChallengeRepository for DbChallengeRepository {
    async fn supersede_and_create(
        &self,
        challenge: &VerificationChallenge,
    ) -> Result<(), MfaServiceError> {
        self.db
            .transaction::<_, (), sea_orm::DbErr>(|txn| {
                let challenge = challenge.clone();
                Box::pin(async move {
                    delete_unconsumed(txn, &challenge.email).await?;
                    insert_challenge(txn, &challenge).await?;
                    Ok(())
                })
            })
            .await
            .context("supersede and create verification challenge")?;
        Ok(())
    }

    async fn find_latest_unconsumed(
        &self,
        email: &str,
    ) -> Result<Option<VerificationChallenge>, MfaServiceError> {
        let model = Entity::find()
            .filter(Column::Email.eq(email))
            .filter(Column::ConsumedAt.is_null())
            .order_by_desc(Column::CreatedAt)
            .one(&self.db)
            .await
            .context("find latest unconsumed challenge")?;
        Ok(model.map(challenge_from_model))
    }

    async fn reserve_attempt(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool, MfaServiceError> {
        let result = Entity::update_many()
            .col_expr(Column::Attempts, Expr::col(Column::Attempts).add(1))
            .filter(Column::Id.eq(id))
            .filter(Column::ConsumedAt.is_null())
            .filter(Column::ExpiresAt.gt(now))
            .filter(Column::Attempts.lt(MAX_VERIFY_ATTEMPTS))
            .exec(&self.db)
            .await
            .context("reserve verification attempt")?;
        Ok(result.rows_affected == 1)
    }

    async fn consume(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, MfaServiceError> {
        // attempts may equal the cap here: the winning guess reserved the last slot
        let result = Entity::update_many()
            .col_expr(Column::ConsumedAt, Expr::value(at))
            .filter(Column::Id.eq(id))
            .filter(Column::ConsumedAt.is_null())
            .filter(Column::ExpiresAt.gt(at))
            .filter(Column::Attempts.lte(MAX_VERIFY_ATTEMPTS))
            .exec(&self.db)
            .await
            .context("consume verification challenge")?;
        Ok(result.rows_affected == 1)
    }

    async fn purge_expired(&self, before: DateTime<Utc>) -> Result<u64, MfaServiceError> {
        let result = Entity::delete_many()
            .filter(Column::ExpiresAt.lt(before))
            .exec(&self.db)
            .await
            .context("purge expired challenges")?;
        Ok(result.rows_affected)
    }
}

async fn delete_unconsumed(txn: &DatabaseTransaction, email: &str) -> Result<(), sea_orm::DbErr> {
    Entity::delete_many()
        .filter(Column::Email.eq(email))
        .filter(Column::ConsumedAt.is_null())
        .exec(txn)
        .await?;
    Ok(())
}

async fn insert_challenge(
    txn: &DatabaseTransaction,
    challenge: &VerificationChallenge,
) -> Result<(), sea_orm::DbErr> {
    verification_challenges::ActiveModel {
        id: Set(challenge.id),
        email: Set(challenge.email.clone()),
        code: Set(challenge.code.clone()),
        attempts: Set(challenge.attempts),
        expires_at: Set(challenge.expires_at),
        consumed_at: Set(None),
        created_at: Set(challenge.created_at),
    }
    .insert(txn)
    .await?;
    Ok(())
}

fn challenge_from_model(model: verification_challenges::Model) -> VerificationChallenge {
    VerificationChallenge {
        id: model.id,
        email: model.email,
        code: model.code,
        attempts: model.attempts,
        expires_at: model.expires_at,
        consumed_at: model.consumed_at,
        created_at: model.created_at,
    }
}
