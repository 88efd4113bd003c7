use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VerificationChallenges::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VerificationChallenges::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(VerificationChallenges::Email)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VerificationChallenges::Code)
                            .string_len(6)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VerificationChallenges::Attempts)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(VerificationChallenges::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VerificationChallenges::ConsumedAt)
                            .timestamp_with_time_zone(),
                    )
                    .col(
                        ColumnDef::new(VerificationChallenges::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(VerificationChallenges::Table)
                    .col(VerificationChallenges::Email)
                    .name("idx_verification_challenges_email")
                    .to_owned(),
            )
            .await?;

        // Sweeper deletes by expiry.
        manager
            .create_index(
                Index::create()
                    .table(VerificationChallenges::Table)
                    .col(VerificationChallenges::ExpiresAt)
                    .name("idx_verification_challenges_expires_at")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(VerificationChallenges::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(Iden)]
enum VerificationChallenges {
    Table,
    Id,
    Email,
    Code,
    Attempts,
    ExpiresAt,
    ConsumedAt,
    CreatedAt,
}
