use sea_orm_migration::prelude::*;

use shopfront_mfa_migration::Migrator;

#[tokio::main]
async fn main() {
    cli::run_cli(Migrator).await;
}
