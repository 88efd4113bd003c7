use std::time::Duration;

use sea_orm::Database;
use tracing::info;

use shopfront_core::config::Config;
use shopfront_core::tracing::init_tracing;
use shopfront_mfa::config::MfaConfig;
use shopfront_mfa::infra::mailer::HttpCodeMailer;
use shopfront_mfa::router::build_router;
use shopfront_mfa::state::AppState;
use shopfront_mfa::usecase::purge::spawn_sweeper;

#[tokio::main]
async fn main() {
    init_tracing();

    let config = MfaConfig::from_env();

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    let redis_cfg = deadpool_redis::Config::from_url(&config.redis_url);
    let redis = redis_cfg
        .create_pool(Some(deadpool_redis::Runtime::Tokio1))
        .expect("failed to create Redis pool");

    let mailer = HttpCodeMailer {
        client: reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build HTTP client"),
        api_url: config.email_api_url,
        api_key: config.email_api_key,
        from: config.email_from,
    };

    let state = AppState {
        db,
        redis,
        mailer,
        jwt_secret: config.jwt_secret,
        cookie_domain: config.cookie_domain,
    };

    spawn_sweeper(
        state.challenge_repo(),
        Duration::from_secs(config.sweep_interval_secs),
    );

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.mfa_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!("mfa service listening on {addr}");
    axum::serve(listener, router).await.expect("server error");
}
