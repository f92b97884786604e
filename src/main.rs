use anyhow::Context;

use accounts::{app, config::AppConfig, db, state::AppState, users::bootstrap};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| config.default_log_filter().to_string());
    if config.json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = AppState::init(&config).await?;
    db::migrate(&app_state.db).await?;

    if let Some(root) = &config.root {
        bootstrap::ensure_root(&app_state.db, root)
            .await
            .context("bootstrap root account")?;
    }

    let pool = app_state.db.clone();
    app::serve(app::build_app(app_state), config.listen).await?;
    pool.close().await;

    Ok(())
}
