use engine::{Engine, FallbackCache, ImportOutcome, LegacyLedger};
use migration::{Migrator, MigratorTrait};

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "splitbook={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let url = match &settings.sqlite.path {
        Some(path) => format!("sqlite:{path}?mode=rwc"),
        None => "sqlite::memory:".to_string(),
    };
    let db = sea_orm::Database::connect(&url).await?;
    // Schema creation is idempotent; re-opening an existing store leaves it
    // untouched.
    Migrator::up(&db, None).await?;

    let mut builder = Engine::builder().database(db);
    if let Some(fallback) = &settings.fallback {
        builder = builder.fallback(FallbackCache::new(fallback.path.clone()));
    }
    let engine = builder.build();

    if let Some(legacy) = &settings.legacy_import {
        match run_legacy_import(&engine, legacy).await {
            Ok(outcome) if outcome.already_migrated => {
                tracing::debug!("legacy import already completed");
            }
            Ok(outcome) => {
                tracing::info!("imported {} legacy entries", outcome.imported);
            }
            Err(err) => tracing::error!("legacy import failed: {err}"),
        }
    }

    let created = engine.materialize_all_recurring().await?;
    if created > 0 {
        tracing::info!("materialized {created} recurring entries");
    }

    tracing::info!("store ready");
    Ok(())
}

async fn run_legacy_import(
    engine: &Engine,
    legacy: &settings::LegacyImport,
) -> Result<ImportOutcome, Box<dyn std::error::Error + Send + Sync>> {
    let raw = std::fs::read_to_string(&legacy.path)?;
    let ledger: LegacyLedger = serde_json::from_str(&raw)?;
    let user = engine
        .user_by_username(&legacy.username)
        .await?
        .ok_or_else(|| format!("unknown user: {}", legacy.username))?;
    Ok(engine.import_legacy(&user.user_id, &ledger).await?)
}
