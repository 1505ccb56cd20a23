use crate::commands::CommandResult;
use assetflow_core::config::{AppConfig, LoadOptions};
use assetflow_db::repositories::SqlAssetTypeRepository;
use assetflow_db::{connect_with_settings, migrations, DefaultAssetTypes, SeedResult};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let repo = SqlAssetTypeRepository::new(pool.clone());
        let seed_result = DefaultAssetTypes::load(&repo)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 6u8))?;

        pool.close().await;
        Ok::<SeedResult, (&'static str, String, u8)>(seed_result)
    });

    match result {
        Ok(SeedResult { already_seeded: true, .. }) => {
            CommandResult::success("seed", "asset types already exist; nothing to do")
        }
        Ok(SeedResult { created, .. }) => CommandResult::success(
            "seed",
            format!("default asset types created: {}", created.join(", ")),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}
