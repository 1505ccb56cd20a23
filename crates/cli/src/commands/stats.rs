use crate::commands::CommandResult;
use assetflow_core::config::{AppConfig, LoadOptions};
use assetflow_db::repositories::{RequestCounts, RequestRepository, SqlRequestRepository};
use assetflow_db::{connect_with_settings, migrations};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "stats",
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
                "stats",
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

        let repo = SqlRequestRepository::new(pool.clone());
        let counts =
            repo.counts().await.map_err(|error| ("stats_query", error.to_string(), 6u8))?;

        pool.close().await;
        Ok::<RequestCounts, (&'static str, String, u8)>(counts)
    });

    match result {
        Ok(counts) => match serde_json::to_string(&counts) {
            Ok(payload) => CommandResult::success("stats", payload),
            Err(error) => CommandResult::failure("stats", "serialization", error.to_string(), 7),
        },
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("stats", error_class, message, exit_code)
        }
    }
}
