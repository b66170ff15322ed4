use crate::commands::CommandResult;
use motodesk_core::config::{AppConfig, LoadOptions};
use motodesk_core::domain::approval::ActorRole;
use motodesk_db::{connect, ApprovalEngine};

/// Queue depth per review stage: sales reviewers watch the first number,
/// admins the second.
pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "pending",
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
                "pending",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        let engine = ApprovalEngine::new(pool.clone());
        let sales = engine
            .count_pending(ActorRole::Sales)
            .await
            .map_err(|error| ("queue_query", error.to_string(), 5u8))?;
        let admin = engine
            .count_pending(ActorRole::Admin)
            .await
            .map_err(|error| ("queue_query", error.to_string(), 5u8))?;

        pool.close().await;
        Ok::<(i64, i64), (&'static str, String, u8)>((sales, admin))
    });

    match result {
        Ok((sales, admin)) => CommandResult::success(
            "pending",
            format!("awaiting sales review: {sales}, awaiting final approval: {admin}"),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("pending", error_class, message, exit_code)
        }
    }
}
