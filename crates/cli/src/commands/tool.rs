use std::sync::Arc;

use concierge_agent::ToolRegistry;
use concierge_core::config::AppConfig;
use concierge_db::{migrations, BookingLedger, FileBillingMirror};
use serde_json::Value;

use crate::commands::{open_pool, prepare, CommandResult, Failure};

/// Invokes one orchestrator tool against the configured store. `args` is the
/// raw JSON arguments object; it is parsed by the registry so malformed input
/// is reported the same way the orchestrator would see it.
pub fn run(name: &str, args: Option<&str>) -> CommandResult {
    let (config, runtime) = match prepare("tool") {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };
    let arguments = args.map(|raw| Value::String(raw.to_string())).unwrap_or(Value::Null);

    let result = runtime.block_on(async {
        let ledger = open_ledger(&config).await?;
        let registry = ToolRegistry::hotel(ledger.clone());
        let line = registry.dispatch(name, arguments).await;
        ledger.pool().close().await;
        Ok::<String, Failure>(line)
    });

    match result {
        Ok(line) if line.starts_with("SUCCESS:") => CommandResult::success("tool", line),
        Ok(line) => {
            let token = line.split(':').next().unwrap_or("ERROR").to_ascii_lowercase();
            CommandResult::failure("tool", &token, line, 7)
        }
        Err(failure) => CommandResult::from_failure("tool", failure),
    }
}

/// Lists the tool definitions handed to the language model.
pub fn list() -> CommandResult {
    let (config, runtime) = match prepare("tool") {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let ledger = open_ledger(&config).await?;
        let definitions = ToolRegistry::hotel(ledger.clone()).definitions();
        ledger.pool().close().await;
        serde_json::to_string(&definitions).map_err(|error| ("serialization", error.to_string(), 7u8))
    });

    match result {
        Ok(definitions) => CommandResult::success("tool", definitions),
        Err(failure) => CommandResult::from_failure("tool", failure),
    }
}

async fn open_ledger(config: &AppConfig) -> Result<Arc<BookingLedger>, Failure> {
    let pool = open_pool(config).await?;
    migrations::run_pending(&pool)
        .await
        .map_err(|error| ("migration", error.to_string(), 5u8))?;
    let mirror = Arc::new(FileBillingMirror::new(config.billing.mirror_dir.clone()));
    Ok(Arc::new(BookingLedger::new(pool, mirror, config.booking.default_year)))
}
