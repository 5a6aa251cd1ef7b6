use anyhow::{Context, Result};
use shelfbot_agent::{AgentRuntime, CatalogRepositories, ChatMode, ChatReply};
use shelfbot_core::config::AppConfig;

use crate::commands::{open_migrated, prepare, CommandResult};

/// One-shot chat against the configured database. Prints the reply text,
/// or the full `{response, mode, timestamp}` payload with `--json`.
pub fn run(message: &str, mode: ChatMode, json_output: bool) -> CommandResult {
    let (config, runtime) = match prepare("chat") {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    match runtime.block_on(converse(&config, message, mode)) {
        Ok(reply) if json_output => match serde_json::to_string_pretty(&reply) {
            Ok(output) => CommandResult { exit_code: 0, output },
            Err(error) => CommandResult::failure("chat", "serialization", error.to_string(), 7),
        },
        Ok(reply) => CommandResult { exit_code: 0, output: reply.response },
        Err(error) => CommandResult::failure("chat", "chat_execution", format!("{error:#}"), 4),
    }
}

async fn converse(config: &AppConfig, message: &str, mode: ChatMode) -> Result<ChatReply> {
    let pool = open_migrated(config)
        .await
        .map_err(|(class, message, _)| anyhow::anyhow!("{class}: {message}"))
        .context("preparing the catalog database")?;

    let runtime = AgentRuntime::from_config(CatalogRepositories::sql(pool.clone()), &config.llm);
    let reply = runtime.handle_message(message, mode).await;

    pool.close().await;
    Ok(reply)
}
