use anyhow::Context;
use std::path::Path;

use crate::config::Config;
use crate::services::Outcome;
use crate::state::SharedState;

/// Runs one saved payload through the full pipeline, including delivery.
pub async fn cmd_replay(config: Config, file: &Path) -> anyhow::Result<()> {
    config.validate()?;

    let body = std::fs::read(file)
        .with_context(|| format!("Failed to read payload: {}", file.display()))?;

    let state = SharedState::new(config)?;
    let outcome = state.notifier.handle_payload(&body).await;

    println!("[{}] {}", outcome.kind(), outcome.message());

    if let Outcome::Failed(e) = outcome {
        anyhow::bail!("Replay failed: {e}");
    }
    Ok(())
}
