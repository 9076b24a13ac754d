use crate::config::Config;
use crate::state::SharedState;

pub async fn cmd_check(config: &Config, remote: bool) -> anyhow::Result<()> {
    if let Err(e) = config.validate() {
        println!("✗ Configuration invalid: {e}");
        return Err(e);
    }

    let windows = config.window_settings();
    let state = SharedState::new(config.clone())?;

    println!("Configuration");
    println!("{:-<60}", "");
    println!(
        "Server:          {}:{}",
        config.server.host, config.server.port
    );
    println!("Jellyfin:        {}", config.jellyfin.base_url);
    println!("Telegram chat:   {}", config.telegram.chat_id);
    println!(
        "Trailers:        {}",
        if state.youtube.is_enabled() {
            "YouTube search enabled"
        } else {
            "disabled (no YOUTUBE_API_KEY)"
        }
    );
    println!(
        "Episode window:  premiered within {} days",
        windows.episode_premiered_within_days
    );
    println!(
        "Season window:   held back for {} days after being added",
        windows.season_added_within_days
    );
    println!(
        "Dedup capacity:  {} entries",
        config.notifications.dedup_max_entries
    );

    if !remote {
        println!("\n✓ Configuration is valid");
        return Ok(());
    }

    let mut failed = false;

    match state.jellyfin.ping().await {
        Ok(()) => println!("\n✓ Jellyfin reachable"),
        Err(e) => {
            failed = true;
            println!("\n✗ Jellyfin: {e}");
        }
    }

    match state.telegram.get_me().await {
        Ok(()) => println!("✓ Telegram bot token accepted"),
        Err(e) => {
            failed = true;
            println!("✗ Telegram: {e}");
        }
    }

    if failed {
        anyhow::bail!("Remote checks failed");
    }

    println!("\n✓ All checks passed");
    Ok(())
}
