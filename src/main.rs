use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use eq_crafting_bot::config::Config;
use eq_crafting_bot::crafting_bot::CraftingBot;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("eq_crafting_bot=info")),
        )
        .init();

    info!("Starting EverQuest Forum Crafting Bot");

    let config = Config::from_env()?;
    info!(
        "Watching forum {} in guild {}",
        config.discord.watched_forum_id, config.discord.guild_id
    );

    let bot = CraftingBot::new(&config)?;

    // First poll only records the threads that already exist
    if let Err(e) = bot.check_for_new_posts().await {
        error!("Error during initial poll: {:#}", e);
    }

    let mut sched = JobScheduler::new().await?;

    let job_bot = bot.clone();
    sched
        .add(Job::new_async(config.poll_schedule.as_str(), move |_uuid, _l| {
            let bot = job_bot.clone();
            Box::pin(async move {
                if let Err(e) = bot.check_for_new_posts().await {
                    error!("Error checking for new posts: {:#}", e);
                }
            })
        })?)
        .await?;

    info!("Scheduler started - polling on '{}'", config.poll_schedule);
    sched.start().await?;

    shutdown_signal().await;
    info!("Shutdown signal received, stopping scheduler");
    sched.shutdown().await?;
    info!("Bot has shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
