use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use teamdigest::digest::DigestRunner;
use teamdigest::platform::discord::DiscordPlatform;

#[derive(Parser)]
#[command(
    name = "teamdigest",
    version,
    about = "Daily conversation digest for team categories on Discord"
)]
struct Cli {
    /// Path to config file (default: ~/.teamdigest/config.toml)
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Listen for the trigger keyword and run the daily schedule (default)
    Run,
    /// Summarize the last window now, post it, and exit
    Once,
    /// Render the last window to markdown without posting
    Export {
        /// Directory for summary_YYYY-MM-DD.md (prints to stdout when omitted)
        #[arg(short, long)]
        out: Option<String>,
    },
    /// Initialize a new teamdigest config directory
    Init,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("teamdigest=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Init) => run_init(cli.config.as_deref()),
        Some(Commands::Once) => run_once(cli.config.as_deref()).await,
        Some(Commands::Export { out }) => run_export(cli.config.as_deref(), out.as_deref()).await,
        Some(Commands::Run) | None => run_main(cli.config.as_deref()).await,
    }
}

fn build_runner(config: &teamdigest::config::Config) -> anyhow::Result<Arc<DigestRunner>> {
    let settings = config.digest_settings()?;
    let platform = Arc::new(DiscordPlatform::new(&config.discord));
    Ok(Arc::new(DigestRunner::new(platform, settings)))
}

// ---------------------------------------------------------------------------
// Init
// ---------------------------------------------------------------------------

fn run_init(config_override: Option<&std::path::Path>) -> anyhow::Result<()> {
    let config_path = match config_override {
        Some(p) => p.to_path_buf(),
        None => teamdigest::config::config_dir().join("config.toml"),
    };
    if let Some(dir) = config_path.parent() {
        std::fs::create_dir_all(dir)?;
    }

    if config_path.exists() {
        println!("Config already exists: {}", config_path.display());
        return Ok(());
    }

    std::fs::write(
        &config_path,
        r#"[discord]
bot_token = "${DISCORD_BOT_TOKEN}"
guild_id = 0
trigger_keyword = "!summary"

[digest]
boundary_hour = 22
category_marker = "Team"
destination_channel = "conversation-summary"
# timezone = "Asia/Tokyo"

[scheduler]
enabled = true
"#,
    )?;
    println!("Created {}", config_path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// One-shot runs
// ---------------------------------------------------------------------------

async fn run_once(config_path: Option<&std::path::Path>) -> anyhow::Result<()> {
    let config = teamdigest::config::load_config(config_path)?;
    let runner = build_runner(&config)?;

    match runner.run_now().await {
        Ok(summary) => {
            tracing::info!(
                "Posted summary: {} message(s), {} categor(ies), {}/{} post(s) delivered",
                summary.messages,
                summary.categories,
                summary.posts_delivered,
                summary.posts_delivered + summary.posts_failed.len()
            );
            if !summary.posts_failed.is_empty() {
                anyhow::bail!("{} post(s) failed", summary.posts_failed.len());
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Summary failed: {}", e);
            Err(e.into())
        }
    }
}

async fn run_export(
    config_path: Option<&std::path::Path>,
    out: Option<&str>,
) -> anyhow::Result<()> {
    let config = teamdigest::config::load_config(config_path)?;
    let runner = build_runner(&config)?;
    let digest = runner.collect_now().await?;

    match out {
        Some(dir) => {
            let path = digest.write_to(&teamdigest::config::expand_tilde(dir))?;
            tracing::info!(
                "Saved {} ({} message(s))",
                path.display(),
                digest.message_count
            );
        }
        None => print!("{}", digest.report.to_document()),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Bot
// ---------------------------------------------------------------------------

async fn run_main(config_path: Option<&std::path::Path>) -> anyhow::Result<()> {
    let config = teamdigest::config::load_config(config_path)?;
    let runner = build_runner(&config)?;

    teamdigest::platform::discord::start_gateway(&config.discord, runner.clone()).await?;
    tracing::info!(
        "Listening for '{}' in guild {}",
        config.discord.trigger_keyword,
        config.discord.guild_id
    );

    if config.scheduler.enabled {
        let expression = config.schedule_expression()?;
        let scheduler = teamdigest::scheduler::Scheduler::new(&expression, runner.clone())?;
        tokio::spawn(async move {
            scheduler.run().await;
        });
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");
    // Give in-flight posts a moment before exiting
    tokio::time::sleep(Duration::from_millis(500)).await;
    Ok(())
}
