use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use swipefeed::app::AppContext;
use swipefeed::cli::{commands, Cli, Commands};
use swipefeed::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let ctx = AppContext::new(cli.db, config)?;

    match cli.command {
        Commands::Add { url } => {
            commands::add_feed(&ctx, &url).await?;
        }
        Commands::Remove { url } => {
            commands::remove_feed(&ctx, &url)?;
        }
        Commands::Toggle { url } => {
            commands::toggle_feed(&ctx, &url)?;
        }
        Commands::Refresh => {
            commands::refresh(&ctx).await?;
        }
        Commands::List { articles } => {
            if articles {
                commands::list_articles(&ctx)?;
            } else {
                commands::list_feeds(&ctx)?;
            }
        }
        Commands::Unread => {
            commands::list_unread(&ctx)?;
        }
        Commands::Bookmarks => {
            commands::list_bookmarks(&ctx)?;
        }
        Commands::Read { article_id } => {
            commands::mark_read(&ctx, &article_id)?;
        }
        Commands::Bookmark { article_id, remove } => {
            commands::bookmark(&ctx, &article_id, remove)?;
        }
        Commands::Skip { article_id } => {
            commands::skip(&ctx, &article_id)?;
        }
        Commands::Cleanup { days } => {
            commands::cleanup(&ctx, days)?;
        }
        Commands::Watch { interval } => {
            commands::watch(&ctx, interval).await?;
        }
    }

    Ok(())
}
