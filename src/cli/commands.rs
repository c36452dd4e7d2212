use std::time::Duration;

use crate::app::{AppContext, Result, SwipeFeedError};
use crate::fetcher::normalize_url;
use crate::store::Store;

pub async fn add_feed(ctx: &AppContext, url: &str) -> Result<()> {
    let feed = ctx.engine.add_feed(url).await?;
    println!("Added feed: {}", feed.display_title());
    if let Some(description) = feed.description.as_deref() {
        if !description.is_empty() {
            println!("  {}", description);
        }
    }
    println!("  {} ({} unread)", feed.url, feed.unread_count);
    Ok(())
}

pub fn remove_feed(ctx: &AppContext, url: &str) -> Result<()> {
    let feed = ctx.engine.remove_feed(url)?;
    println!("Removed feed: {}", feed.display_title());
    Ok(())
}

pub fn toggle_feed(ctx: &AppContext, url: &str) -> Result<()> {
    let normalized = normalize_url(url)?;
    let feed = ctx
        .store
        .get_feed_by_url(&normalized)?
        .ok_or(SwipeFeedError::FeedNotFound(normalized))?;

    let feed = ctx.engine.set_feed_active(url, !feed.is_active)?;
    println!(
        "{}: {}",
        feed.display_title(),
        if feed.is_active { "active" } else { "paused" }
    );
    Ok(())
}

pub async fn refresh(ctx: &AppContext) -> Result<()> {
    let outcome = ctx.engine.refresh_all().await?;
    println!(
        "Refreshed {} feeds: {} new articles, {} errors",
        outcome.feeds_refreshed,
        outcome.new_articles,
        outcome.errors.len()
    );
    for error in &outcome.errors {
        eprintln!("  {}", error);
    }
    Ok(())
}

pub fn list_feeds(ctx: &AppContext) -> Result<()> {
    let feeds = ctx.store.get_all_feeds()?;

    if feeds.is_empty() {
        println!("No feeds");
        return Ok(());
    }

    for feed in feeds {
        let marker = if feed.is_active { " " } else { "-" };
        println!(
            "{} {} ({} unread)\n    {}",
            marker,
            feed.display_title(),
            feed.unread_count,
            feed.url
        );
    }
    Ok(())
}

pub fn list_articles(ctx: &AppContext) -> Result<()> {
    let articles = ctx.store.get_articles(None)?;

    if articles.is_empty() {
        println!("No articles");
        return Ok(());
    }

    for article in articles {
        let unread_marker = if article.is_unread() { "●" } else { " " };
        let star = if article.is_bookmarked { "★" } else { " " };
        println!(
            "{}{} {} {} {}",
            unread_marker,
            star,
            article.pub_date.format("%Y-%m-%d"),
            article.id,
            article.display_title()
        );
    }
    Ok(())
}

pub fn list_unread(ctx: &AppContext) -> Result<()> {
    let articles = ctx.engine.unread_articles()?;
    if articles.is_empty() {
        println!("No unread articles");
        return Ok(());
    }
    for article in articles {
        println!(
            "{} {} {}",
            article.pub_date.format("%Y-%m-%d"),
            article.id,
            article.display_title()
        );
    }
    Ok(())
}

pub fn list_bookmarks(ctx: &AppContext) -> Result<()> {
    let articles = ctx.engine.bookmarked_articles()?;
    if articles.is_empty() {
        println!("No bookmarks");
        return Ok(());
    }
    for article in articles {
        println!(
            "{} {} {}",
            article.pub_date.format("%Y-%m-%d"),
            article.id,
            article.display_title()
        );
    }
    Ok(())
}

pub fn mark_read(ctx: &AppContext, article_id: &str) -> Result<()> {
    ctx.engine.mark_read(article_id)?;
    println!("Marked read: {}", article_id);
    Ok(())
}

pub fn bookmark(ctx: &AppContext, article_id: &str, remove: bool) -> Result<()> {
    ctx.engine.set_bookmark(article_id, !remove)?;
    println!(
        "{}: {}",
        if remove { "Unbookmarked" } else { "Bookmarked" },
        article_id
    );
    Ok(())
}

pub fn skip(ctx: &AppContext, article_id: &str) -> Result<()> {
    ctx.engine.mark_skipped(article_id)?;
    println!("Skipped: {}", article_id);
    Ok(())
}

pub fn cleanup(ctx: &AppContext, days: Option<i64>) -> Result<()> {
    let days = days.unwrap_or(ctx.config.retention.days_to_keep);
    let deleted = ctx.engine.cleanup_old_articles(days)?;
    println!("Deleted {} articles older than {} days", deleted, days);
    Ok(())
}

pub async fn watch(ctx: &AppContext, interval_mins: Option<u64>) -> Result<()> {
    let mins = interval_mins
        .unwrap_or(ctx.config.refresh.auto_update_interval_mins)
        .max(1);
    let mut timer = tokio::time::interval(Duration::from_secs(mins * 60));

    println!("Refreshing every {} minutes (Ctrl+C to stop)", mins);
    loop {
        timer.tick().await;
        if let Err(e) = refresh(ctx).await {
            tracing::error!("Scheduled refresh failed: {}", e);
        }
    }
}
