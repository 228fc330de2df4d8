use anyhow::Context;
use clap::ValueEnum;
use scholar_api_client::SessionStore;
use scholar_core::models::Post;
use scholar_core::{ClientError, LogLevel, PostStats};
use serde::Serialize;

/// Output format for list commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Collapse newlines so a post fits on one table row.
pub fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

pub fn print_post_table(title: &str, posts: &[Post]) {
    println!("\n=== {} ===\n", title);
    println!("Total: {} posts", posts.len());

    if posts.is_empty() {
        println!("\nNo posts found.");
        return;
    }

    println!(
        "\n{:<36} {:<13} {:<19} {:>5}  {:<50}",
        "ID", "Category", "Created At", "Files", "Content"
    );
    println!("{}", "-".repeat(128));

    for post in posts {
        let created = post
            .created_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<36} {:<13} {:<19} {:>5}  {:<50}",
            truncate_string(&post.post_id, 36),
            post.category.as_str(),
            created,
            post.attachments.len(),
            truncate_string(&single_line(&post.content), 50)
        );
    }
    println!();
}

pub fn print_stats(stats: &PostStats) {
    println!("--- Totals ---");
    println!(
        "Posts: {}  Likes: {}  Comments: {}  Shares: {}  Views: {}",
        stats.posts, stats.likes, stats.comments, stats.shares, stats.views
    );
}

/// Drop the stored tokens. A pending registration is kept so that
/// `scholar confirm` still finds its email.
pub fn expire_session(store: &SessionStore) -> anyhow::Result<()> {
    let mut session = store.load()?;
    session.sign_out();
    if session.pending_email().is_some() {
        store.save(&session)?;
    } else {
        store.clear()?;
    }
    Ok(())
}

/// Log a failed command at the level its error calls for.
pub fn log_client_error(err: &ClientError) {
    let code = err.error_code();
    let action = err.suggested_action();
    match err.log_level() {
        LogLevel::Debug => tracing::debug!(code, action, error = %err, "Command failed"),
        LogLevel::Warn => tracing::warn!(code, action, error = %err, "Command failed"),
        LogLevel::Error => tracing::error!(code, action, error = %err, "Command failed"),
    }
}

/// Initialize tracing for the CLI. Logs go to stderr so JSON output stays clean.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
