//! Scholar Hub CLI: command-line client for the Scholar Hub platform.
//!
//! Set SCHOLAR_API_URL (or API_URL) and, for account commands,
//! SCHOLAR_COGNITO_CLIENT_ID. The session is kept in a JSON file between runs.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use scholar_api_client::identity::{CognitoIdentityClient, IdentityProvider};
use scholar_api_client::my_posts::MyPosts;
use scholar_api_client::pipeline::{ComposerMessage, PostComposer};
use scholar_api_client::{ApiClient, Session, SessionStore};
use scholar_cli::{
    expire_session, init_tracing, log_client_error, print_json, print_post_table, print_stats,
    OutputFormat,
};
use scholar_core::models::{Category, Role};
use scholar_core::{ClientConfig, ClientError, PostFilter, PostQuery, SortOrder};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "scholar", about = "Scholar Hub CLI", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account; a confirmation code is emailed
    Register {
        #[arg(long)]
        email: String,
        /// Display name
        #[arg(long)]
        name: String,
        /// student, professor, or researcher
        #[arg(long, default_value = "student")]
        role: Role,
        #[arg(long, env = "SCHOLAR_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Confirm an account with the emailed 6-digit code
    Confirm {
        code: String,
        /// Defaults to the email of the last registration
        #[arg(long)]
        email: Option<String>,
    },
    /// Sign in and store the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "SCHOLAR_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show the signed-in identity
    Whoami,
    /// Show a user's profile (defaults to yourself)
    Profile {
        #[arg(long)]
        user_id: Option<String>,
    },
    /// List everyone's posts, newest first
    Feed {
        /// all, drafts, or a category
        #[arg(long, default_value = "all")]
        filter: PostFilter,
        #[arg(long)]
        search: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Create a post with a document attachment
    Post {
        content: String,
        /// research, question, discussion, or collaboration
        #[arg(long, default_value = "research")]
        category: Category,
        /// PDF, TXT, DOC, or DOCX file; only the first is uploaded
        #[arg(long = "attach")]
        attachments: Vec<PathBuf>,
    },
    /// List your own posts
    MyPosts {
        /// all, drafts, or a category
        #[arg(long, default_value = "all")]
        filter: PostFilter,
        /// newest, oldest, most-liked, or most-viewed
        #[arg(long, default_value = "newest")]
        sort: SortOrder,
        #[arg(long)]
        search: Option<String>,
        /// Also print interaction totals
        #[arg(long)]
        stats: bool,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Delete one of your posts
    Delete {
        post_id: String,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
    /// Download a post's attachment
    Download {
        post_id: String,
        /// Attachment name (defaults to the first attachment)
        #[arg(long)]
        file: Option<String>,
        /// Destination directory
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = ClientConfig::from_env()
        .context("Failed to load configuration. Set SCHOLAR_API_URL (or API_URL)")?;
    let store = SessionStore::from_config(&config)?;

    let uses_stored_session = cli.command.uses_stored_session();
    let result = run(cli.command, &config, &store).await;

    if let Err(err) = &result {
        if let Some(client_err) = err.downcast_ref::<ClientError>() {
            log_client_error(client_err);
            if client_err.requires_sign_in() && uses_stored_session {
                expire_session(&store)?;
                eprintln!("{}", client_err);
                eprintln!("Run `scholar login` to sign in again.");
                std::process::exit(1);
            }
        }
    }
    result
}

impl Commands {
    /// Commands that send the stored access token. An authentication failure
    /// from any other command says nothing about the stored session.
    fn uses_stored_session(&self) -> bool {
        !matches!(
            self,
            Commands::Register { .. }
                | Commands::Confirm { .. }
                | Commands::Login { .. }
                | Commands::Logout
        )
    }
}

async fn run(command: Commands, config: &ClientConfig, store: &SessionStore) -> anyhow::Result<()> {
    match command {
        Commands::Register {
            email,
            name,
            role,
            password,
        } => {
            let identity = CognitoIdentityClient::from_config(config)?;
            let outcome = identity.sign_up(&email, &password, &name, role).await?;

            let mut session = store.load()?;
            session.set_pending_email(email.trim());
            store.save(&session)?;

            if outcome.user_confirmed {
                println!("Account created and confirmed. Run `scholar login` to sign in.");
            } else {
                match outcome.code_destination {
                    Some(destination) => {
                        println!("Account created. A confirmation code was sent to {}.", destination)
                    }
                    None => println!("Account created. Check your email for a confirmation code."),
                }
                println!("Run `scholar confirm <code>` to activate it.");
            }
        }
        Commands::Confirm { code, email } => {
            let identity = CognitoIdentityClient::from_config(config)?;
            let mut session = store.load()?;
            let email = match email.or_else(|| session.pending_email().map(str::to_string)) {
                Some(email) => email,
                None => bail!("No pending registration found; pass --email"),
            };

            identity.confirm_sign_up(&email, &code).await?;
            session.take_pending_email();
            store.save(&session)?;
            println!("Account confirmed. Run `scholar login` to sign in.");
        }
        Commands::Login { email, password } => {
            let identity = CognitoIdentityClient::from_config(config)?;
            let tokens = identity.sign_in(&email, &password).await?;
            let session = Session::signed_in(tokens);
            store.save(&session)?;
            tracing::info!(path = %store.path().display(), "Session stored");
            println!("Signed in as {}.", email.trim());
        }
        Commands::Logout => {
            expire_session(store)?;
            println!("Signed out.");
        }
        Commands::Whoami => {
            let identity = CognitoIdentityClient::from_config(config)?;
            let session = store.load()?;
            match identity.get_current_user(session.access_token()?).await? {
                Some(user) => print_json(&user)?,
                None => {
                    return Err(ClientError::Authentication(
                        "Session is no longer valid".to_string(),
                    )
                    .into())
                }
            }
        }
        Commands::Profile { user_id } => {
            let api = ApiClient::from_config(config)?;
            let session = store.load()?;
            let user_id = match user_id {
                Some(id) => id,
                None => session.user_id()?,
            };
            let profile = api.get_user_profile(&session, &user_id).await?;
            print_json(&profile)?;
        }
        Commands::Feed {
            filter,
            search,
            format,
        } => {
            let api = ApiClient::from_config(config)?;
            let session = store.load()?;
            let posts = api.list_all_posts(&session).await?;
            let query = PostQuery::new(filter, SortOrder::Newest, search.unwrap_or_default());
            let visible: Vec<_> = query.apply(&posts).into_iter().cloned().collect();

            match format {
                OutputFormat::Json => print_json(&visible)?,
                OutputFormat::Table => print_post_table("Feed", &visible),
            }
        }
        Commands::Post {
            content,
            category,
            attachments,
        } => {
            let api = ApiClient::from_config(config)?;
            let session = store.load()?;

            let mut composer = PostComposer::new();
            composer.set_content(content);
            composer.set_category(category);
            for path in &attachments {
                composer
                    .attach_path(path)
                    .await
                    .with_context(|| format!("Cannot attach {}", path.display()))?;
            }

            let outcome = composer.submit(&api, &session).await?;
            for skipped in &outcome.skipped_files {
                eprintln!("Warning: {} was not uploaded; a post carries one attachment", skipped);
            }
            if let Some(ComposerMessage::Success(message)) = composer.message() {
                println!("{}", message);
            }
            match &outcome.post {
                Some(post) => println!("Post ID: {}", post.post_id),
                None => println!("Attachment: {}", outcome.attachment_url),
            }
        }
        Commands::MyPosts {
            filter,
            sort,
            search,
            stats,
            format,
        } => {
            let view = MyPosts::new(ApiClient::from_config(config)?, store.load()?);
            view.refresh().await?;
            let query = PostQuery::new(filter, sort, search.unwrap_or_default());
            let visible = view.visible(&query);

            match format {
                OutputFormat::Json if stats => print_json(&serde_json::json!({
                    "posts": visible,
                    "stats": view.stats(),
                }))?,
                OutputFormat::Json => print_json(&visible)?,
                OutputFormat::Table => {
                    print_post_table("My Posts", &visible);
                    if stats {
                        print_stats(&view.stats());
                    }
                }
            }
        }
        Commands::Delete { post_id, yes } => {
            let view = MyPosts::new(ApiClient::from_config(config)?, store.load()?);
            view.refresh().await?;
            if !view.posts().iter().any(|p| p.post_id == post_id) {
                bail!("Post {} not found among your posts", post_id);
            }
            view.request_delete(&post_id)?;

            if !yes && !confirm(&format!("Delete post {}? This cannot be undone.", post_id))? {
                view.cancel_delete();
                println!("Cancelled.");
                return Ok(());
            }

            view.confirm_delete(&post_id).await?;
            println!("Post {} deleted.", post_id);
        }
        Commands::Download { post_id, file, out } => {
            let view = MyPosts::new(ApiClient::from_config(config)?, store.load()?);
            view.refresh().await?;

            let post = view
                .posts()
                .into_iter()
                .find(|p| p.post_id == post_id)
                .with_context(|| format!("Post {} not found among your posts", post_id))?;
            let file_name = match file {
                Some(name) => name,
                None => match post.attachments.first() {
                    Some(attachment) => attachment.name.clone(),
                    None => bail!("Post {} has no attachments", post_id),
                },
            };

            let path = view.download(&post_id, &file_name, &out).await?;
            println!("Saved {}", path.display());
        }
    }

    Ok(())
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
