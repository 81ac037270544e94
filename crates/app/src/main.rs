//! Verdant - command-line client for the plant portal API
//!
//! Authenticates with the refresh cookie, then talks to the portal with a
//! short-lived bearer token that is refreshed on demand.
//!
//! The cookie jar lives as long as the process. Without
//! `VERDANT_REFRESH_TOKEN`, commands that reach the API first sign in with
//! `VERDANT_EMAIL` and `VERDANT_PASSWORD` when both are set.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use verdant_application::{
    ApplicationError, AuthSession, CancellationToken, IdentityState, ResolveIdentity,
    SocialDirectory,
};
use verdant_domain::{SessionCredential, UserSummary};
use verdant_infrastructure::{
    ClientConfig, FileIdentityRepository, ReqwestHttpClient, SystemClock,
};

type Session = AuthSession<ReqwestHttpClient>;

#[derive(Parser, Debug)]
#[command(name = "verdant", version, about = "Plant portal API client")]
struct Cli {
    /// API base URL, overriding NEXT_PUBLIC_API_URL and VERDANT_API_URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in with VERDANT_EMAIL and VERDANT_PASSWORD
    SignIn,
    /// Show the signed-in user
    #[command(alias = "me")]
    Whoami,
    /// Show local session state without contacting the API
    Status,
    /// Search users by name (Ctrl-C cancels)
    Search { query: String },
    /// List your friends, or another user's
    Friends {
        #[arg(long)]
        user: Option<u64>,
    },
    /// List pending friend requests
    Requests,
    /// Follow a user, accepting their friend request if they sent one
    Follow { user_id: u64 },
    /// Stop following a user
    Unfollow { user_id: u64 },
    /// Remove a friendship in both directions
    Unfriend { user_id: u64 },
    /// Reject a friend request
    Reject { user_id: u64 },
    /// Check whether two users are friends
    IsFriend { user_id: u64, target_id: u64 },
    /// End the session on the server and forget local state
    SignOut,
}

impl Command {
    /// Whether the command talks to the API with the session.
    const fn uses_session(&self) -> bool {
        !matches!(self, Self::SignIn | Self::Status)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so command output stays pipeable
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::from_env().context("invalid configuration")?;
    if let Some(url) = &cli.api_url {
        config = config.with_api_url(url)?;
    }
    debug!(api_url = %config.api_url, "configuration loaded");

    let client = ReqwestHttpClient::new(&config).context("failed to build HTTP client")?;
    let session = Arc::new(AuthSession::new(
        Arc::new(client),
        config.api_base(),
        config.credential.clone(),
    ));

    run(cli.command, &config, session).await
}

async fn run(command: Command, config: &ClientConfig, session: Arc<Session>) -> Result<()> {
    let identity = ResolveIdentity::new(
        Arc::clone(&session),
        FileIdentityRepository::new(config.identity_path.clone()),
        SystemClock::new(),
    );
    let social = SocialDirectory::new(Arc::clone(&session));

    if command.uses_session()
        && config.credential == SessionCredential::Ambient
        && let Some(login) = &config.login
    {
        session.sign_in(login).await.context("sign-in failed")?;
    }

    match command {
        Command::SignIn => {
            let Some(login) = &config.login else {
                bail!("set VERDANT_EMAIL and VERDANT_PASSWORD to sign in");
            };
            print_identity(&identity.sign_in(login).await?);
        }
        Command::Whoami => print_identity(&identity.execute().await?),
        Command::Status => {
            println!("api: {}", config.api_url);
            println!(
                "token: {}",
                session.token_store().status().await.display_message()
            );
            match identity.cached().await? {
                Some(stored) => println!(
                    "last user: {} (since {})",
                    stored.username,
                    stored.saved_at.to_rfc3339()
                ),
                None => println!("last user: none"),
            }
        }
        Command::Search { query } => search(&social, &query).await?,
        Command::Friends { user } => {
            let friends = match user {
                Some(id) => social.friends_of(id).await?,
                None => social.my_friends().await?,
            };
            print_users(&friends);
        }
        Command::Requests => print_users(&social.friend_requests().await?),
        Command::Follow { user_id } => {
            social.follow(user_id).await?;
            println!("following {user_id}");
        }
        Command::Unfollow { user_id } => {
            social.unfollow(user_id).await?;
            println!("unfollowed {user_id}");
        }
        Command::Unfriend { user_id } => {
            social.unfriend(user_id).await?;
            println!("unfriended {user_id}");
        }
        Command::Reject { user_id } => {
            social.reject(user_id).await?;
            println!("rejected {user_id}");
        }
        Command::IsFriend { user_id, target_id } => {
            println!("{}", social.is_friend(user_id, target_id).await?);
        }
        Command::SignOut => {
            if identity.sign_out().await? {
                println!("signed out");
            } else {
                println!("signed out locally; the server session was not revoked");
            }
        }
    }

    Ok(())
}

async fn search(social: &SocialDirectory<ReqwestHttpClient>, query: &str) -> Result<()> {
    let (token, receiver) = CancellationToken::new();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    let result = social.search_users_with_cancellation(query, receiver).await;
    interrupt.abort();

    match result {
        Ok(users) => print_users(&users),
        Err(ApplicationError::Cancelled) => eprintln!("search cancelled"),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

fn print_identity(state: &IdentityState) {
    match state {
        IdentityState::SignedIn(user) => {
            println!("{}", user.username);
            if let Some(email) = &user.email {
                println!("{email}");
            }
        }
        IdentityState::SignedOut => println!("not signed in"),
    }
}

fn print_users(users: &[UserSummary]) {
    if users.is_empty() {
        println!("no users");
        return;
    }
    for user in users {
        println!("{:>6}  {:<20} {}", user.id, user.username, user.display_name());
    }
}
