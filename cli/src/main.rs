use std::path::PathBuf;
use std::sync::Arc;

use authsession::{AuthConfig, AuthError, FileStore, HttpAuthApi, Navigator, SessionAdapter, StoreError};
use clap::{Parser, Subcommand};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "auth-cli", about = "Log in, out, and inspect a chat API session")]
struct Cli {
    #[arg(long, env = "AUTH_BASE_URL")]
    base_url: Option<String>,

    /// Session file; also holds the token cookies between runs.
    #[arg(long, env = "AUTH_STORE_PATH", default_value = ".authsession.json")]
    store: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Obtain tokens and load account details.
    Login {
        username: String,
        #[arg(long, env = "AUTH_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account.
    Register {
        username: String,
        #[arg(long, env = "AUTH_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Clear the local session and tell the server.
    Logout,
    /// Ask the server for fresh token cookies.
    Refresh,
    /// Reload account details for the stored user id.
    Whoami,
    /// Print the stored session without contacting the server.
    Status,
}

/// The CLI has no views; the redirect target is only reported.
struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, path: &str) {
        tracing::info!(path, "session cleared; login required");
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let mut config = AuthConfig::from_env()?;
    if let Some(base_url) = cli.base_url.as_deref() {
        config = config.with_base_url(base_url)?;
    }

    let api = Arc::new(HttpAuthApi::new(&config)?);
    let store = Arc::new(FileStore::open(&cli.store)?);
    let adapter = SessionAdapter::new(api, store).with_navigator(Arc::new(LogNavigator), config.login_path.clone());

    match cli.command {
        Command::Login { username, password } => {
            let session = adapter.login(&username, &password).await?;
            print_json(&serde_json::to_value(session)?)
        }
        Command::Register { username, password } => {
            let status = adapter.register(&username, &password).await?;
            println!("{status}");
            Ok(())
        }
        Command::Logout => {
            adapter.logout().await?;
            println!("logged out");
            Ok(())
        }
        Command::Refresh => {
            adapter.refresh_access_token().await?;
            println!("ok");
            Ok(())
        }
        Command::Whoami => {
            let details = adapter.fetch_user_details().await?;
            print_json(&serde_json::to_value(details)?)
        }
        Command::Status => print_json(&serde_json::to_value(adapter.session())?),
    }
}

fn print_json(value: &serde_json::Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_login_with_password_flag() {
        let cli = Cli::try_parse_from(["auth-cli", "login", "alice", "--password", "pw1"]).unwrap();
        match cli.command {
            Command::Login { username, password } => {
                assert_eq!(username, "alice");
                assert_eq!(password, "pw1");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn store_path_override() {
        let cli = Cli::try_parse_from(["auth-cli", "--store", "/tmp/s.json", "status"]).unwrap();
        assert_eq!(cli.store, PathBuf::from("/tmp/s.json"));
        assert!(matches!(cli.command, Command::Status));
    }

    #[test]
    fn base_url_flag_is_optional() {
        let cli = Cli::try_parse_from(["auth-cli", "--base-url", "http://localhost:9000/api", "logout"]).unwrap();
        assert_eq!(cli.base_url.as_deref(), Some("http://localhost:9000/api"));
        assert!(matches!(cli.command, Command::Logout));
    }

    #[test]
    fn http_errors_display_status() {
        let err = CliError::from(AuthError::Http { status: 401, body: String::new() });
        assert_eq!(err.to_string(), "http error: status 401");
    }
}
