#![deny(warnings)]
#![deny(clippy::unwrap_used)]

use std::env;
use std::sync::Arc;

use dotenv::dotenv;
use tracing::{info, warn};

use remote_file::remote::config::{resolve_host_key_policy, resolve_port};
use remote_file::remote::{
    ConnectionManager, FileQuery, RemoteFileResolver, RemoteShellExecutor, Server, SshDialer,
};

const USAGE: &str = "usage: remote-file [--privileged] [--sensitive] <path>";

const HOST_ENV_VAR: &str = "REMOTE_HOST";
const USER_ENV_VAR: &str = "REMOTE_USER";
const PASSWORD_ENV_VAR: &str = "REMOTE_PASSWORD";
const KEY_PATH_ENV_VAR: &str = "REMOTE_KEY_PATH";
const SUDO_PASSWORD_ENV_VAR: &str = "REMOTE_SUDO_PASSWORD";

/// Parse `[--privileged] [--sensitive] <path>`.
fn parse_args(args: impl IntoIterator<Item = String>) -> Result<FileQuery, String> {
    let mut privileged = false;
    let mut sensitive = false;
    let mut path = None;

    for arg in args {
        match arg.as_str() {
            "--privileged" => privileged = true,
            "--sensitive" => sensitive = true,
            flag if flag.starts_with("--") => {
                return Err(format!("unknown flag {}\n{}", flag, USAGE));
            }
            _ if path.is_some() => return Err(format!("only one path allowed\n{}", USAGE)),
            other => path = Some(other.to_string()),
        }
    }

    let path = path.ok_or_else(|| USAGE.to_string())?;
    Ok(FileQuery::new(path)
        .privileged(privileged)
        .sensitive(sensitive))
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}

/// Build the server descriptor from `REMOTE_*` environment variables.
fn server_from_env() -> Result<Server, String> {
    let host = non_empty_env(HOST_ENV_VAR).ok_or_else(|| format!("{} is not set", HOST_ENV_VAR))?;
    let user = non_empty_env(USER_ENV_VAR).ok_or_else(|| format!("{} is not set", USER_ENV_VAR))?;

    let mut server = Server::for_host(host, user).with_port(resolve_port(None));
    if let Some(password) = non_empty_env(PASSWORD_ENV_VAR) {
        server = server.with_password(password);
    }
    if let Some(key_path) = non_empty_env(KEY_PATH_ENV_VAR) {
        server = server.with_private_key(key_path);
    }
    if let Some(sudo_password) = non_empty_env(SUDO_PASSWORD_ENV_VAR) {
        server = server.with_sudo_password(sudo_password);
    }
    Ok(server)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("info".parse().expect("valid directive")),
        )
        .init();

    let query = parse_args(env::args().skip(1))?;
    let mut server = server_from_env()?;
    let policy = resolve_host_key_policy(None).ok_or(
        "no host key policy: set REMOTE_KNOWN_HOSTS, REMOTE_HOST_FINGERPRINT or REMOTE_ACCEPT_ANY_HOST_KEY",
    )?;

    info!("Reading {} from {}", query.path, server.full_address());

    let dialer = SshDialer::new(policy);
    let manager = Arc::new(ConnectionManager::new(dialer));
    let resolver = RemoteFileResolver::new(RemoteShellExecutor::new(manager.clone()));

    let outcome = resolver.resolve(&query, &mut server).await;

    if let Some(connection) = manager.get(server.name())
        && let Err(e) = manager.close(&connection).await
    {
        warn!("Failed to close connection: {}", e);
    }

    let state = outcome?;
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}
