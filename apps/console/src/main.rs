use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{HttpTransport, Outcome, SyncClient};
use serde_json::Value;
use server_api::MockTransport;
use shared::{
    domain::{Role, SessionId},
    transport::Transport,
};
use storage::Storage;
use tracing::info;

#[derive(Parser, Debug)]
struct Args {
    /// Backend base URL, e.g. http://127.0.0.1:8443
    #[arg(long, conflicts_with = "fixture")]
    server_url: Option<String>,
    /// Serve requests in-process from a dataset file instead of a server.
    #[arg(long)]
    fixture: Option<PathBuf>,
    /// Write the in-process dataset back to `--fixture` on exit.
    #[arg(long, requires = "fixture")]
    save: bool,
    #[arg(long, default_value = "admin")]
    role: Role,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every dispatcher with its description.
    Catalog,
    /// Run one dispatcher with a JSON payload.
    Run {
        name: String,
        #[arg(default_value = "null")]
        payload: String,
    },
    Sessions,
    /// Load a session and print its joined assignments.
    Assignments {
        #[arg(long)]
        session: i64,
    },
    /// Load a session and print its positions.
    Positions {
        #[arg(long)]
        session: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let storage = match &args.fixture {
        Some(path) => Some(Storage::load_fixture(path)?),
        None => None,
    };
    let transport: Arc<dyn Transport> = match (&args.server_url, &storage) {
        (Some(url), _) => Arc::new(HttpTransport::new(url)?),
        (None, Some(storage)) => Arc::new(MockTransport::from_storage(storage.clone())),
        (None, None) => bail!("pass either --server-url or --fixture"),
    };

    let client = SyncClient::new(transport);
    client.set_active_role(args.role);
    let output = execute(&client, args.command).await?;
    println!("{output}");

    if let (true, Some(path), Some(storage)) = (args.save, &args.fixture, &storage) {
        storage.save_fixture(path)?;
        info!(path = %path.display(), "dataset saved");
    }
    Ok(())
}

async fn execute(client: &SyncClient, command: Command) -> Result<String> {
    match command {
        Command::Catalog => Ok(client
            .catalog()
            .iter()
            .map(|info| format!("{:<28}{}", info.name, info.description))
            .collect::<Vec<_>>()
            .join("\n")),
        Command::Run { name, payload } => {
            let payload: Value =
                serde_json::from_str(&payload).context("payload is not valid JSON")?;
            let outcome = client.run(&name, payload).await?;
            ensure_no_errors(client)?;
            Ok(format!("{name}: {outcome:?}"))
        }
        Command::Sessions => {
            fetch(client, &["fetch_sessions"]).await?;
            Ok(serde_json::to_string_pretty(
                &client.state().sessions.model.model_data,
            )?)
        }
        Command::Assignments { session } => {
            open_session(client, SessionId(session)).await?;
            fetch(client, &["fetch_positions", "fetch_applicants", "fetch_assignments"]).await?;
            Ok(serde_json::to_string_pretty(&client.assignments())?)
        }
        Command::Positions { session } => {
            open_session(client, SessionId(session)).await?;
            fetch(client, &["fetch_positions"]).await?;
            Ok(serde_json::to_string_pretty(
                &client.positions_for_active_session(),
            )?)
        }
    }
}

async fn open_session(client: &SyncClient, session: SessionId) -> Result<()> {
    fetch(client, &["fetch_sessions"]).await?;
    client.set_active_session(Some(session));
    if client.state().sessions.active_session.is_none() {
        bail!("no session with id {session}");
    }
    Ok(())
}

async fn fetch(client: &SyncClient, names: &[&str]) -> Result<()> {
    for name in names {
        if client.run(name, Value::Null).await? == Outcome::Reported {
            break;
        }
    }
    ensure_no_errors(client)
}

fn ensure_no_errors(client: &SyncClient) -> Result<()> {
    let errors = client.errors();
    match errors.first() {
        None => Ok(()),
        Some(first) => bail!(
            "{} error(s) reported; first ({:?}): {}",
            errors.len(),
            first.category,
            first.message
        ),
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
