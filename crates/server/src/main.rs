use std::net::SocketAddr;

use server_api::{build_router, ApiContext};
use storage::Storage;
use tracing::{error, info};

mod config;

use config::{load_settings, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings();
    let storage = open_storage(&settings)?;
    let app = build_router(ApiContext::new(storage));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn open_storage(settings: &Settings) -> anyhow::Result<Storage> {
    let Some(path) = settings.fixture_path.as_deref() else {
        info!("no fixture configured; starting with an empty dataset");
        return Ok(Storage::new());
    };
    Storage::load_fixture(path).map_err(|err| {
        error!(%path, error = %format!("{err:#}"), "failed to load fixture dataset");
        err
    })
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
