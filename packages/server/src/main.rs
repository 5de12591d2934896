#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Binary entry point for the paperwright API server.
//!
//! Connects to the database, runs migrations, and wires up the LLM
//! gateway, vector store, embedder, and web tools from environment
//! variables (`paperwright_server::AppState::from_env`) before serving the
//! `/api` surface. Pass `--interactive` to be prompted for the bind
//! address/port instead of reading `BIND_ADDR`/`PORT` directly.

mod interactive;

use paperwright_server::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    log::info!("Initializing application state...");
    let state = AppState::from_env().await.expect("failed to initialize application state");

    if std::env::args().any(|arg| arg == "--interactive") {
        interactive::run(state).await
    } else {
        paperwright_server::run_server(state).await
    }
}
