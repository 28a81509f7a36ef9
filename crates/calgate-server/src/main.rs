use std::process::ExitCode;
use std::sync::Arc;

use calgate_core::init_tracing;
use calgate_providers::GoogleProvider;
use calgate_server::{AppState, ServerArgs, ServerResult, load_dotenv, serve};
use clap::Parser;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = load_dotenv() {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }

    let args = ServerArgs::parse();

    if let Err(e) = init_tracing(args.tracing_config()) {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: ServerArgs) -> ServerResult<()> {
    let (config, session_secret) = args.into_config()?;
    let provider = Arc::new(GoogleProvider::new(&config.client)?);
    let state = AppState::new(config, &session_secret, provider)?;
    serve(state).await
}
