use std::process::ExitCode;
use std::sync::Arc;

use checkers::config::ServerConfig;
use checkers::registry::SessionRegistry;
use checkers::server::Server;
use checkers::stats::ScoreBoard;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            return ExitCode::FAILURE;
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let scores = Arc::new(ScoreBoard::default());
    let registry = Arc::new(SessionRegistry::new(scores.clone()));
    let result = Server::bind(config, registry, scores).and_then(Server::run);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("Server failed: {}", err);
            ExitCode::FAILURE
        }
    }
}
