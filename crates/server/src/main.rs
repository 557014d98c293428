mod cli;
mod config;
mod routes;
mod services;
mod state;
#[cfg(test)]
mod testing;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    //  Logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,danbot_server=debug,danbot_core=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = cli::Cli::parse();

    match args.command {
        Some(cli::Commands::Predict(p)) => cli::predict::execute(args.global, p).await,
        Some(cli::Commands::Info) => cli::info::execute(args.global).await,
        Some(cli::Commands::Config(c)) => cli::config_cmd::execute(c).await,
        // Default: start HTTP server
        Some(cli::Commands::Serve(serve_args)) => {
            cli::serve::execute(args.global, serve_args).await
        }
        None => cli::serve::execute(args.global, cli::ServeArgs::default()).await,
    }
}
