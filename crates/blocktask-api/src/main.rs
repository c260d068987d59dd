//! Blocktask CLI and REST API entry point.
//!
//! Binary name: `btask`
//!
//! Parses CLI arguments, loads configuration, opens the task database when
//! the command needs it, then dispatches to the command handler or starts
//! the REST API server.

mod cli;
mod http;
mod state;

use anyhow::Context;
use clap::Parser;
use clap_complete::generate;
use tokio::sync::broadcast::error::RecvError;

use blocktask_core::event::EventBus;
use blocktask_observe::{init_tracing, shutdown_tracing, TracingOptions};

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need configuration or state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "btask", &mut std::io::stdout());
        return Ok(());
    }

    let data_dir = blocktask_infra::config::ensure_data_dir().await?;
    let config = blocktask_infra::config::load_global_config(&data_dir).await;

    let mut options = TracingOptions::from_verbosity(cli.verbose, cli.quiet);
    options.otel = config.telemetry.otel;
    init_tracing(&options).map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let needs_state = match &cli.command {
        Commands::Task { action } => cli::task::needs_state(action),
        Commands::Library { .. } | Commands::Serve { .. } => true,
        _ => false,
    };
    let state = if needs_state {
        Some(
            AppState::init(data_dir.clone(), config.clone())
                .await
                .with_context(|| format!("opening task database in {}", data_dir.display()))?,
        )
    } else {
        None
    };

    let result = run(cli, state, &config).await;
    shutdown_tracing();
    result
}

async fn run(
    cli: Cli,
    state: Option<AppState>,
    config: &blocktask_types::config::GlobalConfig,
) -> anyhow::Result<()> {
    match cli.command {
        Commands::Task { action } => {
            cli::task::handle_task_command(action, state.as_ref(), cli.json, cli.quiet).await?;
        }

        Commands::Library { action } => {
            let state = state.context("task database is not available")?;
            cli::library::handle_library_command(action, &state, cli.json, cli.quiet).await?;
        }

        Commands::Grammar => {
            let registry = blocktask_core::grammar::BlockTypeRegistry::standard();
            cli::grammar::show_grammar(&registry, cli.json)?;
        }

        Commands::Schema { which } => {
            cli::grammar::show_schema(which)?;
        }

        Commands::Serve { port, host } => {
            let state = state.context("task database is not available")?;
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);

            spawn_event_logger(&state.events);

            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("binding {addr}"))?;

            if !cli.quiet {
                println!(
                    "  {} Blocktask API listening on {}",
                    console::style("⚡").bold(),
                    console::style(format!("http://{addr}/api/v1")).cyan()
                );
                println!("  {}", console::style("Press Ctrl+C to stop").dim());
            }
            tracing::info!(%addr, "server started");

            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            if !cli.quiet {
                println!("\n  Server stopped.");
            }
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}

/// Log every graph change published by edit sessions.
fn spawn_event_logger(events: &EventBus) {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => tracing::debug!(?event, "graph event"),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event logger lagged behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
