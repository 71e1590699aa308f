use std::sync::Arc;

use campaign_mcp::{
    broadcast_shutdown, build_app,
    config::Config,
    domain::tools::campaign_registry,
    logging,
    mcp::session::SessionRegistry,
    transport::{socket::serve_socket, stdio::serve_stdio},
    AppState,
};
use clap::{Parser, ValueEnum};
use tokio::task::JoinSet;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Binding {
    /// Streamable HTTP and WebSocket on BIND_ADDR:BIND_PORT
    Http,
    /// Raw socket on BIND_ADDR:MCP_SOCKET_PORT
    Socket,
    /// Newline-delimited JSON on stdin/stdout
    Stdio,
}

#[derive(Debug, Parser)]
#[command(version, about = "Insurance campaign MCP server")]
struct Args {
    /// Transport bindings to start; may be repeated
    #[arg(long = "transport", value_enum, default_values_t = [Binding::Http, Binding::Socket])]
    transports: Vec<Binding>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    logging::init_logging(args.verbose);

    let config = Config::from_env()?;
    let state = AppState::new(Arc::new(campaign_registry()), &config);
    let sweeper = state.dedup.spawn_sweeper(config.dedup_sweep_interval);
    let socket_sessions = SessionRegistry::new("socket");

    let mut bindings = JoinSet::new();
    for binding in &args.transports {
        match binding {
            Binding::Http => {
                let bind_socket = config.bind_socket()?;
                let listener = tokio::net::TcpListener::bind(bind_socket).await?;
                let app = build_app(state.clone());
                info!(
                    bind_addr = %config.bind_addr,
                    bind_port = config.bind_port,
                    "streamable http and websocket transports starting"
                );
                bindings.spawn(async move { axum::serve(listener, app.into_make_service()).await });
            }
            Binding::Socket => {
                let listener = tokio::net::TcpListener::bind(config.socket_bind()?).await?;
                bindings.spawn(serve_socket(
                    listener,
                    state.dispatcher.clone(),
                    socket_sessions.clone(),
                ));
            }
            Binding::Stdio => {
                bindings.spawn(serve_stdio(state.dispatcher.clone()));
            }
        }
    }

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("shutdown requested");
        }
        Some(finished) = bindings.join_next() => {
            match finished {
                Ok(Ok(())) => info!("transport finished"),
                Ok(Err(err)) => error!(error = %err, "transport failed"),
                Err(err) => error!(error = %err, "transport task aborted"),
            }
        }
    }

    let notified = broadcast_shutdown(&[&state.streams, &state.websockets, &socket_sessions]);
    info!(sessions = notified, "shutdown notice sent");

    sweeper.abort();
    bindings.shutdown().await;
    Ok(())
}
