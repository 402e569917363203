//! otpgate-service binary
//!
//! Initializes tracing, parses configuration from the environment/command line, and serves the
//! verification API until a shutdown signal arrives.

use std::process::ExitCode;

use clap::Parser;
use eyre::Context as _;
use otpgate_service::config::OrchestratorConfig;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> eyre::Result<ExitCode> {
    tracing_subscriber::fmt::init();

    let config = OrchestratorConfig::parse();
    tracing::info!("starting otpgate-service with config: {config:#?}");

    let cancellation_token = CancellationToken::new();
    let shutdown_signal = cancellation_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received shutdown signal");
        }
        shutdown_signal.cancel();
    });

    let builder = otpgate_service::OtpgateServiceBuilder::init(config.clone(), cancellation_token.clone())
        .await
        .context("while initializing otpgate-service")?;
    let (router, mut completion_rx, tasks) = builder.build();

    tokio::spawn(async move {
        while let Some(record) = completion_rx.recv().await {
            tracing::debug!(
                session_id = %record.session_id,
                verified = record.verified,
                attempts = record.attempts,
                elapsed_ms = record.elapsed.as_millis() as u64,
                "completion record"
            );
        }
    });

    let bind_addr = ("0.0.0.0", config.listen_port);
    let tcp_listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .context("while binding tcp-listener")?;
    tracing::info!("binding to {:?}", tcp_listener.local_addr());

    let axum_shutdown = cancellation_token.clone();
    let server = tokio::spawn(async move {
        let result = axum::serve(tcp_listener, router)
            .with_graceful_shutdown(async move { axum_shutdown.cancelled().await })
            .await;
        if let Err(err) = result {
            tracing::error!("axum server exited with error: {err:?}");
        }
    });

    if let Err(err) = server.await {
        tracing::error!("axum server task panicked: {err:?}");
    }
    if let Some(sweeper) = tasks.sweeper {
        sweeper.abort();
    }

    tracing::info!("shutdown complete");
    Ok(ExitCode::SUCCESS)
}
