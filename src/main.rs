use chat_gateway::{registry, server, telemetry, Error, Settings};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Error> {
    // A missing .env file is fine; the environment may already be set.
    let _ = dotenvy::dotenv();

    let settings = Settings::from_env()?;
    telemetry::init(&settings.log_filter)?;

    tracing::info!(app = %settings.app_name, "starting: loading the AI model");
    registry::initialize_llm_provider(&settings).await?;
    tracing::info!("AI model loaded");

    let service = registry::chat_service()?;
    let address = settings.bind_address();
    let listener = TcpListener::bind(&address).await?;
    tracing::info!(
        %address,
        provider = service.provider().name(),
        model = service.provider().model(),
        "listening"
    );

    server::serve(listener, service, shutdown_signal()).await?;

    tracing::info!("server stopped");
    Ok(())
}

/// Wait for `SIGINT` or `SIGTERM`.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    tracing::info!("shutdown signal received");
}
