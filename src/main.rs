use anyhow::{Context, Result};
use resume_insights::{app, config, logging};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_tracing(logging::LogTarget::service("resume-insights.log"));
    let config = config::init_config().context("Failed to load configuration")?;
    let application = app::build_application(config).context("Failed to build clients")?;

    let (listener, port) = bind_listener().await.context("Failed to bind listener")?;
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    axum::serve(listener, application.router)
        .await
        .context("HTTP server failed")?;

    application.worker.await.context("Ingest worker panicked")?;
    Ok(())
}

async fn bind_listener() -> Result<(TcpListener, u16), std::io::Error> {
    use std::net::Ipv4Addr;

    let config = config::get_config();
    if let Some(port) = config.server_port {
        return TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map(|listener| (listener, port));
    }

    const PORT_RANGE: std::ops::RangeInclusive<u16> = 7071..=7099;
    for port in PORT_RANGE {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => {
                tracing::debug!(port, "Bound server port");
                return Ok((listener, port));
            }
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
                continue;
            }
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        "No available port found in range 7071-7099",
    ))
}
