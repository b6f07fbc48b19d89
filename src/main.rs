use std::fs;
use std::sync::Arc;
use tokio::signal;
use voyage::api;
use voyage::logger::*;
use voyage::server::*;
use voyage::settings::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let project_settings = parse_settings(cli.settings.as_deref())?;

    let logger = Logger::new_bootstrap(project_settings.log.json);
    info!(?project_settings);
    let logger_config = LogConfig {
        filter: project_settings.log.filter.clone(),
    };
    logger.reload_from_config(&logger_config)?;

    let address: std::net::SocketAddr = project_settings.http.address.parse()?;
    if !fs::metadata(&project_settings.http.cert_path)?.is_file() {
        return Err(anyhow::anyhow!(
            "TLS cert is not a regular file: {:?}",
            project_settings.http.cert_path
        ));
    }
    if !fs::metadata(&project_settings.http.key_path)?.is_file() {
        return Err(anyhow::anyhow!(
            "TLS key is not a regular file: {:?}",
            project_settings.http.key_path
        ));
    }

    let server = Arc::new(Server::try_new(&project_settings).await?);

    let (bound, serving) = warp::serve(api::filter(server.clone()))
        .tls()
        .cert_path(project_settings.http.cert_path.clone())
        .key_path(project_settings.http.key_path.clone())
        .bind_with_graceful_shutdown(address, async {
            if let Err(e) = signal::ctrl_c().await {
                error!("could not listen for SIGINT: {}", e);
                std::future::pending::<()>().await;
            }
        });
    info!(%bound, "listening");
    serving.await;

    let shutdown_timeout = std::time::Duration::from_secs(10);
    match tokio::time::timeout(shutdown_timeout, server.shutdown()).await {
        Ok(_) => info!("server shutdown successfully"),
        Err(_) => error!("server shutdown timed out"),
    }

    Ok(())
}
