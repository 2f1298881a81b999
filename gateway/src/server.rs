mod errors;
mod routes;

pub use errors::ServerError;
pub use routes::router;

use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::task::JoinHandle;
use weather_gateway_core::{Config, Dispatcher};

pub type HttpJoinHandle = JoinHandle<Result<(), ServerError>>;

pub struct Server {
    port: u16,
    server_handle: HttpJoinHandle,
}

impl Server {
    /// Validate the credential, bind `config.server.bind` and start serving.
    #[tracing::instrument(level = "debug", skip(config))]
    pub async fn build(config: &Config) -> Result<Self, ServerError> {
        let dispatcher = Dispatcher::from_config(config).map_err(ServerError::Config)?;
        Self::build_with(dispatcher, config.server.bind).await
    }

    pub async fn build_with(dispatcher: Dispatcher, address: SocketAddr) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(address).await?;
        let local = listener.local_addr()?;
        tracing::info!("weather gateway listening on {local}");

        let app = router(dispatcher);
        let server_handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
            tracing::info!("weather gateway shutting down");
            Ok::<_, ServerError>(())
        });

        Ok(Self { port: local.port(), server_handle })
    }

    pub const fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), ServerError> {
        self.server_handle.await?
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!("failed to install SIGTERM handler: {err}");
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

    tracing::info!("signal received, starting graceful shutdown");
}
