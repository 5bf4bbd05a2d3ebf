// ABOUTME: Mock flux relay: a FluxService implementation with inspectable state.
// ABOUTME: Used by the flux-mock-relay binary and by integration tests over loopback TCP.

pub mod console;
pub mod service;
pub mod state;

use std::future::Future;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use flux_proto::server::FluxServiceServer;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tracing::info;

pub use service::MockRelay;
pub use state::{MockOptions, RelayEvent, RelayState, TEST_CHAT_GUID};

impl MockRelay {
    pub fn into_service(self) -> FluxServiceServer<MockRelay> {
        FluxServiceServer::new(self)
    }

    /// Serve on `addr` until `shutdown` resolves.
    pub async fn serve(
        self,
        addr: SocketAddr,
        shutdown: impl Future<Output = ()> + Send,
    ) -> Result<()> {
        info!(%addr, "Mock relay listening");
        Server::builder()
            .add_service(self.into_service())
            .serve_with_shutdown(addr, shutdown)
            .await
            .context("running mock relay")
    }

    /// Bind an ephemeral loopback port and serve in the background.
    ///
    /// Returns the `http://` address clients should dial.
    pub async fn spawn_local(self) -> Result<(String, JoinHandle<()>)> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("binding loopback listener")?;
        let addr = listener.local_addr().context("reading listener address")?;
        let service = self.into_service();

        let handle = tokio::spawn(async move {
            let result = Server::builder()
                .add_service(service)
                .serve_with_incoming(TcpListenerStream::new(listener))
                .await;
            if let Err(e) = result {
                tracing::error!(error = %e, "Mock relay stopped");
            }
        });

        Ok((format!("http://{addr}"), handle))
    }
}
