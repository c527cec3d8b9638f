//! API server lifecycle: bind → spawn background task → return handle
//! with shutdown channel.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::api::router::api_router;
use crate::pipeline::rag::MedicalAssistant;

/// Handle to a running API server.
pub struct ApiServer {
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ApiServer {
    /// Shut down the server gracefully.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("API server shutdown signal sent");
        }
    }

    /// Wait until the server task exits.
    pub async fn wait(self) {
        if let Err(e) = self.task.await {
            tracing::error!("API server task failed: {e}");
        }
    }
}

/// Bind `addr` and serve the API in a background task.
pub async fn start_server(
    addr: SocketAddr,
    assistant: Arc<MedicalAssistant>,
) -> Result<ApiServer, std::io::Error> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let addr = listener.local_addr()?;

    let app = api_router(assistant);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("API server received shutdown signal");
        };

        tracing::info!(%addr, "API server started");

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("API server error: {e}");
        }

        tracing::info!("API server stopped");
    });

    Ok(ApiServer {
        addr,
        shutdown_tx: Some(shutdown_tx),
        task,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn localhost() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 0))
    }

    #[tokio::test]
    async fn start_and_stop_server() {
        let assistant = Arc::new(MedicalAssistant::degraded("test"));
        let mut server = start_server(localhost(), assistant)
            .await
            .expect("server should start");

        assert!(server.addr.port() > 0);

        let url = format!("http://{}/health", server.addr);
        let resp = reqwest::get(&url).await.unwrap();
        assert!(resp.status().is_success());
        let json: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(json["retrieval"], "degraded");

        server.shutdown();
        server.wait().await;
    }

    #[tokio::test]
    async fn analyze_over_http() {
        let assistant = Arc::new(MedicalAssistant::degraded("test"));
        let mut server = start_server(localhost(), assistant).await.unwrap();

        let client = reqwest::Client::new();
        let resp = client
            .post(format!("http://{}/analyze", server.addr))
            .json(&serde_json::json!({
                "patient_name": "João",
                "ecg_status": "ARRITMIA SUPRAVENTRICULAR",
                "bp_value": "130/85",
                "spo2_value": "96%",
                "location_type": "URBAN",
                "timestamp": "2025-03-01T10:00:00",
            }))
            .send()
            .await
            .unwrap();

        assert!(resp.status().is_success());
        let json: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(json["status"], "received");
        assert!(json["medical_advice"]
            .as_str()
            .unwrap()
            .contains("Arritmia Supraventricular"));

        server.shutdown();
        server.wait().await;
    }

    #[tokio::test]
    async fn bind_conflict_is_an_error() {
        let assistant = Arc::new(MedicalAssistant::degraded("test"));
        let mut first = start_server(localhost(), assistant.clone()).await.unwrap();
        let result = start_server(first.addr, assistant).await;
        assert!(result.is_err());
        first.shutdown();
    }
}
