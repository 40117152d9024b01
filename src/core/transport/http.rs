use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::debug;

use super::{EventSender, OneShotChannel, OneShotJob, TransportEvent, TransportFailure};
use crate::api::{BackendClient, ChatRequest};

/// One-shot channel over `POST /api/chat`.
#[derive(Clone)]
pub struct HttpOneShot {
    client: BackendClient,
}

impl HttpOneShot {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OneShotChannel for HttpOneShot {
    async fn exchange(&self, request: ChatRequest) -> Result<String, TransportFailure> {
        self.client.chat(&request).await.map_err(TransportFailure::from)
    }
}

/// Run `job` to completion and report exactly one outcome event.
pub async fn run_one_shot(channel: &dyn OneShotChannel, job: OneShotJob, events: &EventSender) {
    let OneShotJob { exchange, request } = job;
    let event = match channel.exchange(request).await {
        Ok(content) => TransportEvent::Reply(content),
        Err(failure) => {
            debug!(%exchange, "one-shot exchange failed: {failure}");
            TransportEvent::Failed(failure)
        }
    };
    let _ = events.send((event, exchange));
}

pub fn spawn_one_shot(
    channel: Arc<dyn OneShotChannel>,
    job: OneShotJob,
    events: EventSender,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        run_one_shot(channel.as_ref(), job, &events).await;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ChatMessage;
    use crate::core::transport::{event_channel, ExchangeId, FailureKind};
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn job(exchange: u64) -> OneShotJob {
        OneShotJob {
            exchange: ExchangeId(exchange),
            request: ChatRequest {
                model: "llama".into(),
                messages: vec![ChatMessage::new("user", "2+2?")],
                stream: false,
            },
        }
    }

    #[tokio::test]
    async fn reply_is_reported_with_its_exchange() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(serde_json::json!({"model": "llama"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"message": {"content": "4"}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = BackendClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let channel = HttpOneShot::new(client);
        let (tx, mut rx) = event_channel();

        run_one_shot(&channel, job(7), &tx).await;

        let (event, exchange) = rx.recv().await.unwrap();
        assert_eq!(exchange, ExchangeId(7));
        assert_eq!(event, TransportEvent::Reply("4".into()));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn server_error_is_reported_as_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(serde_json::json!({"error": "Erreur API Ollama"})),
            )
            .mount(&server)
            .await;

        let client = BackendClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let channel: Arc<dyn OneShotChannel> = Arc::new(HttpOneShot::new(client));
        let (tx, mut rx) = event_channel();

        spawn_one_shot(channel, job(1), tx).await.unwrap();

        match rx.recv().await.unwrap() {
            (TransportEvent::Failed(failure), ExchangeId(1)) => {
                assert_eq!(failure.kind, FailureKind::Status(500));
                assert!(failure.message.contains("Erreur API Ollama"));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn expired_session_is_reported_as_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = BackendClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let (tx, mut rx) = event_channel();
        run_one_shot(&HttpOneShot::new(client), job(2), &tx).await;

        match rx.recv().await.unwrap() {
            (TransportEvent::Failed(failure), _) => assert!(failure.is_unauthorized()),
            other => panic!("unexpected event {other:?}"),
        }
    }
}
