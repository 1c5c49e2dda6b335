use async_trait::async_trait;
use fleet_common::error::{Error, Result};
use std::collections::BTreeMap;

/// Publishes one message to a subject, with a deterministic id for
/// downstream de-duplication and a small set of routing attributes.
/// Abstracts the fan-out router and worker from the concrete transport,
/// following this codebase's existing pattern of talking to NATS through
/// a thin seam rather than inline at every call site.
#[async_trait]
pub trait Bus: Send + Sync {
    async fn publish(&self, subject: &str, message_id: &str, payload: Vec<u8>, attrs: BTreeMap<String, String>) -> Result<()>;
}

/// JetStream-backed [`Bus`]. Connects once at construction and reuses the
/// stream handle for every publish; `get_or_create_stream` is idempotent
/// so repeated binary restarts never fail on "stream already exists".
pub struct NatsBus {
    jetstream: async_nats::jetstream::Context,
}

impl NatsBus {
    pub async fn connect(nats_url: &str, stream_name: &str, subjects: Vec<String>) -> Result<Self> {
        let client = async_nats::connect(nats_url)
            .await
            .map_err(|e| Error::Transient(format!("failed to connect to NATS at {nats_url}: {e}")))?;
        let jetstream = async_nats::jetstream::new(client);

        jetstream
            .get_or_create_stream(async_nats::jetstream::stream::Config {
                name: stream_name.to_string(),
                subjects,
                ..Default::default()
            })
            .await
            .map_err(|e| Error::Transient(format!("failed to get-or-create stream {stream_name}: {e}")))?;

        Ok(Self { jetstream })
    }

    pub fn from_context(jetstream: async_nats::jetstream::Context) -> Self {
        Self { jetstream }
    }
}

#[async_trait]
impl Bus for NatsBus {
    async fn publish(&self, subject: &str, message_id: &str, payload: Vec<u8>, attrs: BTreeMap<String, String>) -> Result<()> {
        let mut headers = async_nats::HeaderMap::new();
        for (k, v) in attrs {
            headers.insert(k.as_str(), v.as_str());
        }

        let publish = async_nats::jetstream::message::PublishMessage::build()
            .payload(payload.into())
            .message_id(message_id)
            .headers(headers);

        let ack = self
            .jetstream
            .send_publish(subject, publish)
            .await
            .map_err(|e| Error::Transient(format!("publish to {subject} failed: {e}")))?;

        ack.await.map_err(|e| Error::Transient(format!("publish ack for {subject} failed: {e}")))?;
        Ok(())
    }
}
