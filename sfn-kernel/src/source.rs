//! Producer side: sends tagged payloads into the broker.

use std::sync::Arc;

use bytes::Bytes;
use sfn_primitives::Tag;
use tracing::info;

use crate::transport::{LocalTransport, Transport, TransportResult};

/// Named data producer.
pub struct Source {
    name: String,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source")
            .field("name", &self.name)
            .field("addr", &self.transport.addr())
            .finish()
    }
}

impl Source {
    /// Creates a source for `zipper_addr` using the in-process transport.
    #[must_use]
    pub fn new(name: impl Into<String>, zipper_addr: impl Into<String>) -> Self {
        Self::with_transport(name, Arc::new(LocalTransport::new(zipper_addr)))
    }

    /// Creates a source over an existing transport.
    #[must_use]
    pub fn with_transport(name: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            name: name.into(),
            transport,
        }
    }

    /// Returns the source name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Connects to the broker.
    ///
    /// # Errors
    ///
    /// Propagates the transport's connect failure.
    pub async fn connect(&self) -> TransportResult<()> {
        info!(name = %self.name, zipper_addr = %self.transport.addr(), "source connect");
        self.transport.connect().await
    }

    /// Sends `data` downstream under `tag`.
    ///
    /// # Errors
    ///
    /// Propagates transport failures such as writing before connecting.
    pub async fn write(&self, tag: Tag, data: impl Into<Bytes>) -> TransportResult<()> {
        let data = data.into();
        info!(name = %self.name, %tag, bytes = data.len(), "source write");
        self.transport.send(tag, data).await
    }
}
