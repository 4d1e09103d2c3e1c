//! In-process fake transport for unit and integration tests
//!
//! [`FakeTransport::new`] yields a `(FakeTransport, FakeTransportHandle)`
//! pair. The transport goes into the code under test; the handle stays with
//! the test, which reads outbound traffic from `handle.outbound_rx` and
//! injects server messages through `handle.inbound_tx` (or the
//! [`FakeTransport::inject_message`] convenience, which serializes a
//! [`serde_json::Value`] onto the same channel).
//!
//! ```text
//! client send() -----> outbound_tx ----> outbound_rx (test reads)
//! test inbound_tx ---> inbound_rx  ----> receive()   (client reads)
//! ```

use std::pin::Pin;
use std::sync::Arc;

use futures::Stream;
use tokio::sync::{mpsc, Mutex};

use crate::error::{McprobeError, Result};
use crate::transport::Transport;

/// In-memory [`Transport`] used to drive protocol code without a real
/// process or network endpoint.
#[derive(Debug)]
pub struct FakeTransport {
    outbound_tx: mpsc::UnboundedSender<String>,
    inbound_rx: Arc<Mutex<mpsc::UnboundedReceiver<String>>>,
    /// Same channel end as the handle's `inbound_tx`, kept for
    /// [`FakeTransport::inject_message`].
    inbound_inject_tx: mpsc::UnboundedSender<String>,
}

/// The test-side handle for a [`FakeTransport`].
#[derive(Debug)]
pub struct FakeTransportHandle {
    /// Messages the client sent via [`Transport::send`].
    pub outbound_rx: mpsc::UnboundedReceiver<String>,
    /// Feeds the client's [`Transport::receive`] stream.
    pub inbound_tx: mpsc::UnboundedSender<String>,
}

impl FakeTransport {
    /// Create a wired `(FakeTransport, FakeTransportHandle)` pair.
    pub fn new() -> (Self, FakeTransportHandle) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<String>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<String>();

        let transport = Self {
            outbound_tx,
            inbound_rx: Arc::new(Mutex::new(inbound_rx)),
            inbound_inject_tx: inbound_tx.clone(),
        };
        let handle = FakeTransportHandle {
            outbound_rx,
            inbound_tx,
        };
        (transport, handle)
    }

    /// Serialize `message` and push it onto the inbound channel, as if the
    /// server had sent it.
    ///
    /// # Panics
    ///
    /// Panics if the inbound channel is closed; in a test that is a wiring
    /// bug worth failing loudly on.
    pub fn inject_message(&self, message: serde_json::Value) {
        let serialized =
            serde_json::to_string(&message).expect("FakeTransport: message failed to serialize");
        self.inbound_inject_tx
            .send(serialized)
            .expect("FakeTransport: inbound channel closed");
    }
}

#[async_trait::async_trait]
impl Transport for FakeTransport {
    async fn send(&self, message: String) -> Result<()> {
        self.outbound_tx.send(message).map_err(|_| {
            anyhow::anyhow!(McprobeError::Transport(
                "FakeTransport outbound channel closed".to_string()
            ))
        })
    }

    fn receive(&self) -> Pin<Box<dyn Stream<Item = String> + Send + '_>> {
        let rx = Arc::clone(&self.inbound_rx);
        Box::pin(futures::stream::unfold(rx, |rx| async move {
            let mut guard = rx.lock().await;
            let item = guard.recv().await?;
            drop(guard);
            Some((item, rx))
        }))
    }

    /// Always empty; the fake has no diagnostic channel.
    fn receive_err(&self) -> Pin<Box<dyn Stream<Item = String> + Send + '_>> {
        Box::pin(futures::stream::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use futures::StreamExt;

    #[tokio::test]
    async fn test_send_delivers_to_handle_in_order() {
        let (transport, mut handle) = FakeTransport::new();

        for i in 0u32..3 {
            transport.send(format!("msg-{i}")).await.unwrap();
        }
        for i in 0u32..3 {
            assert_eq!(handle.outbound_rx.recv().await.unwrap(), format!("msg-{i}"));
        }
    }

    #[tokio::test]
    async fn test_handle_and_inject_share_inbound_channel() {
        let (transport, handle) = FakeTransport::new();

        handle
            .inbound_tx
            .send(r#"{"via":"handle"}"#.to_string())
            .unwrap();
        transport.inject_message(serde_json::json!({"via": "inject"}));

        let mut stream = transport.receive();
        let first: serde_json::Value =
            serde_json::from_str(&stream.next().await.unwrap()).unwrap();
        let second: serde_json::Value =
            serde_json::from_str(&stream.next().await.unwrap()).unwrap();
        assert_eq!(first["via"], "handle");
        assert_eq!(second["via"], "inject");
    }

    #[tokio::test]
    async fn test_send_fails_after_handle_dropped() {
        let (transport, handle) = FakeTransport::new();
        drop(handle);
        assert!(transport.send("x".to_string()).await.is_err());
    }

    #[tokio::test]
    async fn test_receive_err_yields_nothing() {
        let (transport, _handle) = FakeTransport::new();
        let mut err_stream = transport.receive_err();
        match tokio::time::timeout(Duration::from_millis(50), err_stream.next()).await {
            Ok(None) | Err(_) => {}
            Ok(Some(msg)) => panic!("unexpected diagnostic: {msg:?}"),
        }
    }

    #[test]
    fn test_is_object_safe() {
        let (transport, _handle) = FakeTransport::new();
        let _boxed: Box<dyn Transport> = Box::new(transport);
    }
}
