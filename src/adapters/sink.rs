use crate::domain::ports::ResponseSink;
use crate::utils::error::{Result, SeismoError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::mpsc;

/// What the transport receives from a streaming request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Headers collected so far; sent once, right before the first body bytes.
    Headers(BTreeMap<String, String>),
    Chunk(Vec<u8>),
    Flush,
    /// The body is truncated; the connection must be closed without a
    /// terminating chunk.
    Abort(String),
}

/// Forwards the response to a transport task through a bounded channel.
/// Headers are buffered until the first flush so that late headers such
/// as `mu` still go out with the response head.
pub struct ChannelSink {
    tx: mpsc::Sender<Frame>,
    headers: BTreeMap<String, String>,
    pending: Vec<Vec<u8>>,
    headers_sent: bool,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<Frame>) -> Self {
        Self {
            tx,
            headers: BTreeMap::new(),
            pending: Vec::new(),
            headers_sent: false,
        }
    }

    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    pub fn headers_sent(&self) -> bool {
        self.headers_sent
    }

    async fn send(&self, frame: Frame) -> Result<()> {
        self.tx.send(frame).await.map_err(|_| {
            SeismoError::IoError(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "response receiver dropped",
            ))
        })
    }
}

#[async_trait]
impl ResponseSink for ChannelSink {
    fn set_header(&mut self, name: &str, value: String) {
        if self.headers_sent {
            tracing::warn!("Header '{}' set after the response head was sent", name);
            return;
        }
        self.headers.insert(name.to_string(), value);
    }

    async fn write(&mut self, chunk: Vec<u8>) -> Result<()> {
        if self.headers_sent {
            self.send(Frame::Chunk(chunk)).await
        } else {
            self.pending.push(chunk);
            Ok(())
        }
    }

    async fn flush(&mut self) -> Result<()> {
        if !self.headers_sent {
            self.headers_sent = true;
            self.send(Frame::Headers(self.headers.clone())).await?;
            for chunk in std::mem::take(&mut self.pending) {
                self.send(Frame::Chunk(chunk)).await?;
            }
        }
        self.send(Frame::Flush).await
    }

    async fn abort(&mut self, reason: &str) {
        if self.send(Frame::Abort(reason.to_string())).await.is_err() {
            tracing::debug!("Response receiver already gone; abort not delivered");
        }
    }
}
