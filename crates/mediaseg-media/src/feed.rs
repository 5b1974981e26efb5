//! Bounded hand-off of decoded frames into the async pipeline.
//!
//! Decoders run on their own threads and block when the feed is full, so a
//! slow segmentation stage throttles decoding instead of buffering without
//! limit.

use crate::decoder::SyntheticDecoder;
use futures::Stream;
use mediaseg_core::SourcedFrame;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::thread::JoinHandle;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// The receiving side of the feed is gone.
#[derive(Debug, Error)]
#[error("frame feed closed")]
pub struct FeedClosed;

/// Producer half of a frame feed. Cheap to clone; one clone per decoder.
#[derive(Clone)]
pub struct FeedSender {
    tx: mpsc::Sender<SourcedFrame>,
}

impl FeedSender {
    /// Send from async code, waiting for capacity.
    pub async fn send(&self, frame: SourcedFrame) -> Result<(), FeedClosed> {
        self.tx.send(frame).await.map_err(|_| FeedClosed)
    }

    /// Send from a decoder thread, blocking until there is capacity.
    ///
    /// Must not be called from within an async runtime worker.
    pub fn blocking_send(&self, frame: SourcedFrame) -> Result<(), FeedClosed> {
        self.tx.blocking_send(frame).map_err(|_| FeedClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half of a frame feed. Ends once every sender is dropped.
pub struct FrameStream {
    rx: mpsc::Receiver<SourcedFrame>,
}

impl Stream for FrameStream {
    type Item = SourcedFrame;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

/// Create a feed holding at most `capacity` frames in flight.
pub fn frame_feed(capacity: usize) -> (FeedSender, FrameStream) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (FeedSender { tx }, FrameStream { rx })
}

/// Run `decoder` on a dedicated thread, pushing every frame into `sender`.
///
/// The thread stops early when the feed closes. Joining yields the number of
/// frames delivered.
pub fn spawn_decoder(
    mut decoder: SyntheticDecoder,
    sender: FeedSender,
) -> std::io::Result<JoinHandle<usize>> {
    let name = decoder.source().name.clone();
    std::thread::Builder::new()
        .name(format!("decode-{}", name))
        .spawn(move || {
            let mut delivered = 0usize;
            while let Some(frame) = decoder.decode_frame() {
                if sender.blocking_send(frame).is_err() {
                    debug!(source = %name, delivered, "Feed closed, stopping decoder");
                    return delivered;
                }
                delivered += 1;
            }
            info!(source = %name, delivered, "Decoder finished");
            delivered
        })
}
