use async_trait::async_trait;
use futures_core::Stream;
use futures_util::StreamExt;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use tokio_util::bytes::Bytes;

use crate::api::{ApiError, Client, RunSubmission};

pub const DEFAULT_REPLAY_CHUNK_SIZE: usize = 64;

/// Raw fragments of one run's output, in arrival order.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to start run: {0}")]
    Request(#[from] ApiError),
    #[error("Run stream interrupted: {details}")]
    Interrupted { details: String },
    #[error("Run stream closed before any data arrived")]
    NoStream,
    #[error("Failed to read replay: {0}")]
    Io(#[from] std::io::Error),
}

/// Something that can open the fragment stream of one run.
#[async_trait]
pub trait FrameSource: Send + Sync {
    async fn open(&self) -> Result<FrameStream, TransportError>;
}

/// Submits a run to the remote runner and streams the response body.
#[derive(Clone)]
pub struct HttpFrameSource {
    client: Client,
    submission: RunSubmission,
}

impl HttpFrameSource {
    pub fn new(client: Client, submission: RunSubmission) -> Self {
        Self { client, submission }
    }
}

#[async_trait]
impl FrameSource for HttpFrameSource {
    async fn open(&self) -> Result<FrameStream, TransportError> {
        let response = self.client.submit(&self.submission).await?;
        let frames = response.bytes_stream().map(|chunk| {
            chunk.map_err(|e| TransportError::Interrupted {
                details: e.to_string(),
            })
        });
        Ok(Box::pin(frames))
    }
}

#[derive(Debug, Clone)]
enum ReplayOrigin {
    Frames(Vec<Bytes>),
    File { path: PathBuf, chunk_size: usize },
}

/// Replays previously captured output, either from memory or from a file
/// cut into fixed-size fragments.
#[derive(Debug, Clone)]
pub struct ReplayFrameSource {
    origin: ReplayOrigin,
    pace: Option<Duration>,
}

impl ReplayFrameSource {
    pub fn from_frames<I, B>(frames: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self {
            origin: ReplayOrigin::Frames(frames.into_iter().map(Into::into).collect()),
            pace: None,
        }
    }

    pub fn from_file(path: impl Into<PathBuf>, chunk_size: usize) -> Self {
        Self {
            origin: ReplayOrigin::File {
                path: path.into(),
                chunk_size,
            },
            pace: None,
        }
    }

    /// Delay before each fragment, to mimic live arrival.
    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = Some(pace);
        self
    }
}

#[async_trait]
impl FrameSource for ReplayFrameSource {
    async fn open(&self) -> Result<FrameStream, TransportError> {
        let frames = match &self.origin {
            ReplayOrigin::Frames(frames) => frames.clone(),
            ReplayOrigin::File { path, chunk_size } => {
                let data = tokio::fs::read(path).await?;
                tracing::debug!(
                    target: "runwatch::source",
                    path = %path.display(),
                    bytes = data.len(),
                    "loaded replay"
                );
                split_frames(Bytes::from(data), *chunk_size)
            }
        };
        let pace = self.pace;

        Ok(Box::pin(async_stream::stream! {
            for frame in frames {
                if let Some(delay) = pace {
                    tokio::time::sleep(delay).await;
                }
                yield Ok::<_, TransportError>(frame);
            }
        }))
    }
}

fn split_frames(mut data: Bytes, chunk_size: usize) -> Vec<Bytes> {
    let chunk_size = chunk_size.max(1);
    let mut frames = Vec::with_capacity(data.len().div_ceil(chunk_size));
    while !data.is_empty() {
        let take = chunk_size.min(data.len());
        frames.push(data.split_to(take));
    }
    frames
}
