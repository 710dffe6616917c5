//! Pull-based row stream
//!
//! Rows are produced only as fast as the consumer polls. The stream
//! surfaces at most one error and ends right after it; dropping the stream
//! early drops the underlying row channel and with it the connection.

use crate::errors::QueryError;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use serde_json::Value;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::debug;

pub struct RowStream {
    inner: BoxStream<'static, Result<Value, QueryError>>,
    delivered: u64,
    finished: bool,
}

impl RowStream {
    pub(crate) fn new(inner: BoxStream<'static, Result<Value, QueryError>>) -> Self {
        Self {
            inner,
            delivered: 0,
            finished: false,
        }
    }

    /// Rows handed to the consumer so far
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn release(&mut self) {
        self.finished = true;
        self.inner = stream::empty().boxed();
    }
}

impl Stream for RowStream {
    type Item = Result<Value, QueryError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        match this.inner.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(row))) => {
                this.delivered += 1;
                Poll::Ready(Some(Ok(row)))
            }
            Poll::Ready(Some(Err(err))) => {
                this.release();
                Poll::Ready(Some(Err(err)))
            }
            Poll::Ready(None) => {
                this.release();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for RowStream {
    fn drop(&mut self) {
        if !self.finished {
            debug!(delivered = self.delivered, "row stream dropped before completion");
        }
    }
}

/// First-failure-wins settlement of a stream into an ordered list.
/// `sink` may reject a row on its own; whichever side fails first is the
/// error reported, and the stream is dropped without pulling further rows.
pub(crate) async fn drain<T, F>(mut rows: RowStream, mut sink: F) -> Result<Vec<T>, QueryError>
where
    F: FnMut(Value) -> Result<T, QueryError>,
{
    let mut settled = Vec::new();
    while let Some(row) = rows.next().await {
        settled.push(row.and_then(&mut sink)?);
    }
    Ok(settled)
}
