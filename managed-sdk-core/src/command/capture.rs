//! Concurrent draining of a byte stream into text.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::AbortHandle;
use tracing::warn;

use super::error::CaptureError;
use crate::progress::MessageListener;

/// Handle to a stream being drained on its own task.
///
/// The drain starts as soon as the capture is created, whether or not anyone
/// awaits it. [`StreamCapture::result`] can be awaited repeatedly and always
/// yields the same outcome.
#[derive(Clone)]
pub struct StreamCapture {
    result: Shared<BoxFuture<'static, Result<String, CaptureError>>>,
    abort: AbortHandle,
}

impl StreamCapture {
    /// Starts draining `reader` on a new tokio task.
    pub fn spawn<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self::spawn_with_listener(reader, None)
    }

    /// Starts draining `reader`, forwarding each complete line to `listener`.
    pub fn spawn_with_listener<R>(reader: R, listener: Option<Arc<dyn MessageListener>>) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let handle = tokio::spawn(drain(reader, listener));
        let abort = handle.abort_handle();

        let result = async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => Err(CaptureError::Interrupted(e.to_string())),
            }
        }
        .boxed()
        .shared();

        Self { result, abort }
    }

    /// Waits for the stream to reach end of input.
    pub async fn result(&self) -> Result<String, CaptureError> {
        self.result.clone().await
    }

    /// Collected text, or `placeholder` when collection was interrupted or failed.
    pub async fn text_or(&self, placeholder: &str) -> String {
        match self.result().await {
            Ok(text) => text,
            Err(e) => {
                warn!("{}: {}", placeholder, e);
                placeholder.to_string()
            }
        }
    }

    /// Cancels the drain task. Pending and future `result` calls report
    /// [`CaptureError::Interrupted`] unless the drain already finished.
    pub fn abort(&self) {
        self.abort.abort();
    }
}

async fn drain<R>(
    reader: R,
    listener: Option<Arc<dyn MessageListener>>,
) -> Result<String, CaptureError>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut collected = Vec::new();
    let mut line = Vec::new();

    loop {
        line.clear();
        let read = reader
            .read_until(b'\n', &mut line)
            .await
            .map_err(|e| CaptureError::Io(Arc::new(e)))?;
        if read == 0 {
            break;
        }
        if let Some(listener) = &listener {
            let text = String::from_utf8_lossy(&line);
            listener.message(text.trim_end_matches(['\n', '\r']));
        }
        collected.extend_from_slice(&line);
    }

    Ok(String::from_utf8_lossy(&collected).into_owned())
}
