//! Incremental output capture.

use std::{future::Future, time::Duration};

use bytes::Bytes;
use futures::{StreamExt, stream::BoxStream};
use mqexec_core::{Execution, ExecutionError, ExitReport};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Lazy stream of output chunks read from `reader`.
///
/// Each item holds exactly the bytes returned by one read, at most
/// `chunk_size` of them. The stream ends at EOF or after the first read
/// error and cannot be restarted.
pub fn output_chunks<R>(reader: R, chunk_size: usize) -> BoxStream<'static, std::io::Result<Bytes>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let buf = vec![0u8; chunk_size.max(1)];
    futures::stream::unfold(Some((reader, buf)), |state| async move {
        let (mut reader, mut buf) = state?;
        match reader.read(&mut buf).await {
            Ok(0) => None,
            Ok(n) => {
                let chunk = Bytes::copy_from_slice(&buf[..n]);
                Some((Ok(chunk), Some((reader, buf))))
            }
            Err(e) => Some((Err(e), None)),
        }
    })
    .boxed()
}

/// Forward every chunk of `execution` to `publish`, then reap the process.
///
/// Chunks are handed over one at a time, in order, as soon as they are
/// read. `timeout` bounds the whole run, including the wait after the
/// output closes: a command that closes stdout and keeps running is still
/// killed. On expiry the process group is killed and a single notice chunk
/// is published after it has been reaped.
///
/// # Errors
/// Returns [`ExecutionError`] if the process cannot be killed or waited on.
pub async fn stream_output<F, Fut>(
    execution: &mut dyn Execution,
    timeout: Option<Duration>,
    mut publish: F,
) -> Result<ExitReport, ExecutionError>
where
    F: FnMut(Bytes) -> Fut + Send,
    Fut: Future<Output = ()> + Send,
{
    let mut chunks = 0usize;
    let mut bytes = 0usize;

    let run = async {
        while let Some(next) = execution.next_chunk().await {
            match next {
                Ok(chunk) => {
                    chunks += 1;
                    bytes += chunk.len();
                    publish(chunk).await;
                }
                Err(e) => {
                    tracing::warn!("Failed to read command output: {e}");
                    break;
                }
            }
        }
        execution.wait().await
    };

    let (status, timed_out) = match timeout {
        Some(limit) => {
            let finished = tokio::time::timeout(limit, run).await;
            if let Ok(status) = finished {
                (status, false)
            } else {
                tracing::debug!(?limit, "Command deadline reached, killing process group");
                execution.start_kill().map_err(ExecutionError::Kill)?;
                (execution.wait().await, true)
            }
        }
        None => (run.await, false),
    };
    let status = status.map_err(ExecutionError::Wait)?;

    if let Some(limit) = timeout.filter(|_| timed_out) {
        publish(timeout_notice(limit)).await;
    }

    Ok(ExitReport {
        code: status.code(),
        success: status.success(),
        timed_out,
        chunks,
        bytes,
    })
}

fn timeout_notice(limit: Duration) -> Bytes {
    Bytes::from(format!("mqexec: command timed out after {}s\n", limit.as_secs()))
}
