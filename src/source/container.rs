use crate::source::timestamp::stamp_container_line;
use crate::source::{LineSource, LogLine, SourceError};
use async_trait::async_trait;
use chrono::Utc;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type LineResult = Result<String, std::io::Error>;

/// Follows `docker logs` for one container.
///
/// One producer task per output stream decodes lines and pushes them into a
/// bounded channel. A full channel blocks the producers, which in turn stops
/// reading from the `docker` pipe. A final fragment without a trailing newline
/// is delivered as a line when the stream ends.
pub struct ContainerSource {
    name: String,
    child: Option<Child>,
    lines: mpsc::Receiver<LineResult>,
    producers: Vec<JoinHandle<()>>,
}

impl ContainerSource {
    /// Verify the container exists and start following its logs
    pub async fn spawn(container: &str, tail: usize, channel_capacity: usize) -> Result<Self, SourceError> {
        check_container(container).await?;

        let tail_arg = tail.to_string();
        let mut child = Command::new("docker")
            .args(["logs", "--follow", "--timestamps", "--tail", &tail_arg, container])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SourceError::Spawn {
                command: "docker logs".to_string(),
                source,
            })?;

        let (tx, rx) = mpsc::channel(channel_capacity);
        let mut producers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            producers.push(tokio::spawn(forward_lines(stdout, tx.clone())));
        }
        // The container's own stderr arrives on docker's stderr
        if let Some(stderr) = child.stderr.take() {
            producers.push(tokio::spawn(forward_lines(stderr, tx)));
        }

        info!(container = %container, tail = tail, "Following container logs");

        Ok(Self {
            name: format!("docker:{}", container),
            child: Some(child),
            lines: rx,
            producers,
        })
    }

    #[cfg(test)]
    fn from_receiver(name: &str, lines: mpsc::Receiver<LineResult>) -> Self {
        Self {
            name: name.to_string(),
            child: None,
            lines,
            producers: Vec::new(),
        }
    }
}

#[async_trait]
impl LineSource for ContainerSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn next_line(&mut self) -> Result<Option<LogLine>, SourceError> {
        match self.lines.recv().await {
            Some(Ok(raw)) => {
                let (timestamp, content) = stamp_container_line(&raw, Utc::now());
                Ok(Some(LogLine::new(content, timestamp, self.name.clone())))
            }
            Some(Err(e)) => Err(SourceError::Io(e)),
            None => {
                let Some(child) = self.child.as_mut() else {
                    return Ok(None);
                };
                let status = child.wait().await?;
                if status.success() {
                    debug!(source = %self.name, "Container log stream ended");
                    Ok(None)
                } else {
                    Err(SourceError::StreamEnded {
                        name: self.name.clone(),
                        reason: format!("docker logs exited with {}", status),
                    })
                }
            }
        }
    }

    async fn close(&mut self) {
        self.lines.close();
        if let Some(child) = self.child.as_mut() {
            if let Err(e) = child.start_kill() {
                warn!(source = %self.name, error = %e, "Failed to stop docker logs");
            }
        }
        for producer in self.producers.drain(..) {
            producer.abort();
        }
    }
}

async fn check_container(container: &str) -> Result<(), SourceError> {
    let output = Command::new("docker")
        .args(["inspect", "--type", "container", "--format", "{{.State.Status}}", container])
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|source| SourceError::Spawn {
            command: "docker inspect".to_string(),
            source,
        })?;

    if output.status.success() {
        debug!(
            container = %container,
            state = %String::from_utf8_lossy(&output.stdout).trim(),
            "Container found"
        );
        Ok(())
    } else {
        Err(SourceError::ContainerUnavailable {
            container: container.to_string(),
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// Decode lines from one pipe into the channel until EOF or the receiver goes away
async fn forward_lines<R>(reader: R, tx: mpsc::Sender<LineResult>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    loop {
        let mut buf = Vec::new();
        let sent = match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&buf);
                let line = text.trim_end_matches(&['\n', '\r'][..]).to_string();
                tx.send(Ok(line)).await
            }
            Err(e) => {
                let _ = tx.send(Err(e)).await;
                break;
            }
        };
        if sent.is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_forwarded_lines_are_stamped() {
        let (tx, rx) = mpsc::channel(8);
        let input: &[u8] = b"2024-01-05T10:30:00Z ERROR boom\nno timestamp here\ntrailing fragment";
        forward_lines(input, tx).await;

        let mut source = ContainerSource::from_receiver("docker:api", rx);

        let first = source.next_line().await.unwrap().unwrap();
        assert_eq!(first.content, "ERROR boom");
        assert_eq!(first.timestamp.to_rfc3339(), "2024-01-05T10:30:00+00:00");
        assert_eq!(first.source, "docker:api");

        let second = source.next_line().await.unwrap().unwrap();
        assert_eq!(second.content, "no timestamp here");

        let third = source.next_line().await.unwrap().unwrap();
        assert_eq!(third.content, "trailing fragment");

        assert!(source.next_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_producer_blocks_when_channel_full() {
        let (tx, mut rx) = mpsc::channel(1);
        let input: &'static [u8] = b"a\nb\nc\n";
        let producer = tokio::spawn(forward_lines(input, tx));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!producer.is_finished());

        let mut received = Vec::new();
        while let Some(line) = rx.recv().await {
            received.push(line.unwrap());
        }
        assert_eq!(received, vec!["a", "b", "c"]);
        producer.await.unwrap();
    }

    #[tokio::test]
    async fn test_read_error_propagates() {
        let (tx, rx) = mpsc::channel(1);
        tx.send(Err(std::io::Error::other("pipe broke"))).await.unwrap();
        drop(tx);

        let mut source = ContainerSource::from_receiver("docker:api", rx);
        assert!(matches!(source.next_line().await, Err(SourceError::Io(_))));
    }
}
