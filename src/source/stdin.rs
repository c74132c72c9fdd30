use crate::source::{LineSource, LogLine, SourceError};
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};

/// Line source over any async byte stream; piped stdin in production.
///
/// Bytes read by an interrupted `next_line` stay in the internal buffer, so the
/// future can be dropped by `select!` without losing data.
pub struct StreamSource<R> {
    name: String,
    reader: R,
    partial: Vec<u8>,
    eof: bool,
}

pub type StdinSource = StreamSource<BufReader<Stdin>>;

impl StreamSource<BufReader<Stdin>> {
    pub fn stdin() -> Self {
        Self::new("stdin", BufReader::new(tokio::io::stdin()))
    }
}

impl<R> StreamSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(name: impl Into<String>, reader: R) -> Self {
        Self {
            name: name.into(),
            reader,
            partial: Vec::new(),
            eof: false,
        }
    }
}

#[async_trait]
impl<R> LineSource for StreamSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn next_line(&mut self) -> Result<Option<LogLine>, SourceError> {
        if self.eof {
            return Ok(None);
        }

        let bytes_read = self.reader.read_until(b'\n', &mut self.partial).await?;
        if bytes_read == 0 {
            self.eof = true;
            if self.partial.is_empty() {
                return Ok(None);
            }
        }

        let bytes = std::mem::take(&mut self.partial);
        let text = String::from_utf8_lossy(&bytes);
        let content = text.trim_end_matches(&['\n', '\r'][..]);
        Ok(Some(LogLine::now(content, self.name.clone())))
    }
}
