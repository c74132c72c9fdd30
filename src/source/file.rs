use crate::source::{LineSource, LogLine, SourceError};
use async_trait::async_trait;
use std::fs::{File, Metadata};
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::PathBuf;
use tokio::time::{sleep, Duration};

const FOLLOW_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Where reading starts when the file is first opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStart {
    Beginning,
    End,
}

/// Tail-like reader for a log file.
///
/// In follow mode the reader polls for growth at EOF, reopens the file from the
/// beginning when it is rotated (inode change), and holds back a trailing line
/// until its newline arrives. Without follow the last line is emitted even if
/// it is unterminated.
pub struct FileSource {
    name: String,
    path: PathBuf,
    start: ReadStart,
    follow: bool,

    file: Option<BufReader<File>>,
    file_inode: Option<u64>,
    partial: Vec<u8>,
}

impl FileSource {
    pub fn new(path: PathBuf, start: ReadStart, follow: bool) -> Self {
        Self {
            name: path.display().to_string(),
            path,
            start,
            follow,
            file: None,
            file_inode: None,
            partial: Vec::new(),
        }
    }

    /// Read a whole file once, from the beginning
    pub fn read_once(path: PathBuf) -> Self {
        Self::new(path, ReadStart::Beginning, false)
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Open the file and seek to the configured start position
    pub fn open(&mut self) -> Result<(), SourceError> {
        let file = File::open(&self.path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SourceError::NotFound(self.path.clone()),
            _ => SourceError::Io(e),
        })?;
        let metadata = file.metadata()?;
        self.file_inode = Some(get_inode(&metadata));

        let mut reader = BufReader::new(file);
        if self.start == ReadStart::End {
            reader.seek(SeekFrom::End(0))?;
        }

        self.file = Some(reader);
        Ok(())
    }

    fn take_line(&mut self) -> LogLine {
        let bytes = std::mem::take(&mut self.partial);
        let text = String::from_utf8_lossy(&bytes);
        let content = text.trim_end_matches(&['\n', '\r'][..]);
        LogLine::now(content, self.name.clone())
    }

    /// Check if the file has been rotated (inode changed)
    fn check_file_rotation(&self) -> Result<bool, SourceError> {
        let Some(original_inode) = self.file_inode else {
            return Ok(false);
        };

        match std::fs::metadata(&self.path) {
            Ok(metadata) => Ok(get_inode(&metadata) != original_inode),
            // Mid-rotation: the new file doesn't exist yet
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl LineSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn next_line(&mut self) -> Result<Option<LogLine>, SourceError> {
        loop {
            let Some(file) = self.file.as_mut() else {
                self.open()?;
                continue;
            };

            let bytes_read = file.read_until(b'\n', &mut self.partial)?;

            if bytes_read > 0 {
                if self.partial.ends_with(b"\n") {
                    return Ok(Some(self.take_line()));
                }
                // Unterminated: a writer may be mid-line, or this is the last line
                continue;
            }

            if !self.follow {
                if self.partial.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(self.take_line()));
            }

            if self.check_file_rotation()? {
                tracing::info!(path = %self.path.display(), "Log file rotated, reopening");
                self.file = None;
                self.start = ReadStart::Beginning;
                if !self.partial.is_empty() {
                    return Ok(Some(self.take_line()));
                }
                continue;
            }

            sleep(FOLLOW_POLL_INTERVAL).await;
        }
    }

    async fn close(&mut self) {
        self.file = None;
    }
}

#[cfg(unix)]
fn get_inode(metadata: &Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    metadata.ino()
}

#[cfg(not(unix))]
fn get_inode(metadata: &Metadata) -> u64 {
    // No inode outside unix; size + mtime is a rough stand-in
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    metadata.len().hash(&mut hasher);
    if let Ok(modified) = metadata.modified() {
        modified.hash(&mut hasher);
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    async fn collect(source: &mut FileSource) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(line) = source.next_line().await.unwrap() {
            lines.push(line.content);
        }
        lines
    }

    #[tokio::test]
    async fn test_reads_from_beginning() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "first line").unwrap();
        writeln!(temp_file, "second line\r").unwrap();
        temp_file.flush().unwrap();

        let mut source = FileSource::read_once(temp_file.path().to_path_buf());
        let lines = collect(&mut source).await;

        assert_eq!(lines, vec!["first line", "second line"]);
    }

    #[tokio::test]
    async fn test_line_source_name_is_path() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut source = FileSource::read_once(temp_file.path().to_path_buf());

        assert_eq!(source.name(), temp_file.path().display().to_string());
        assert!(source.next_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unterminated_last_line_emitted_without_follow() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "complete\npartial").unwrap();
        temp_file.flush().unwrap();

        let mut source = FileSource::read_once(temp_file.path().to_path_buf());
        let lines = collect(&mut source).await;

        assert_eq!(lines, vec!["complete", "partial"]);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_replaced() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"bad \xff byte\n").unwrap();
        temp_file.flush().unwrap();

        let mut source = FileSource::read_once(temp_file.path().to_path_buf());
        let lines = collect(&mut source).await;

        assert_eq!(lines, vec!["bad \u{fffd} byte"]);
    }

    #[tokio::test]
    async fn test_start_at_end_skips_existing() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "old line").unwrap();
        temp_file.flush().unwrap();

        let mut source = FileSource::new(temp_file.path().to_path_buf(), ReadStart::End, false);
        source.open().unwrap();

        assert!(source.next_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_follow_picks_up_appended_lines() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "old line").unwrap();
        temp_file.flush().unwrap();

        let mut source = FileSource::new(temp_file.path().to_path_buf(), ReadStart::End, true);
        source.open().unwrap();

        write!(temp_file, "new ").unwrap();
        temp_file.flush().unwrap();

        let reader = tokio::spawn(async move { source.next_line().await });

        tokio::time::sleep(Duration::from_millis(250)).await;
        writeln!(temp_file, "line").unwrap();
        temp_file.flush().unwrap();

        let line = tokio::time::timeout(Duration::from_secs(5), reader)
            .await
            .unwrap()
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(line.content, "new line");
    }

    #[test]
    fn test_open_missing_file() {
        let mut source = FileSource::read_once(PathBuf::from("/nonexistent/hawkeye.log"));
        assert!(matches!(source.open(), Err(SourceError::NotFound(_))));
    }
}
