//! Terminal line input.

use std::io::{self, BufRead};

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

/// A source of newline-terminated lines.
#[async_trait]
pub trait LineSource: Send {
    /// The next line, including its trailing newline if present.
    /// Returns `None` at end of input.
    async fn next_line(&mut self) -> io::Result<Option<Vec<u8>>>;
}

/// Lines from any async buffered reader (pipes, files, test streams).
pub struct ReaderLines<R> {
    reader: R,
}

impl<R> ReaderLines<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl<R> LineSource for ReaderLines<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn next_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut line = Vec::new();
        let read = self.reader.read_until(b'\n', &mut line).await?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }
}

/// Lines typed on the process's standard input.
///
/// Reads happen on a dedicated OS thread so that a task waiting for the
/// next line can be cancelled, and a pending read never holds up exit.
pub struct StdinLines {
    rx: mpsc::Receiver<io::Result<Vec<u8>>>,
}

impl StdinLines {
    pub fn spawn() -> io::Result<Self> {
        let (tx, rx) = mpsc::channel(1);

        std::thread::Builder::new()
            .name("stdin-reader".to_string())
            .spawn(move || {
                let stdin = io::stdin();
                let mut stdin = stdin.lock();
                loop {
                    let mut line = Vec::new();
                    let item = match stdin.read_until(b'\n', &mut line) {
                        Ok(0) => break,
                        Ok(_) => Ok(line),
                        Err(e) => Err(e),
                    };
                    let failed = item.is_err();
                    if tx.blocking_send(item).is_err() || failed {
                        break;
                    }
                }
                tracing::debug!("stdin reader finished");
            })?;

        Ok(Self { rx })
    }
}

#[async_trait]
impl LineSource for StdinLines {
    async fn next_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        self.rx.recv().await.transpose()
    }
}
