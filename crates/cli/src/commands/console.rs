//! Terminal input for interactive chat.
//!
//! Reads stdin on a background task and hands over one classified line at
//! a time.

use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// What the user asked for with one line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Query(String),
    ClearContext,
    Quit,
}

impl Input {
    /// Classify a raw line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
            return Some(Self::Quit);
        }

        if line.eq_ignore_ascii_case("clear context") {
            return Some(Self::ClearContext);
        }

        Some(Self::Query(line.to_string()))
    }
}

/// Start reading stdin. The receiver closes at EOF (Ctrl+D) or after the
/// user quits.
pub fn start() -> mpsc::Receiver<io::Result<Input>> {
    let (tx, rx) = mpsc::channel(32);

    tokio::spawn(async move {
        let mut lines = BufReader::new(io::stdin()).lines();

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let Some(input) = Input::parse(&line) else {
                        continue;
                    };
                    let quit = input == Input::Quit;
                    if tx.send(Ok(input)).await.is_err() || quit {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    let _ = tx.send(Err(e)).await;
                    break;
                }
            }
        }
    });

    rx
}
