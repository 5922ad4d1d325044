// Human-readable game log.
//
// `GameLog` is the append-only text record of one game: boxed section
// headings, `--` labelled lines, and `----` card listings, in the order the
// orchestrator and the turn-holding worker write them. Nothing reads it back;
// it exists for people reviewing a game. Operational diagnostics go through
// `tracing` instead.
//
// The sink is shared by every worker thread, so writes go through a mutex.
// Only the worker holding the turn writes during play, which keeps each
// turn's block of lines contiguous. A failed write is reported once through
// `tracing` and further failures are dropped silently.

use std::fmt::Display;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use card_exchange_protocol::Card;
use tracing::warn;

pub struct GameLog {
    sink: Mutex<Box<dyn Write + Send>>,
    write_failed: AtomicBool,
}

impl GameLog {
    /// Log to a newly created (truncated) file.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self::to_writer(BufWriter::new(file)))
    }

    pub fn to_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            sink: Mutex::new(Box::new(writer)),
            write_failed: AtomicBool::new(false),
        }
    }

    /// Discard everything.
    pub fn disabled() -> Self {
        Self::to_writer(io::sink())
    }

    /// Log into memory; the returned buffer can be inspected later.
    pub fn in_memory() -> (Self, LogBuffer) {
        let buffer = LogBuffer::default();
        (Self::to_writer(buffer.clone()), buffer)
    }

    pub fn line(&self, text: impl Display) {
        self.write_lines(&[text.to_string()]);
    }

    pub fn blank(&self) {
        self.line("");
    }

    /// A boxed heading:
    ///
    /// ```text
    /// +-----------------+
    /// | GAME PARAMETERS |
    /// +-----------------+
    /// ```
    pub fn heading(&self, text: impl Display) {
        let text = text.to_string();
        let border = format!("+{}+", "-".repeat(text.chars().count() + 2));
        self.write_lines(&[border.clone(), format!("| {text} |"), border]);
    }

    /// One `----<card>` line per card, then a blank line.
    pub fn cards<'a>(&self, cards: impl IntoIterator<Item = &'a Card>) {
        let mut lines: Vec<String> = cards.into_iter().map(|c| format!("----{c}")).collect();
        lines.push(String::new());
        self.write_lines(&lines);
    }

    pub fn flush(&self) {
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = sink.flush() {
            self.report_failure(&e);
        }
    }

    fn write_lines(&self, lines: &[String]) {
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        for line in lines {
            if let Err(e) = writeln!(sink, "{line}") {
                self.report_failure(&e);
                return;
            }
        }
    }

    fn report_failure(&self, error: &io::Error) {
        if !self.write_failed.swap(true, Ordering::Relaxed) {
            warn!(%error, "game log write failed; further log failures are ignored");
        }
    }
}

impl Drop for GameLog {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Shared in-memory log target.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use card_exchange_protocol::{Rank, Suit};

    use super::*;

    #[test]
    fn heading_is_boxed() {
        let (log, buffer) = GameLog::in_memory();
        log.heading("ORDER OF TURNS");
        assert_eq!(
            buffer.contents(),
            "+----------------+\n| ORDER OF TURNS |\n+----------------+\n"
        );
    }

    #[test]
    fn cards_are_listed_then_blank_line() {
        let (log, buffer) = GameLog::in_memory();
        let cards = [
            Card::new(Suit::Hearts, Rank::Ten),
            Card::new(Suit::Clubs, Rank::Ace),
        ];
        log.cards(&cards);
        assert_eq!(buffer.contents(), "----Ten of Hearts\n----Ace of Clubs\n\n");
    }

    #[test]
    fn lines_append_in_order() {
        let (log, buffer) = GameLog::in_memory();
        log.line("--Number of decks: 2");
        log.blank();
        log.line(format_args!("--Number of players: {}", 3));
        assert_eq!(
            buffer.contents(),
            "--Number of decks: 2\n\n--Number of players: 3\n"
        );
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_failures_do_not_panic() {
        let log = GameLog::to_writer(FailingWriter);
        log.heading("FINAL HANDS");
        log.line("still fine");
        assert!(log.write_failed.load(Ordering::Relaxed));
    }
}
