//! Clipboard export capability.
//!
//! Two transports, tried in order by the console's `copy_logs`:
//! 1. Primary - the system clipboard via `arboard`, run on a blocking task
//!    so the caller suspends until the platform write resolves.
//! 2. Fallback - an OSC 52 escape sequence written to stdout, which the
//!    terminal intercepts and copies (works over SSH).

use std::io::Write;

/// Primary-plus-fallback clipboard writes.
pub trait ClipboardService {
    /// Writes via the primary mechanism; suspends until it resolves.
    fn write_primary(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<(), ClipboardError>> + Send;

    /// Writes via the fallback mechanism.
    fn write_fallback(&self, text: &str) -> Result<(), ClipboardError>;
}

/// Clipboard operation errors.
#[derive(Debug)]
pub enum ClipboardError {
    /// System clipboard operation failed.
    System(String),
    /// OSC 52 write failed.
    Osc52(String),
}

impl std::fmt::Display for ClipboardError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClipboardError::System(msg) => write!(f, "system clipboard failed: {}", msg),
            ClipboardError::Osc52(msg) => write!(f, "OSC 52 clipboard failed: {}", msg),
        }
    }
}

impl std::error::Error for ClipboardError {}

/// Platform clipboard access.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClipboard;

impl ClipboardService for SystemClipboard {
    /// Copies text using the system clipboard.
    ///
    /// `arboard` can block on the display server, so the write runs on a
    /// blocking task and the caller awaits it.
    async fn write_primary(&self, text: &str) -> Result<(), ClipboardError> {
        let payload = text.to_owned();
        let write = tokio::task::spawn_blocking(move || {
            let mut clipboard =
                arboard::Clipboard::new().map_err(|e| ClipboardError::System(e.to_string()))?;
            clipboard
                .set_text(payload)
                .map_err(|e| ClipboardError::System(e.to_string()))
        });
        write
            .await
            .map_err(|e| ClipboardError::System(e.to_string()))?
    }

    /// Copies text using an OSC 52 escape sequence.
    ///
    /// Writes directly to stdout; the terminal intercepts the sequence and
    /// copies the payload to the system clipboard.
    fn write_fallback(&self, text: &str) -> Result<(), ClipboardError> {
        use base64::Engine;

        let encoded = base64::engine::general_purpose::STANDARD.encode(text);

        // OSC 52 format: ESC ] 52 ; c ; <base64-data> ESC \
        // - 'c' selects the system clipboard
        let mut stdout = std::io::stdout();
        write!(stdout, "\x1b]52;c;{}\x1b\\", encoded)
            .map_err(|e| ClipboardError::Osc52(e.to_string()))?;
        stdout
            .flush()
            .map_err(|e| ClipboardError::Osc52(e.to_string()))?;

        Ok(())
    }
}
