use std::io;
use std::sync::Once;

use tracing::Level;

static LOGGING: Once = Once::new();

pub fn set_panic_hook() {
    // Better panic messages in the browser console.
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Installs the global `tracing` subscriber once. Later calls are ignored.
pub fn init_logging(level: Level) {
    LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(true)
            .with_ansi(false)
            .without_time()
            .with_writer(make_writer)
            .try_init();
    });
}

#[cfg(target_arch = "wasm32")]
fn make_writer() -> ConsoleWriter {
    ConsoleWriter::default()
}

#[cfg(not(target_arch = "wasm32"))]
fn make_writer() -> io::Stderr {
    io::stderr()
}

/// Collects one formatted record and hands it to `console.log` on drop.
#[cfg(target_arch = "wasm32")]
#[derive(Default)]
struct ConsoleWriter {
    buffer: Vec<u8>,
}

#[cfg(target_arch = "wasm32")]
impl io::Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let line = String::from_utf8_lossy(&self.buffer);
        web_sys::console::log_1(&line.trim_end().into());
    }
}
