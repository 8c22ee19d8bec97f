use core::fmt::Write;
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use spin::Mutex;

/// Longest line handed to the sink; longer records are cut.
pub const LINE_CAPACITY: usize = 256;

/// Where formatted lines end up (VGA console, serial port...).
pub type Sink = fn(&[u8]);

static SINK: Mutex<Option<Sink>> = Mutex::new(None);
static LOGGER: KernelLogger = KernelLogger;

struct KernelLogger;

impl Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let Some(sink) = *SINK.lock() else {
            return;
        };
        let mut buffer = [0u8; LINE_CAPACITY];
        let len = render(record, &mut buffer);
        sink(&buffer[..len]);
    }

    fn flush(&self) {}
}

/// Installs the kernel logger. Can only succeed once per boot; the sink can
/// be replaced afterwards with [`set_sink`].
pub fn init(sink: Sink, level: LevelFilter) -> Result<(), SetLoggerError> {
    set_sink(sink);
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}

pub fn set_sink(sink: Sink) {
    *SINK.lock() = Some(sink);
}

/// Formats `record` as `LEVEL target: message\n` into `buffer`, returning the
/// number of bytes used. Output that does not fit is truncated, but the line
/// always ends with a newline.
pub fn render(record: &Record, buffer: &mut [u8]) -> usize {
    if buffer.is_empty() {
        return 0;
    }
    let last = buffer.len() - 1;
    let mut writer = BufferWriter::new(&mut buffer[..last]);
    // A full buffer is not an error worth reporting from inside the logger.
    let _ = write!(
        writer,
        "{:<5} {}: {}",
        record.level(),
        record.target(),
        record.args()
    );
    let len = writer.position;
    buffer[len] = b'\n';
    len + 1
}

struct BufferWriter<'a> {
    buffer: &'a mut [u8],
    position: usize,
}

impl<'a> BufferWriter<'a> {
    fn new(buffer: &'a mut [u8]) -> Self {
        BufferWriter { buffer, position: 0 }
    }
}

impl<'a> Write for BufferWriter<'a> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        let bytes = s.as_bytes();
        let available_space = self.buffer.len() - self.position;
        let bytes_to_write = bytes.len().min(available_space);

        self.buffer[self.position..self.position + bytes_to_write]
            .copy_from_slice(&bytes[..bytes_to_write]);
        self.position += bytes_to_write;

        if bytes_to_write < bytes.len() {
            return Err(core::fmt::Error);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::drive::generic_drive::DriveCollection;
    use log::Level;

    fn render_to_string(level: Level, args: core::fmt::Arguments, capacity: usize) -> String {
        let mut buffer = vec![0u8; capacity];
        let record = Record::builder()
            .level(level)
            .target("ata_driver::drivers::ata")
            .args(args)
            .build();
        let len = render(&record, &mut buffer);
        String::from_utf8(buffer[..len].to_vec()).unwrap()
    }

    #[test]
    fn renders_level_target_and_message() {
        let line = render_to_string(Level::Warn, format_args!("[ATA] slot {} skipped", 2), 128);
        assert_eq!(line, "WARN  ata_driver::drivers::ata: [ATA] slot 2 skipped\n");
    }

    #[test]
    fn truncates_long_lines_but_keeps_newline() {
        let line = render_to_string(Level::Info, format_args!("{}", "x".repeat(64)), 16);
        assert_eq!(line.len(), 16);
        assert!(line.starts_with("INFO  ata_drive"));
        assert!(line.ends_with('\n'));
    }

    #[test]
    fn empty_buffer_renders_nothing() {
        assert_eq!(render(&Record::builder().args(format_args!("dropped")).build(), &mut [0u8; 0]), 0);
    }

    static CAPTURED: Mutex<Vec<u8>> = Mutex::new(Vec::new());

    fn capture(bytes: &[u8]) {
        CAPTURED.lock().extend_from_slice(bytes);
    }

    fn captured() -> String {
        String::from_utf8(CAPTURED.lock().clone()).unwrap()
    }

    // The only test that installs the global logger.
    #[test]
    fn installed_logger_filters_and_forwards_to_sink() {
        // Without a sink records are dropped.
        log::set_max_level(LevelFilter::Trace);
        LOGGER.log(&Record::builder().level(Level::Error).args(format_args!("before sink")).build());

        init(capture, LevelFilter::Info).unwrap();
        log::warn!("[ATA] slot 3 skipped");
        log::debug!("[ATA] filtered by level");
        DriveCollection::new().print_drives();

        let text = captured();
        assert!(!text.contains("before sink"));
        assert!(text.contains("WARN  ata_driver::logger::tests: [ATA] slot 3 skipped\n"));
        assert!(!text.contains("filtered by level"));
        assert!(text.contains("INFO  ata_driver::drivers::drive::generic_drive: No drives in the collection.\n"));
        assert!(text.ends_with('\n'));
    }
}
