//! Command sinks used by the binary.

use std::io::{self, Write};

use log::{debug, warn};
use skyaim_core::{CameraCommand, CommandSink};

/// Logs every command at debug level
#[derive(Debug, Default)]
pub struct LogSink;

impl CommandSink for LogSink {
    fn apply_command(&mut self, command: &CameraCommand) {
        debug!(
            "yaw {:7.2} pitch {:6.4} roll {:6.2} zoom {:4.1}",
            command.yaw, command.pitch, command.roll, command.zoom
        );
    }
}

/// Writes every command as one JSON object per line.
///
/// Write errors never stop the aim loop. The first one is reported with
/// `warn!`, later ones only at debug level until a write succeeds again.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
    failing: bool,
    written: u64,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        JsonLinesSink {
            writer,
            failing: false,
            written: 0,
        }
    }

    /// Number of commands written successfully
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line(&mut self, command: &CameraCommand) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, command)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

impl<W: Write> CommandSink for JsonLinesSink<W> {
    fn apply_command(&mut self, command: &CameraCommand) {
        match self.write_line(command) {
            Ok(()) => {
                if self.failing {
                    debug!("Command output recovered");
                    self.failing = false;
                }
                self.written += 1;
            }
            Err(e) if !self.failing => {
                warn!("Cannot write command: {}", e);
                self.failing = true;
            }
            Err(e) => debug!("Cannot write command: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_json_lines() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.apply_command(&CameraCommand {
            yaw: 90.0,
            pitch: 0.5,
            roll: 0.0,
            zoom: 4.0,
        });
        sink.apply_command(&CameraCommand::default());
        assert_eq!(sink.written(), 2);

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["yaw"], 90.0);
        assert_eq!(first["pitch"], 0.5);
        assert_eq!(first["zoom"], 4.0);
    }

    #[test]
    fn test_write_errors_do_not_panic() {
        let mut sink = JsonLinesSink::new(BrokenPipe);
        sink.apply_command(&CameraCommand::default());
        sink.apply_command(&CameraCommand::default());
        assert_eq!(sink.written(), 0);
        assert!(sink.failing);
    }
}
