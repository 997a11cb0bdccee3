//! Demultiplexing of a child's captured output.
//!
//! The child shares one byte stream between ordinary output and failure
//! messages. A failure message is introduced by at least two NUL bytes and
//! runs until the next NUL; anything else is ordinary output.

use std::io::{self, Write};

/// Number of NULs written before a failure message.
const MESSAGE_MARK: &[u8] = b"\0\0\0";

/// Write one failure message in the framing [`demux`] understands.
pub fn write_failure(out: &mut impl Write, message: &str) -> io::Result<()> {
    out.write_all(MESSAGE_MARK)?;
    out.write_all(message.as_bytes())?;
    out.write_all(b"\n\0")
}

/// Output of a child split into its two channels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdio: String,
    pub error: String,
}

impl CapturedOutput {
    pub fn error_message(&self) -> Option<&str> {
        (!self.error.is_empty()).then_some(self.error.as_str())
    }

    pub fn stdio(&self) -> Option<&str> {
        (!self.stdio.is_empty()).then_some(self.stdio.as_str())
    }
}

pub fn demux(raw: &[u8]) -> CapturedOutput {
    let mut stdio = Vec::new();
    let mut error = Vec::new();

    let mut rest = raw;
    loop {
        let zeros = rest.iter().take_while(|&&b| b == 0).count();
        rest = &rest[zeros..];
        if rest.is_empty() {
            break;
        }

        // Output cut by the capture limit has no terminator.
        let len = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
        let (chunk, tail) = rest.split_at(len);
        if zeros < 2 {
            stdio.extend_from_slice(chunk);
        } else {
            error.extend_from_slice(chunk);
        }
        rest = tail.get(1..).unwrap_or_default();
    }

    CapturedOutput {
        stdio: trimmed(&stdio),
        error: trimmed(&error),
    }
}

fn trimmed(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches('\n')
        .to_string()
}
