use thiserror::Error;

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("camera not found: {0}")]
    NotFound(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("invalid recording: {0}")]
    InvalidRecording(String),
    #[error("end of recording reached")]
    EndOfRecording,
    #[error("capture failed: {0}")]
    Capture(String),
    #[error("no frame available: {0}")]
    NoFrame(&'static str),
    #[error("pixel ({x}, {y}) outside {width}x{height}")]
    OutOfRange {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
    #[error("camera session is closed")]
    Closed,
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
    #[error("I/O error: {0}")]
    Io(String),
}

/// Coarse classification used by callers to decide whether to stop or skip.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// Device or configuration unusable. Fatal.
    Open,
    /// Grab failed; skip everything that depends on the frame.
    Capture,
    /// Pixel coordinates outside the matrix.
    Range,
    /// Call made in the wrong session state.
    Session,
    Io,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) | Error::InvalidConfiguration(_) | Error::InvalidRecording(_) => {
                ErrorKind::Open
            }
            Error::EndOfRecording | Error::Capture(_) => ErrorKind::Capture,
            Error::OutOfRange { .. } => ErrorKind::Range,
            Error::NoFrame(_) | Error::Closed | Error::Unsupported(_) => ErrorKind::Session,
            Error::Io(_) => ErrorKind::Io,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(Error::NotFound("7".into()).kind(), ErrorKind::Open);
        assert_eq!(Error::EndOfRecording.kind(), ErrorKind::Capture);
        assert_eq!(
            Error::OutOfRange {
                x: 5,
                y: 5,
                width: 4,
                height: 4
            }
            .kind(),
            ErrorKind::Range
        );
        assert_eq!(Error::Closed.kind(), ErrorKind::Session);
    }

    #[test]
    fn test_out_of_range_message() {
        let e = Error::OutOfRange {
            x: 2000,
            y: 10,
            width: 1920,
            height: 1080,
        };
        assert_eq!(e.to_string(), "pixel (2000, 10) outside 1920x1080");
    }
}
