use std::{
    error::Error,
    fmt::Display,
    io::{self},
};

/// Errors that may occur when decoding a frame from the wire.
#[derive(Debug)]
pub enum FrameError {
    IoError(io::Error),
    /// The buffer ended before the declared sections were complete.
    Truncated { expected: usize, got: usize },
    /// A path or return-path section declared more hops than the fabric bound.
    PathTooLong { max: usize, got: usize },
    /// The interior of a serial frame was not valid COBS data.
    InvalidCobs,
}

impl From<io::Error> for FrameError {
    fn from(value: io::Error) -> Self {
        FrameError::IoError(value)
    }
}

impl Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameError::IoError(error) => write!(f, "{}", error),
            FrameError::Truncated { expected, got } => {
                write!(f, "Truncated frame: need {} bytes, got {}", expected, got)
            }
            FrameError::PathTooLong { max, got } => {
                write!(f, "Path section too long: maximum is {}, got {}", max, got)
            }
            FrameError::InvalidCobs => write!(f, "Invalid COBS frame interior"),
        }
    }
}

impl Error for FrameError {}
