use std::{error::Error, fmt::Display, io};

use xfcp_protocol::error::FrameError;

/// Errors that may occur while performing a client transaction.
#[derive(Debug)]
pub enum ClientError {
    IoError(io::Error),
    Frame(FrameError),
    /// The fabric reported a path element beyond a switch's fan-out.
    Routing { port: u8, fan_out: u8 },
    /// The endpoint reported an access past its addressable range.
    OutOfRange { addr: u8, len: u16 },
    /// The response carried an operation code the request does not pair with.
    UnexpectedResponse(u8),
    /// The response payload was shorter than its own header declares.
    ShortResponse { expected: usize, got: usize },
    /// The serial stream closed while waiting for a response.
    StreamClosed,
}

impl From<io::Error> for ClientError {
    fn from(value: io::Error) -> Self {
        ClientError::IoError(value)
    }
}

impl From<FrameError> for ClientError {
    fn from(value: FrameError) -> Self {
        ClientError::Frame(value)
    }
}

impl Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::IoError(error) => write!(f, "{}", error),
            ClientError::Frame(error) => write!(f, "{}", error),
            ClientError::Routing { port, fan_out } => {
                write!(
                    f,
                    "Routing error: port {} addressed on a node with fan-out {}",
                    port, fan_out
                )
            }
            ClientError::OutOfRange { addr, len } => {
                write!(
                    f,
                    "Out of range: {} bytes at register address 0x{:02X}",
                    len, addr
                )
            }
            ClientError::UnexpectedResponse(op) => {
                write!(f, "Received unexpected response op 0x{:02X}", op)
            }
            ClientError::ShortResponse { expected, got } => {
                write!(f, "Short response payload: need {} bytes, got {}", expected, got)
            }
            ClientError::StreamClosed => write!(f, "Stream closed while awaiting response"),
        }
    }
}

impl Error for ClientError {}
