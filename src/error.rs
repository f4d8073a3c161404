use std::{fmt, io};

/// Why a cancellation signal fired.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Cause {
    DeadlineExceeded,
    Canceled,
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cause::DeadlineExceeded => write!(f, "deadline exceeded"),
            Cause::Canceled => write!(f, "operation canceled"),
        }
    }
}

impl std::error::Error for Cause {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// The channel is closed. Permanent for this channel.
    EndOfStream,
    /// The caller's signal fired before the hand-off happened.
    Cancelled(Cause),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EndOfStream => write!(f, "channel is closed"),
            Error::Cancelled(cause) => write!(f, "hand-off cancelled: {}", cause),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::EndOfStream => None,
            Error::Cancelled(cause) => Some(cause),
        }
    }
}

impl Error {
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Error::EndOfStream)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled(_))
    }

    /// Returns the signal's cause if this is a cancellation.
    pub fn cause(&self) -> Option<Cause> {
        match self {
            Error::Cancelled(cause) => Some(*cause),
            Error::EndOfStream => None,
        }
    }
}

impl From<Cause> for Error {
    fn from(cause: Cause) -> Self {
        Error::Cancelled(cause)
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::EndOfStream => io::Error::new(io::ErrorKind::UnexpectedEof, err),
            Error::Cancelled(Cause::DeadlineExceeded) => {
                io::Error::new(io::ErrorKind::TimedOut, err)
            }
            Error::Cancelled(Cause::Canceled) => io::Error::new(io::ErrorKind::Interrupted, err),
        }
    }
}

/// A failed send. The value was not delivered and is handed back.
#[derive(Clone, PartialEq, Eq)]
pub struct SendError<T> {
    pub(crate) err: Error,
    pub(crate) val: T,
}

impl<T> fmt::Debug for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendError").field("kind", &self.err).finish()
    }
}

impl<T> fmt::Display for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "send failed: {}", self.err)
    }
}

impl<T> std::error::Error for SendError<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.err)
    }
}

impl<T> SendError<T> {
    pub fn is_end_of_stream(&self) -> bool {
        self.err.is_end_of_stream()
    }

    pub fn is_cancelled(&self) -> bool {
        self.err.is_cancelled()
    }

    pub fn kind(&self) -> Error {
        self.err
    }

    pub fn into_inner(self) -> T {
        self.val
    }

    pub fn into_error(self) -> Error {
        self.err
    }
}

impl<T> From<SendError<T>> for Error {
    fn from(err: SendError<T>) -> Self {
        err.err
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TryRecvError {
    Empty,
    EndOfStream,
}

impl fmt::Display for TryRecvError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            TryRecvError::Empty => "no producer is offering a value".fmt(fmt),
            TryRecvError::EndOfStream => "receiving on a closed channel".fmt(fmt),
        }
    }
}

impl std::error::Error for TryRecvError {}
