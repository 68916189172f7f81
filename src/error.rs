//! `nuodb` error types.
use std::{backtrace::Backtrace, fmt, io, str::Utf8Error};

use crate::{
    connection::config::ParseError,
    cursor::CursorRetired,
    protocol::ProtocolError,
    result::DdlResult,
    row::DecodeError,
    transaction::TransactionActive,
};

mod dberr;

pub use dberr::{Category, DbError, category_of};
pub use dberr::{
    BUG_CHECK, COMPILE_ERROR, CONNECTION_ERROR, CONSTRAINT_ERROR, CONVERSION_ERROR,
    DEADLOCK_ERROR, FEATURE_NOT_SUPPORTED, NETWORK_ERROR, NO_SUCH_COLUMN, NO_SUCH_TABLE,
    PLATFORM_ERROR, RUNTIME_ERROR, SECURITY_ERROR, SYNTAX_ERROR,
};

/// A specialized [`Result`] type for `nuodb` operation.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// All possible error from the `nuodb` library.
pub struct Error {
    context: String,
    backtrace: Backtrace,
    kind: ErrorKind,
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    /// The server failure behind this error, when there is one.
    pub fn as_db(&self) -> Option<&DbError> {
        match &self.kind {
            ErrorKind::Database(e) => Some(e),
            _ => None,
        }
    }

    /// Numeric code in the server's code space, for errors that map to it.
    ///
    /// Local decode failures report the conversion code, transport failures
    /// the connection code.
    pub fn code(&self) -> Option<i32> {
        match &self.kind {
            ErrorKind::Database(e) => Some(e.code()),
            ErrorKind::Decode(_) => Some(CONVERSION_ERROR),
            ErrorKind::Io(_) | ErrorKind::Protocol(_) => Some(CONNECTION_ERROR),
            _ => None,
        }
    }

    pub(crate) fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }
}

/// All possible error kind from the `nuodb` library.
pub enum ErrorKind {
    /// Invalid connection url or option.
    Config(ParseError),
    /// Both sides no longer agree on the message exchange.
    Protocol(ProtocolError),
    Io(io::Error),
    /// A failure reported by, or expressed in the code space of, the server.
    Database(DbError),
    /// A fetched value does not fit the requested native type.
    Decode(DecodeError),
    Utf8(Utf8Error),
    /// An explicit transaction boundary is already active.
    TransactionActive(TransactionActive),
    /// Fetch on a cursor that already delivered its end.
    CursorRetired(CursorRetired),
    /// Update count or generated key requested from a DDL result.
    Ddl(DdlResult),
}

macro_rules! from {
    (<$ty:ty>$pat:pat => $body:expr) => {
        impl From<$ty> for Error {
            fn from($pat: $ty) -> Self {
                let backtrace = std::backtrace::Backtrace::capture();
                Self { context: String::new(), backtrace, kind: $body }
            }
        }
    };
}

from!(<ErrorKind>e => e);
from!(<ParseError>e => ErrorKind::Config(e));
from!(<ProtocolError>e => ErrorKind::Protocol(e));
from!(<io::Error>e => ErrorKind::Io(e));
from!(<DbError>e => ErrorKind::Database(e));
from!(<DecodeError>e => ErrorKind::Decode(e));
from!(<Utf8Error>e => ErrorKind::Utf8(e));
from!(<TransactionActive>e => ErrorKind::TransactionActive(e));
from!(<CursorRetired>e => ErrorKind::CursorRetired(e));
from!(<DdlResult>e => ErrorKind::Ddl(e));

impl std::error::Error for Error { }

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.context.is_empty() {
            write!(f, "{}: ", self.context)?;
        }

        fmt::Display::fmt(&self.kind, f)?;

        if let std::backtrace::BacktraceStatus::Captured = self.backtrace.status() {
            let mut backtrace = self.backtrace.to_string();
            write!(f, "\n\n")?;
            writeln!(f, "Stack backtrace:")?;
            backtrace.truncate(backtrace.trim_end().len());
            write!(f, "{}", backtrace)?;
        }

        Ok(())
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

impl std::error::Error for ErrorKind { }

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => e.fmt(f),
            Self::Protocol(e) => e.fmt(f),
            Self::Io(e) => e.fmt(f),
            Self::Database(e) => e.fmt(f),
            Self::Decode(e) => e.fmt(f),
            Self::Utf8(e) => e.fmt(f),
            Self::TransactionActive(e) => e.fmt(f),
            Self::CursorRetired(e) => e.fmt(f),
            Self::Ddl(e) => e.fmt(f),
        }
    }
}

impl fmt::Debug for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}
