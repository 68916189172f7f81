//! Server-side prepared statements.
use crate::{
    Result,
    connection::{Connection, Release},
    cursor::Cursor,
    result::ExecResult,
    value::Value,
};

/// A statement compiled server-side, reusable with different parameters.
///
/// Owns at most one open [`Cursor`] at a time: executing again while a
/// prior cursor still has rows discards those rows first, they never leak
/// into the new result.
///
/// Dropping a statement defers the server-side release to the next
/// operation on the connection; [`close`][Statement::close] releases it
/// immediately.
pub struct Statement {
    conn: Connection,
    handle: u32,
    param_count: u16,
    closed: bool,
}

impl Statement {
    pub(crate) fn new(conn: Connection, handle: u32, param_count: u16) -> Self {
        Self { conn, handle, param_count, closed: false }
    }

    /// Number of parameter placeholders the statement expects.
    pub fn param_count(&self) -> u16 {
        self.param_count
    }

    /// Execute, discarding any rows.
    pub async fn execute(&self, params: &[Value]) -> Result<ExecResult> {
        self.conn.execute_prepared(self.handle, params).await
    }

    /// Execute and stream the rows.
    pub async fn query(&self, params: &[Value]) -> Result<Cursor> {
        self.conn.query_prepared(self.handle, params).await
    }

    /// Release the server-side statement, and its open cursor with it.
    ///
    /// Complete only once the release is acknowledged or the transport is
    /// known dead.
    pub async fn close(mut self) -> Result<()> {
        self.closed = true;
        self.conn.close_statement(self.handle).await
    }
}

impl Drop for Statement {
    fn drop(&mut self) {
        if !self.closed {
            self.conn.shared.release(Release::Statement { stmt: self.handle });
        }
    }
}

impl std::fmt::Debug for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement")
            .field("handle", &self.handle)
            .field("param_count", &self.param_count)
            .finish()
    }
}
