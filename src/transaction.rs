//! The explicit transaction boundary.
use crate::{
    Result,
    common::{unit_error, verbose},
    connection::Connection,
    cursor::Cursor,
    result::ExecResult,
    value::Value,
};

/// An RAII implementation of a transaction boundary.
///
/// Statements executed while the boundary is active are buffered
/// server-side until [`commit`][Transaction::commit] or
/// [`rollback`][Transaction::rollback], then become visible or are
/// discarded atomically.
///
/// If neither was called, dropping the boundary schedules a rollback that
/// the connection performs before its next operation.
///
/// # Example
///
/// ```no_run
/// # async fn test(conn: nuodb::Connection) -> nuodb::Result<()> {
/// let tx = conn.begin().await?;
///
/// tx.exec("INSERT INTO post (name) VALUES (?)", &["foo".into()]).await?;
///
/// tx.commit().await?;
/// # Ok(())
/// # }
/// ```
pub struct Transaction {
    conn: Connection,
    done: bool,
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction").finish_non_exhaustive()
    }
}

impl Transaction {
    pub(crate) fn new(conn: Connection) -> Self {
        Self { conn, done: false }
    }

    /// Execute a statement inside the boundary.
    pub async fn exec(&self, sql: &str, params: &[Value]) -> Result<ExecResult> {
        self.conn.exec(sql, params).await
    }

    /// Execute a statement inside the boundary and stream its rows.
    pub async fn query(&self, sql: &str, params: &[Value]) -> Result<Cursor> {
        self.conn.query(sql, params).await
    }

    /// Make the boundary's effects visible atomically.
    ///
    /// On failure (e.g. a constraint checked only at commit time) the
    /// error carries the server's report and the boundary ends rolled
    /// back.
    pub async fn commit(mut self) -> Result<()> {
        self.done = true;
        self.conn.commit_tx().await
    }

    /// Discard the boundary's effects, generated keys included.
    pub async fn rollback(mut self) -> Result<()> {
        self.done = true;
        self.conn.rollback_tx().await
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if !self.done {
            verbose!("transaction dropped, rollback deferred");
            self.conn.shared.mark_rollback();
        }
    }
}

unit_error! {
    /// An explicit boundary is already active on this connection.
    pub struct TransactionActive("a transaction is already active on this connection");
}
