//! The forward-only result stream.
use std::{
    collections::VecDeque,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll, ready},
};

use futures_core::Stream;

use crate::{
    Result, Row,
    common::unit_error,
    connection::{Connection, Release},
    sqltype::ColumnDesc,
};

/// Rows requested per network round trip unless overridden.
const DEFAULT_FETCH_SIZE: u32 = 64;

/// An ordered, forward-only, possibly empty stream of rows.
///
/// Rows are pulled from the server in batches of [`fetch_size`][1] so
/// memory stays bounded regardless of the total result size. A drained
/// cursor is implicitly retired and cannot be rewound.
///
/// Also implements [`Stream`], yielding `Result<Row>`.
///
/// [1]: Cursor::fetch_size
pub struct Cursor {
    conn: Connection,
    stmt: u32,
    /// Zero for a structurally row-less result, no server cursor exists.
    handle: u32,
    columns: Arc<[ColumnDesc]>,
    buffer: VecDeque<Row>,
    state: State,
    fetch_size: u32,
    pending: Option<FetchFut>,
}

type FetchFut = Pin<Box<dyn Future<Output = Result<(Vec<Row>, bool)>> + Send>>;

/// Cursor lifecycle, modeled explicitly so that "fetch after retirement"
/// is a distinct condition rather than a sentinel value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Server-side iteration state exists, more rows may follow.
    Open,
    /// The server delivered the final batch, buffered rows may remain.
    Exhausted,
    /// End already delivered to the caller.
    Retired,
}

impl Cursor {
    pub(crate) fn open(
        conn: Connection,
        stmt: u32,
        handle: u32,
        columns: Arc<[ColumnDesc]>,
    ) -> Self {
        Self {
            conn,
            stmt,
            handle,
            columns,
            buffer: VecDeque::new(),
            state: State::Open,
            fetch_size: DEFAULT_FETCH_SIZE,
            pending: None,
        }
    }

    /// Cursor of a statement that structurally cannot return rows:
    /// zero columns, no rows, nothing server-side to release.
    pub(crate) fn empty(conn: Connection) -> Self {
        Self {
            conn,
            stmt: 0,
            handle: 0,
            columns: Vec::new().into(),
            buffer: VecDeque::new(),
            state: State::Exhausted,
            fetch_size: DEFAULT_FETCH_SIZE,
            pending: None,
        }
    }

    /// Column descriptors, fixed for this cursor's lifetime.
    pub fn columns(&self) -> &[ColumnDesc] {
        &self.columns
    }

    /// Column names in result order.
    ///
    /// Names the server reports empty stay empty, they are never
    /// synthesized.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(ColumnDesc::name).collect()
    }

    /// Set the per-round-trip batch size.
    pub fn fetch_size(&mut self, rows: u32) -> &mut Self {
        self.fetch_size = rows.max(1);
        self
    }

    /// Next row, or `None` once when the stream ends.
    ///
    /// Calling again after the end was delivered reports
    /// [`CursorRetired`]; the cursor cannot be rewound.
    pub async fn next_row(&mut self) -> Result<Option<Row>> {
        loop {
            if let Some(row) = self.buffer.pop_front() {
                return Ok(Some(row));
            }
            match self.state {
                State::Open => {
                    let res = self
                        .conn
                        .fetch_batch(self.stmt, self.handle, self.fetch_size, &self.columns)
                        .await;
                    let (rows, exhausted) = match res {
                        Ok(batch) => batch,
                        Err(e) => {
                            // surfacing the failure retires this cursor, the
                            // statement stays eligible for re-execution
                            self.state = State::Retired;
                            return Err(e);
                        },
                    };
                    if exhausted {
                        self.state = State::Exhausted;
                    }
                    self.buffer.extend(rows);
                },
                State::Exhausted => {
                    self.state = State::Retired;
                    return Ok(None);
                },
                State::Retired => return Err(CursorRetired.into()),
            }
        }
    }

    /// Collect every remaining row.
    pub async fn fetch_all(mut self) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        while let Some(row) = self.next_row().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Release the server-side cursor without draining it.
    ///
    /// Complete only once the release is acknowledged or the transport is
    /// known dead.
    pub async fn close(mut self) -> Result<()> {
        let open = self.state == State::Open && self.handle != 0;
        self.state = State::Retired;
        self.buffer.clear();
        match open {
            true => self.conn.close_cursor(self.handle, self.stmt).await,
            false => Ok(()),
        }
    }
}

impl Stream for Cursor {
    type Item = Result<Row>;

    /// Unlike [`next_row`][Cursor::next_row], the stream stays fused:
    /// polling past the end keeps returning `None`.
    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let me = self.get_mut();
        loop {
            if let Some(row) = me.buffer.pop_front() {
                return Poll::Ready(Some(Ok(row)));
            }
            match me.state {
                State::Open => {
                    let fut = me.pending.get_or_insert_with(|| {
                        Box::pin(fetch_into(
                            me.conn.clone(),
                            me.stmt,
                            me.handle,
                            me.fetch_size,
                            me.columns.clone(),
                        ))
                    });
                    match ready!(fut.as_mut().poll(cx)) {
                        Ok((rows, exhausted)) => {
                            me.pending = None;
                            if exhausted {
                                me.state = State::Exhausted;
                            }
                            me.buffer.extend(rows);
                        },
                        Err(e) => {
                            me.pending = None;
                            me.state = State::Retired;
                            return Poll::Ready(Some(Err(e)));
                        },
                    }
                },
                State::Exhausted => {
                    me.state = State::Retired;
                    return Poll::Ready(None);
                },
                State::Retired => return Poll::Ready(None),
            }
        }
    }
}

async fn fetch_into(
    conn: Connection,
    stmt: u32,
    cursor: u32,
    max_rows: u32,
    columns: Arc<[ColumnDesc]>,
) -> Result<(Vec<Row>, bool)> {
    conn.fetch_batch(stmt, cursor, max_rows, &columns).await
}

impl Drop for Cursor {
    fn drop(&mut self) {
        // release the server handle through the next gated operation
        if self.state == State::Open && self.handle != 0 {
            self.conn.shared.release(Release::Cursor {
                cursor: self.handle,
                stmt: self.stmt,
            });
        }
    }
}

impl std::fmt::Debug for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("handle", &self.handle)
            .field("columns", &self.columns.len())
            .field("state", &self.state)
            .finish()
    }
}

unit_error! {
    /// Fetch on a cursor that already delivered its end.
    pub struct CursorRetired("cursor is retired, it cannot be rewound");
}
