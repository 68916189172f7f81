//! Server failure codes and the structured client error.
use std::fmt;

/// Malformed statement text.
pub const SYNTAX_ERROR: i32 = -1;
/// Statement uses a feature the engine does not implement.
pub const FEATURE_NOT_SUPPORTED: i32 = -2;
/// Internal engine invariant failure.
pub const BUG_CHECK: i32 = -3;
/// Statement is semantically invalid against the current schema.
pub const COMPILE_ERROR: i32 = -4;
/// Failure while evaluating an otherwise valid statement.
pub const RUNTIME_ERROR: i32 = -5;
/// Value or type mismatch, locally or server detected.
pub const CONVERSION_ERROR: i32 = -8;
/// Handshake or transport failure; the connection is gone.
pub const CONNECTION_ERROR: i32 = -10;
/// Transaction aborted by the server's deadlock detector.
pub const DEADLOCK_ERROR: i32 = -11;
/// Operating system level failure reported by the server.
pub const PLATFORM_ERROR: i32 = -12;
/// Authentication or authorization failure.
pub const SECURITY_ERROR: i32 = -13;
/// Network failure between server peers.
pub const NETWORK_ERROR: i32 = -15;
/// Constraint violation.
pub const CONSTRAINT_ERROR: i32 = -20;
/// Referenced table does not exist.
pub const NO_SUCH_TABLE: i32 = -25;
/// Referenced column does not exist.
pub const NO_SUCH_COLUMN: i32 = -27;

/// Stable failure category derived from the server code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Malformed statement text, permanent.
    Syntax,
    Feature,
    Internal,
    /// Semantically invalid statement, permanent.
    Compile,
    Runtime,
    /// Value or type mismatch; the connection stays usable.
    Conversion,
    /// Transport or handshake failure, never retried automatically.
    Connection,
    Deadlock,
    Platform,
    Security,
    Constraint,
    /// Referenced table, column or routine is missing.
    UnresolvedObject,
    /// Server-specific code not otherwise classified.
    Other,
}

impl Category {
    pub fn name(self) -> &'static str {
        match self {
            Self::Syntax => "syntax",
            Self::Feature => "feature",
            Self::Internal => "internal",
            Self::Compile => "compile",
            Self::Runtime => "runtime",
            Self::Conversion => "conversion",
            Self::Connection => "connection",
            Self::Deadlock => "deadlock",
            Self::Platform => "platform",
            Self::Security => "security",
            Self::Constraint => "constraint",
            Self::UnresolvedObject => "unresolved object",
            Self::Other => "other",
        }
    }
}

/// Code to category mapping, ascending by code for binary search.
///
/// Fixed across server versions for the codes client logic depends on;
/// anything unlisted falls through to [`Category::Other`].
const CATEGORIES: &[(i32, Category)] = &[
    (NO_SUCH_COLUMN, Category::UnresolvedObject),
    (NO_SUCH_TABLE, Category::UnresolvedObject),
    (CONSTRAINT_ERROR, Category::Constraint),
    (NETWORK_ERROR, Category::Connection),
    (SECURITY_ERROR, Category::Security),
    (PLATFORM_ERROR, Category::Platform),
    (DEADLOCK_ERROR, Category::Deadlock),
    (CONNECTION_ERROR, Category::Connection),
    (CONVERSION_ERROR, Category::Conversion),
    (RUNTIME_ERROR, Category::Runtime),
    (COMPILE_ERROR, Category::Compile),
    (BUG_CHECK, Category::Internal),
    (FEATURE_NOT_SUPPORTED, Category::Feature),
    (SYNTAX_ERROR, Category::Syntax),
];

/// Classify a server status code.
pub fn category_of(code: i32) -> Category {
    match CATEGORIES.binary_search_by_key(&code, |(c, _)| *c) {
        Ok(i) => CATEGORIES[i].1,
        Err(_) => Category::Other,
    }
}

/// A failure reported by the server, or a local failure expressed in the
/// server's code space.
///
/// The message is always non-empty and, for server reports, verbatim.
#[derive(Clone)]
pub struct DbError {
    code: i32,
    category: Category,
    sql_state: String,
    message: String,
}

impl DbError {
    pub(crate) fn new(code: i32, sql_state: String, message: String) -> Self {
        let message = match message.is_empty() {
            // callers surface the message directly, never hand out an empty one
            true => format!("server error {code}"),
            false => message,
        };
        Self { code, category: category_of(code), sql_state, message }
    }

    /// A local conversion failure, same code space as the server's.
    pub(crate) fn conversion(message: String) -> Self {
        Self::new(CONVERSION_ERROR, String::new(), message)
    }

    /// The connection is no longer usable.
    pub(crate) fn connection_lost(message: String) -> Self {
        Self::new(CONNECTION_ERROR, String::new(), message)
    }

    /// Stable numeric code, negative for the codes defined by the server.
    pub fn code(&self) -> i32 {
        self.code
    }

    /// Failure category derived from the code.
    pub fn category(&self) -> Category {
        self.category
    }

    /// Five character SQLSTATE, possibly empty for local failures.
    pub fn sql_state(&self) -> &str {
        &self.sql_state
    }

    /// Human readable diagnostic, never empty.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::error::Error for DbError { }

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

impl fmt::Debug for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn table_is_sorted_for_binary_search() {
        assert!(CATEGORIES.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn known_codes_map_to_their_category() {
        assert_eq!(category_of(SYNTAX_ERROR), Category::Syntax);
        assert_eq!(category_of(COMPILE_ERROR), Category::Compile);
        assert_eq!(category_of(CONVERSION_ERROR), Category::Conversion);
        assert_eq!(category_of(CONNECTION_ERROR), Category::Connection);
        assert_eq!(category_of(NETWORK_ERROR), Category::Connection);
        assert_eq!(category_of(NO_SUCH_TABLE), Category::UnresolvedObject);
        assert_eq!(category_of(NO_SUCH_COLUMN), Category::UnresolvedObject);
    }

    #[test]
    fn unknown_codes_default_to_other() {
        assert_eq!(category_of(-999), Category::Other);
        assert_eq!(category_of(0), Category::Other);
        assert_eq!(category_of(7), Category::Other);
    }

    #[test]
    fn message_never_empty() {
        let err = DbError::new(NO_SUCH_TABLE, "42000".into(), String::new());
        assert!(!err.message().is_empty());

        let err = DbError::new(NO_SUCH_TABLE, "42000".into(), "table missing".into());
        assert_eq!(err.message(), "table missing");
    }
}
