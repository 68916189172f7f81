//! Execution outcome of a non-cursor-producing statement.
use crate::{Result, common::unit_error};

/// Key automatically assigned by the server to an identity column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedKey {
    /// Integer identity value.
    Int(i64),
    /// String identity value.
    Str(String),
}

/// Discriminated outcome of [`exec`][crate::Connection::exec].
///
/// DDL is a distinct variant, not "zero affected rows", so a schema change
/// can be told apart from a no-op DML statement.
#[derive(Debug)]
pub enum ExecResult {
    /// Schema-changing statement.
    Ddl,
    /// Row-affecting statement.
    Dml {
        rows_affected: u64,
        generated_key: Option<GeneratedKey>,
    },
}

impl ExecResult {
    /// Returns `true` for the DDL variant.
    pub fn is_ddl(&self) -> bool {
        matches!(self, Self::Ddl)
    }

    /// Number of rows the statement affected.
    ///
    /// Errors on a DDL result rather than reporting zero.
    pub fn rows_affected(&self) -> Result<u64> {
        match self {
            Self::Dml { rows_affected, .. } => Ok(*rows_affected),
            Self::Ddl => Err(DdlResult.into()),
        }
    }

    /// Generated identity key, absent when the target has no identity
    /// column (never a sentinel zero).
    pub fn generated_key(&self) -> Option<&GeneratedKey> {
        match self {
            Self::Dml { generated_key, .. } => generated_key.as_ref(),
            Self::Ddl => None,
        }
    }

    /// Generated key collapsed to the integer view.
    ///
    /// A string identity reports `0` here, its value stays available
    /// through [`generated_key`][Self::generated_key]. A keyless DML result
    /// also reports `0`. Errors on a DDL result.
    pub fn last_insert_id(&self) -> Result<i64> {
        match self {
            Self::Dml { generated_key, .. } => Ok(match generated_key {
                Some(GeneratedKey::Int(i)) => *i,
                Some(GeneratedKey::Str(_)) | None => 0,
            }),
            Self::Ddl => Err(DdlResult.into()),
        }
    }
}

unit_error! {
    /// Update count or generated key requested from a DDL result.
    pub struct DdlResult("DDL statement has no update count or generated key");
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ddl_refuses_accessors() {
        let res = ExecResult::Ddl;
        assert!(res.is_ddl());
        assert!(res.rows_affected().is_err());
        assert!(res.last_insert_id().is_err());
        assert_eq!(res.generated_key(), None);
    }

    #[test]
    fn string_identity_collapses_to_zero() {
        let res = ExecResult::Dml {
            rows_affected: 1,
            generated_key: Some(GeneratedKey::Str("test".into())),
        };
        assert_eq!(res.last_insert_id().unwrap(), 0);
        assert_eq!(res.generated_key(), Some(&GeneratedKey::Str("test".into())));
    }

    #[test]
    fn integer_identity_reports_value() {
        let res = ExecResult::Dml {
            rows_affected: 1,
            generated_key: Some(GeneratedKey::Int(1)),
        };
        assert_eq!(res.last_insert_id().unwrap(), 1);
        assert_eq!(res.rows_affected().unwrap(), 1);
    }

    #[test]
    fn keyless_dml_is_distinguishable_from_zero_key() {
        let res = ExecResult::Dml { rows_affected: 2, generated_key: None };
        assert_eq!(res.last_insert_id().unwrap(), 0);
        assert_eq!(res.generated_key(), None);
    }
}
