//! Write-permission guard for the `executeSqlQuery` tool.
//!
//! Statements are classified by their leading keyword only. There is no SQL
//! parsing: a statement whose text (after leading whitespace and comments)
//! begins with `insert`, `update` or `delete`, case-insensitively, is a write
//! of that kind and is rejected unless the matching flag is enabled.
//! Everything else passes through to the driver untouched.
//!
//! The driver sends statements over the text protocol with multi-statement
//! support on, so input holding more than one statement is refused outright.

use crate::error::{DbError, DbResult};
use tracing::warn;

/// Kind of statement as far as the permission policy is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Insert,
    Update,
    Delete,
    /// Anything not gated by a write flag (SELECT, SHOW, DESCRIBE, DDL, ...).
    Other,
}

impl StatementKind {
    /// Classify a statement by prefix.
    ///
    /// # Examples
    ///
    /// ```
    /// use mysql_mcp_server::tools::guard::StatementKind;
    ///
    /// assert_eq!(StatementKind::classify("INSERT INTO t VALUES (1)"), StatementKind::Insert);
    /// assert_eq!(StatementKind::classify("  delete from t"), StatementKind::Delete);
    /// assert_eq!(StatementKind::classify("/* note */ UPDATE t SET a = 1"), StatementKind::Update);
    /// assert_eq!(StatementKind::classify("SELECT 1"), StatementKind::Other);
    /// ```
    pub fn classify(sql: &str) -> Self {
        let head = skip_leading_trivia(sql);
        if starts_with_ignore_case(head, "insert") {
            Self::Insert
        } else if starts_with_ignore_case(head, "update") {
            Self::Update
        } else if starts_with_ignore_case(head, "delete") {
            Self::Delete
        } else {
            Self::Other
        }
    }

    /// Operation name used in permission errors ("Insert operations are disabled").
    /// `None` for statements no flag gates.
    pub fn operation_name(&self) -> Option<&'static str> {
        match self {
            Self::Insert => Some("Insert"),
            Self::Update => Some("Update"),
            Self::Delete => Some("Delete"),
            Self::Other => None,
        }
    }
}

impl std::fmt::Display for StatementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Insert => write!(f, "insert"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Per-operation-kind write permissions. All disabled by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WritePolicy {
    pub allow_insert: bool,
    pub allow_update: bool,
    pub allow_delete: bool,
}

impl WritePolicy {
    /// Policy that rejects every gated write.
    pub fn read_only() -> Self {
        Self::default()
    }

    /// Policy that allows every gated write.
    pub fn allow_all() -> Self {
        Self {
            allow_insert: true,
            allow_update: true,
            allow_delete: true,
        }
    }

    /// Whether statements of `kind` may run under this policy.
    pub fn allows(&self, kind: StatementKind) -> bool {
        match kind {
            StatementKind::Insert => self.allow_insert,
            StatementKind::Update => self.allow_update,
            StatementKind::Delete => self.allow_delete,
            StatementKind::Other => true,
        }
    }

    /// Classify `sql` and reject it if its kind is disabled.
    pub fn check(&self, sql: &str) -> DbResult<StatementKind> {
        let kind = StatementKind::classify(sql);
        match kind.operation_name() {
            Some(operation) if !self.allows(kind) => {
                warn!(kind = %kind, "Write statement rejected by policy");
                Err(DbError::permission(operation))
            }
            _ => Ok(kind),
        }
    }
}

/// Leading keywords of statements that produce a result set even when it is empty.
const ROW_RETURNING_KEYWORDS: &[&str] = &[
    "SELECT", "SHOW", "DESCRIBE", "DESC", "EXPLAIN", "WITH", "TABLE", "VALUES",
];

/// Whether an empty result from `sql` should be reported as an empty row list
/// rather than an affected-rows header.
///
/// Statements that produced rows are always reported as rows; this only
/// decides the shape when the driver returned none.
pub fn returns_rows(sql: &str) -> bool {
    let head = skip_leading_trivia(sql);
    if head.starts_with('(') {
        return true;
    }
    let end = head
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(head.len());
    ROW_RETURNING_KEYWORDS
        .iter()
        .any(|k| k.eq_ignore_ascii_case(&head[..end]))
}

/// Reject input that holds more than one statement.
///
/// A trailing `;` (optionally followed by whitespace or comments) is fine.
pub fn ensure_single_statement(sql: &str) -> DbResult<()> {
    // Scan once with backslash escapes and once without: the server's
    // NO_BACKSLASH_ESCAPES mode decides which reading it uses.
    if has_trailing_statement(sql, true) || has_trailing_statement(sql, false) {
        warn!("Multi-statement input rejected");
        return Err(DbError::invalid_input("Multiple statements are not allowed"));
    }
    Ok(())
}

/// Whether anything but whitespace or comments follows a `;` outside a
/// string literal, quoted identifier or comment.
fn has_trailing_statement(sql: &str, backslash_escapes: bool) -> bool {
    let bytes = sql.as_bytes();
    let mut after_separator = false;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'\'' | b'"' | b'`') => {
                if after_separator {
                    return true;
                }
                i = skip_quoted(bytes, i, quote, backslash_escapes && quote != b'`');
                continue;
            }
            b'#' => {
                i = skip_line(bytes, i);
                continue;
            }
            b'-' if is_dash_comment(&bytes[i..]) => {
                i = skip_line(bytes, i);
                continue;
            }
            // Executable /*! ... */ comments run as SQL, so only plain ones are skipped
            b'/' if bytes.get(i + 1) == Some(&b'*') && bytes.get(i + 2) != Some(&b'!') => {
                i = skip_block_comment(bytes, i);
                continue;
            }
            b';' => after_separator = true,
            c if c.is_ascii_whitespace() => {}
            _ => {
                if after_separator {
                    return true;
                }
            }
        }
        i += 1;
    }
    false
}

/// Index just past the literal opened at `start`. Unterminated literals run to the end.
fn skip_quoted(bytes: &[u8], start: usize, quote: u8, backslash_escapes: bool) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if backslash_escapes => i += 2,
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Index of the byte after the next newline.
fn skip_line(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |pos| start + pos + 1)
}

/// Index just past the `*/` closing the comment opened at `start`.
fn skip_block_comment(bytes: &[u8], start: usize) -> usize {
    bytes[start + 2..]
        .windows(2)
        .position(|w| w == b"*/")
        .map_or(bytes.len(), |pos| start + 2 + pos + 2)
}

/// `--` starts a comment only when followed by whitespace or a control character.
fn is_dash_comment(bytes: &[u8]) -> bool {
    bytes.starts_with(b"--")
        && bytes
            .get(2)
            .is_none_or(|c| c.is_ascii_whitespace() || c.is_ascii_control())
}

/// The statement text after leading whitespace and comments.
///
/// The opener of an executable `/*!NNNNN` comment is skipped as well, since
/// the server runs its body as part of the statement.
fn skip_leading_trivia(sql: &str) -> &str {
    let mut rest = sql;
    loop {
        rest = rest.trim_start();
        if let Some(body) = rest.strip_prefix("/*!") {
            rest = body.trim_start_matches(|c: char| c.is_ascii_digit());
        } else if rest.starts_with("/*") {
            rest = &rest[skip_block_comment(rest.as_bytes(), 0)..];
        } else if rest.starts_with('#') || is_dash_comment(rest.as_bytes()) {
            rest = &rest[skip_line(rest.as_bytes(), 0)..];
        } else {
            return rest;
        }
    }
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_write_prefixes() {
        assert_eq!(
            StatementKind::classify("INSERT INTO users (name) VALUES ('a')"),
            StatementKind::Insert
        );
        assert_eq!(
            StatementKind::classify("update users set name = 'b'"),
            StatementKind::Update
        );
        assert_eq!(
            StatementKind::classify("DeLeTe FROM users WHERE id = 1"),
            StatementKind::Delete
        );
    }

    #[test]
    fn test_classify_ignores_leading_whitespace() {
        assert_eq!(
            StatementKind::classify("\n\t  insert into t values (1)"),
            StatementKind::Insert
        );
    }

    #[test]
    fn test_classify_reads_and_other_statements() {
        for sql in [
            "SELECT * FROM users",
            "SHOW TABLES",
            "DESCRIBE users",
            "CREATE TABLE t (id INT)",
            "REPLACE INTO t VALUES (1)",
            "",
        ] {
            assert_eq!(StatementKind::classify(sql), StatementKind::Other, "{sql}");
        }
    }

    #[test]
    fn test_classify_is_prefix_only() {
        // Keyword position inside the statement does not matter
        assert_eq!(
            StatementKind::classify("SELECT 'insert' FROM dual"),
            StatementKind::Other
        );
        // A multi-byte first character must not panic
        assert_eq!(StatementKind::classify("é"), StatementKind::Other);
    }

    #[test]
    fn test_read_only_policy_rejects_each_write_kind() {
        let policy = WritePolicy::read_only();

        let err = policy.check("INSERT INTO t VALUES (1)").unwrap_err();
        assert_eq!(err.to_string(), "Insert operations are disabled");

        let err = policy.check("UPDATE t SET a = 1").unwrap_err();
        assert_eq!(err.to_string(), "Update operations are disabled");

        let err = policy.check("DELETE FROM t").unwrap_err();
        assert_eq!(err.to_string(), "Delete operations are disabled");
    }

    #[test]
    fn test_policy_flags_are_independent() {
        let policy = WritePolicy {
            allow_insert: true,
            allow_update: false,
            allow_delete: false,
        };
        assert_eq!(
            policy.check("insert into t values (1)").unwrap(),
            StatementKind::Insert
        );
        assert!(policy.check("update t set a = 1").is_err());
        assert!(policy.check("delete from t").is_err());
    }

    #[test]
    fn test_allow_all_policy() {
        let policy = WritePolicy::allow_all();
        assert!(policy.check("INSERT INTO t VALUES (1)").is_ok());
        assert!(policy.check("UPDATE t SET a = 1").is_ok());
        assert!(policy.check("DELETE FROM t").is_ok());
    }

    #[test]
    fn test_reads_always_pass() {
        let policy = WritePolicy::read_only();
        assert_eq!(policy.check("SELECT 1").unwrap(), StatementKind::Other);
        assert_eq!(policy.check("not even sql").unwrap(), StatementKind::Other);
    }

    #[test]
    fn test_returns_rows() {
        assert!(returns_rows("SELECT 1"));
        assert!(returns_rows("  show databases"));
        assert!(returns_rows("DESC users"));
        assert!(returns_rows("describe users"));
        assert!(returns_rows("EXPLAIN SELECT 1"));
        assert!(returns_rows("WITH x AS (SELECT 1) SELECT * FROM x"));
        assert!(returns_rows("(SELECT 1) UNION (SELECT 2)"));

        assert!(!returns_rows("INSERT INTO t VALUES (1)"));
        assert!(!returns_rows("CREATE TABLE t (id INT)"));
        assert!(!returns_rows("SET @a = 1"));
        assert!(!returns_rows("SELECTED"));
        assert!(!returns_rows(""));
    }

    #[test]
    fn test_leading_comments_are_skipped() {
        assert_eq!(
            StatementKind::classify("/* audit */ DELETE FROM t"),
            StatementKind::Delete
        );
        assert_eq!(
            StatementKind::classify("-- note\n# more\n  insert into t values (1)"),
            StatementKind::Insert
        );
        assert_eq!(
            StatementKind::classify("/*!50000 UPDATE t SET a = 1 */"),
            StatementKind::Update
        );
        assert!(returns_rows("/* hint */ SELECT 1"));
        assert!(!returns_rows("/* unterminated SELECT 1"));
    }

    #[test]
    fn test_other_kind_has_no_operation_name() {
        assert_eq!(StatementKind::Other.operation_name(), None);
        assert_eq!(StatementKind::Delete.operation_name(), Some("Delete"));
    }

    #[test]
    fn test_single_statements_pass() {
        for sql in [
            "SELECT 1",
            "SELECT 1;",
            "SELECT 1 ;  \n",
            "SELECT 1; -- trailing note",
            "SELECT 1; /* done */",
            "SELECT 'a;b', \"c;d\", `e;f` FROM t",
            "SELECT 1 -- ; DELETE FROM t",
            "SELECT 1 # ; DELETE FROM t",
            "SELECT 1 /* ; DELETE FROM t */",
            "SELECT 'it''s; fine'",
        ] {
            assert!(ensure_single_statement(sql).is_ok(), "{sql}");
        }
    }

    #[test]
    fn test_multiple_statements_are_rejected() {
        for sql in [
            "SELECT 1; DELETE FROM users",
            "SELECT 1;DELETE FROM users",
            "SELECT 1; -- x\nDELETE FROM users",
            "SELECT 'x'; 'y'",
            "SELECT 1 /*! ; DELETE FROM users */",
            // Without backslash escapes the literal ends at the second quote
            "SELECT 'a\\'; DELETE FROM users; SELECT '",
        ] {
            let err = ensure_single_statement(sql).unwrap_err();
            assert_eq!(err.to_string(), "Multiple statements are not allowed", "{sql}");
        }
    }
}
