//! Placeholder conventions and per-database SQL differences.

use std::fmt;

/// How a database spells bind parameters.
///
/// Statements are always written with `?`; `queryf` converts them for the target database.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Dialect {
    /// `?` placeholders passed through unchanged (SQLite).
    #[default]
    Positional,
    /// `$1, $2, ...` placeholders (PostgreSQL).
    Numbered,
}

impl Dialect {
    pub fn from_url(url: &str) -> Self {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Dialect::Numbered
        } else {
            Dialect::Positional
        }
    }

    /// Format a statement and convert its `?` placeholders. Quoted literals and identifiers are left alone.
    pub fn queryf(&self, args: fmt::Arguments<'_>) -> String {
        let sql = fmt::format(args);
        match self {
            Dialect::Positional => sql,
            Dialect::Numbered => number_placeholders(&sql),
        }
    }

    /// Quote an identifier. Callers only pass names validated at registration.
    pub fn quote(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    /// Placeholder for a timestamp parameter, which is bound as text.
    pub fn timestamp_param(&self) -> &'static str {
        match self {
            Dialect::Positional => "?",
            Dialect::Numbered => "CAST(? AS TIMESTAMP)",
        }
    }

    /// Select expression for a timestamp column so it scans as text.
    pub fn timestamp_select(&self, expr: &str) -> String {
        match self {
            Dialect::Positional => expr.to_string(),
            Dialect::Numbered => format!("CAST({} AS TEXT)", expr),
        }
    }
}

fn number_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut n = 0;
    let mut quote: Option<char> = None;
    for c in sql.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => {
                quote = None;
                out.push(c);
            }
            (Some(_), c) => out.push(c),
            (None, '\'' | '"') => {
                quote = Some(c);
                out.push(c);
            }
            (None, '?') => {
                n += 1;
                out.push('$');
                out.push_str(&n.to_string());
            }
            (None, c) => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_passes_through() {
        let d = Dialect::Positional;
        assert_eq!(
            d.queryf(format_args!("SELECT {} FROM {} WHERE id = ?", "a, b", "t")),
            "SELECT a, b FROM t WHERE id = ?"
        );
    }

    #[test]
    fn numbered_counts_from_one() {
        let d = Dialect::Numbered;
        assert_eq!(
            d.queryf(format_args!("UPDATE {} SET a = ?, b = ? WHERE id = ?", "t")),
            "UPDATE t SET a = $1, b = $2 WHERE id = $3"
        );
    }

    #[test]
    fn numbered_skips_quoted_text() {
        let d = Dialect::Numbered;
        assert_eq!(
            d.queryf(format_args!(r#"SELECT "wh?t" FROM t WHERE a LIKE ? ESCAPE '\' AND b = '?' AND c = ?"#)),
            r#"SELECT "wh?t" FROM t WHERE a LIKE $1 ESCAPE '\' AND b = '?' AND c = $2"#
        );
    }

    #[test]
    fn dialect_from_url() {
        assert_eq!(Dialect::from_url("postgres://u@h/db"), Dialect::Numbered);
        assert_eq!(Dialect::from_url("postgresql://u@h/db"), Dialect::Numbered);
        assert_eq!(Dialect::from_url("sqlite::memory:"), Dialect::Positional);
    }

    #[test]
    fn quoting() {
        assert_eq!(Dialect::Positional.quote("blog_post"), "\"blog_post\"");
        assert_eq!(Dialect::Numbered.quote("a\"b"), "\"a\"\"b\"");
    }
}
