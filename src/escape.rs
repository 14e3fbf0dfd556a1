//! String escaping and quoting for SQL literals.
//!
//! The engine never talks to a driver for escaping; it only calls an [`Escaper`].
//! [`MySqlEscaper`] is the default and escapes exactly the characters
//! `mysql_real_escape_string` does. It does NOT escape `%` and `_`; use
//! [`escape_like`] for text spliced into a `LIKE` pattern.

/// Dialect-specific escaping capability.
pub trait Escaper: Send + Sync {
    /// Escapes `s` so it can sit between two quote characters.
    fn escape(&self, s: &str) -> String;

    /// Quote character wrapped around escaped strings.
    fn quote_char(&self) -> char {
        '"'
    }

    /// Escapes and quotes `s`.
    fn quote(&self, s: &str) -> String {
        let q = self.quote_char();
        let escaped = self.escape(s);
        let mut out = String::with_capacity(escaped.len() + 2);
        out.push(q);
        out.push_str(&escaped);
        out.push(q);
        out
    }
}

/// MySQL backslash escaping.
///
/// # Examples
///
/// ```
/// use sqlx_prepare::{Escaper, MySqlEscaper};
///
/// let e = MySqlEscaper::default();
/// assert_eq!(e.quote("World's"), r#""World\'s""#);
/// assert_eq!(MySqlEscaper::single_quoted().quote("a\nb"), r"'a\nb'");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MySqlEscaper {
    quote: char,
}

impl MySqlEscaper {
    pub fn new(quote: char) -> Self {
        Self { quote }
    }

    pub fn single_quoted() -> Self {
        Self::new('\'')
    }
}

impl Default for MySqlEscaper {
    fn default() -> Self {
        Self::new('"')
    }
}

impl Escaper for MySqlEscaper {
    fn escape(&self, s: &str) -> String {
        let mut out = String::with_capacity(s.len());
        for c in s.chars() {
            match c {
                '\'' | '"' | '\\' => {
                    out.push('\\');
                    out.push(c);
                }
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\0' => out.push_str("\\0"),
                '\x1a' => out.push_str("\\Z"),
                _ => out.push(c),
            }
        }
        out
    }

    fn quote_char(&self) -> char {
        self.quote
    }
}

/// PostgreSQL standard-conforming strings: quotes are doubled, NUL is dropped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PostgresEscaper;

impl Escaper for PostgresEscaper {
    fn escape(&self, s: &str) -> String {
        let mut out = String::with_capacity(s.len());
        for c in s.chars() {
            match c {
                '\'' => out.push_str("''"),
                '\0' => {}
                _ => out.push(c),
            }
        }
        out
    }

    fn quote_char(&self) -> char {
        '\''
    }
}

/// Escapes `s` with `escaper`, then backslash-escapes the `LIKE` wildcards `%` and `_`.
pub fn escape_like(escaper: &dyn Escaper, s: &str) -> String {
    let escaped = escaper.escape(s);
    let mut out = String::with_capacity(escaped.len());
    for c in escaped.chars() {
        if c == '%' || c == '_' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
