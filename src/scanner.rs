use regex::Regex;

/// Prefix character of a typed or named placeholder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sigil {
    /// `%type` - positional, typed.
    Percent,
    /// `:name` - keyed lookup.
    Colon,
    /// `@name` - keyed lookup, raw output.
    At,
}

/// One end of a `a..b` range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bound<'t> {
    Literal(&'t str),
    Positional,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind<'t> {
    /// `??`, `@@`, `%%`, `\?`, `\@`, `\%`
    LiteralEscape(char),
    /// `?`
    Escaped,
    /// `@`
    Raw,
    /// `[...]`, holding the text between the brackets.
    Array(&'t str),
    /// `a..b`
    Range(Bound<'t>, Bound<'t>),
    /// `%type:mod:mod{arg}`, `:name`, `@name`
    Typed {
        sigil: Sigil,
        name: &'t str,
        /// Modifier segments including the leading `:`, e.g. `:trim:8:100`.
        modifiers: &'t str,
        /// Brace payload without the braces.
        arg: Option<&'t str>,
    },
}

/// A recognised placeholder together with the exact text it matched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token<'t> {
    pub text: &'t str,
    pub kind: TokenKind<'t>,
}

impl Token<'_> {
    /// Number of positional parameters this token takes from the cursor.
    pub fn positional_arity(&self) -> usize {
        match self.kind {
            TokenKind::LiteralEscape(_) => 0,
            TokenKind::Escaped | TokenKind::Raw | TokenKind::Array(_) => 1,
            TokenKind::Range(min, max) => {
                usize::from(min == Bound::Positional) + usize::from(max == Bound::Positional)
            }
            TokenKind::Typed { sigil, .. } => usize::from(sigil == Sigil::Percent),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Segment<'t> {
    Literal(&'t str),
    Token(Token<'t>),
}

/// Splits templates into literal runs and placeholder tokens.
///
/// At every position the alternatives are tried in a fixed priority order and
/// the first match wins:
///
/// 1. literal escapes `??` `@@` `%%` `\?` `\@` `\%`
/// 2. ranges `(?|\d+)..(?|\d+)`
/// 3. arrays `[...]`
/// 4. bare `?`, and bare `@` not followed by a letter
/// 5. typed/named `[%:@]ident(:modifier)*({arg})?`
///
/// `::` before a letter is always literal text so PostgreSQL casts survive;
/// `%clamp::100` still reads `::100` as an open-ended range.
///
/// # Examples
///
/// ```
/// use sqlx_prepare::scanner::{Scanner, Segment, TokenKind};
///
/// let scanner = Scanner::new()?;
/// let kinds: Vec<_> = scanner
///     .segments("id = ? AND n = @")
///     .filter_map(|s| match s {
///         Segment::Token(t) => Some(t.kind),
///         Segment::Literal(_) => None,
///     })
///     .collect();
/// assert_eq!(kinds, vec![TokenKind::Escaped, TokenKind::Raw]);
/// # Ok::<(), sqlx_prepare::Error>(())
/// ```
#[derive(Clone, Debug)]
pub struct Scanner {
    range: Regex,
    typed: Regex,
}

impl Scanner {
    pub fn new() -> crate::Result<Self> {
        let range = Regex::new(r"\A(\?|\d+)\.\.(\?|\d+)")?;
        let typed = Regex::new(
            r"\A[%:@]([a-zA-Z0-9][a-zA-Z0-9_-]*)((?::[a-z0-9._-]*)*)(\{[^{}]+\})?",
        )?;
        Ok(Self { range, typed })
    }

    /// Lazily iterates the segments of `template`.
    pub fn segments<'s, 't>(&'s self, template: &'t str) -> Segments<'s, 't> {
        Segments {
            scanner: self,
            template,
            pos: 0,
            pending: None,
        }
    }

    /// Counts the positional parameters `template` expects.
    pub fn count_positional(&self, template: &str) -> usize {
        self.segments(template)
            .map(|segment| match segment {
                Segment::Token(token) => token.positional_arity(),
                Segment::Literal(_) => 0,
            })
            .sum()
    }

    fn match_at<'t>(&self, template: &'t str, at: usize) -> Option<Token<'t>> {
        let rest = &template[at..];
        let bytes = rest.as_bytes();
        let first = bytes[0];
        let next = bytes.get(1).copied();

        let escape = match (first, next) {
            (b'?', Some(b'?')) => Some('?'),
            (b'@', Some(b'@')) => Some('@'),
            (b'%', Some(b'%')) => Some('%'),
            (b'\\', Some(c @ (b'?' | b'@' | b'%'))) => Some(char::from(c)),
            _ => None,
        };
        if let Some(c) = escape {
            return Some(Token {
                text: &rest[..2],
                kind: TokenKind::LiteralEscape(c),
            });
        }

        if first == b'?' || first.is_ascii_digit() {
            if let Some(caps) = self.range.captures(rest) {
                let bound = |i: usize| match caps.get(i).map(|m| m.as_str()) {
                    Some("?") | None => Bound::Positional,
                    Some(digits) => Bound::Literal(digits),
                };
                let (min, max) = (bound(1), bound(2));
                let len = caps.get(0).map_or(0, |m| m.end());
                return Some(Token {
                    text: &rest[..len],
                    kind: TokenKind::Range(min, max),
                });
            }
        }

        if first == b'[' {
            if let Some(end) = rest[1..].find(|c: char| c == ']' || c == '\n') {
                if rest.as_bytes()[1 + end] == b']' {
                    return Some(Token {
                        text: &rest[..end + 2],
                        kind: TokenKind::Array(&rest[1..end + 1]),
                    });
                }
            }
            return None;
        }

        match first {
            b'?' => {
                return Some(Token {
                    text: &rest[..1],
                    kind: TokenKind::Escaped,
                })
            }
            b'@' if !next.is_some_and(|c| c.is_ascii_alphabetic()) => {
                return Some(Token {
                    text: &rest[..1],
                    kind: TokenKind::Raw,
                })
            }
            _ => {}
        }

        if matches!(first, b'%' | b':' | b'@') {
            let caps = self.typed.captures(rest)?;
            let sigil = match first {
                b'%' => Sigil::Percent,
                b':' => Sigil::Colon,
                _ => Sigil::At,
            };
            let name = caps.get(1)?.as_str();
            if sigil != Sigil::Percent {
                // named lookups take no modifiers, so `:id::int` keeps its cast
                return Some(Token {
                    text: &rest[..1 + name.len()],
                    kind: TokenKind::Typed {
                        sigil,
                        name,
                        modifiers: "",
                        arg: None,
                    },
                });
            }
            let mut text = caps.get(0)?.as_str();
            let mut modifiers = caps.get(2).map_or("", |m| m.as_str());
            let mut arg = caps.get(3).map(|m| {
                let s = m.as_str();
                &s[1..s.len() - 1]
            });
            // `::max` is a range, `::int` is a cast and ends the token
            if let Some(cast) = cast_start(modifiers, &rest[1 + name.len()..]) {
                modifiers = &modifiers[..cast];
                arg = None;
                text = &rest[..1 + name.len() + cast];
            }
            return Some(Token {
                text,
                kind: TokenKind::Typed {
                    sigil,
                    name,
                    modifiers,
                    arg,
                },
            });
        }

        None
    }
}

/// Offset of the first `::` in `modifiers` that is followed by a letter in `tail`.
fn cast_start(modifiers: &str, tail: &str) -> Option<usize> {
    modifiers
        .match_indices("::")
        .map(|(i, _)| i)
        .find(|&i| tail.as_bytes().get(i + 2).is_some_and(u8::is_ascii_alphabetic))
}

fn is_candidate(b: u8) -> bool {
    matches!(b, b'?' | b'@' | b'%' | b'\\' | b'[' | b':') || b.is_ascii_digit()
}

/// Iterator returned by [`Scanner::segments`].
#[derive(Clone, Debug)]
pub struct Segments<'s, 't> {
    scanner: &'s Scanner,
    template: &'t str,
    pos: usize,
    pending: Option<Token<'t>>,
}

impl<'t> Iterator for Segments<'_, 't> {
    type Item = Segment<'t>;

    fn next(&mut self) -> Option<Segment<'t>> {
        if let Some(token) = self.pending.take() {
            return Some(Segment::Token(token));
        }

        let start = self.pos;
        let bytes = self.template.as_bytes();
        if start >= bytes.len() {
            return None;
        }

        // candidates are ASCII, so every index we slice at is a char boundary
        let mut i = start;
        while i < bytes.len() {
            if is_candidate(bytes[i]) {
                if bytes[i] == b':' && bytes.get(i + 1) == Some(&b':') {
                    i += 2;
                    continue;
                }
                if let Some(token) = self.scanner.match_at(self.template, i) {
                    self.pos = i + token.text.len();
                    if i == start {
                        return Some(Segment::Token(token));
                    }
                    self.pending = Some(token);
                    return Some(Segment::Literal(&self.template[start..i]));
                }
            }
            i += 1;
        }

        self.pos = bytes.len();
        Some(Segment::Literal(&self.template[start..]))
    }
}
