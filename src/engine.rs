//! The template substitution pass behind [`EngineConfig::prepare`].

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::registry::{BuiltinType, Modifiers};
use crate::rules::{self, Site};
use crate::scanner::{Bound, Segment, Sigil, Token, TokenKind};
use crate::value::{ErrorHandler, Number, Value};

/// Most values a single `a..b` range may expand to.
pub const MAX_RANGE_ITEMS: u64 = 10_000;

/// Output of a prepare pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prepared {
    pub sql: String,
    /// Parameters consumed by placeholders, named lookups included.
    pub consumed: usize,
}

pub(crate) fn prepare(config: &EngineConfig, template: &str, params: &[Value]) -> Result<Prepared> {
    let mut pass = Pass::new(config, template, params);
    let mut sql = String::with_capacity(template.len());

    for segment in config.scanner().segments(template) {
        match segment {
            Segment::Literal(text) => sql.push_str(text),
            Segment::Token(token) => pass.token(token, &mut sql)?,
        }
    }

    if !pass.compat && pass.consumed != params.len() {
        return Err(Error::Arity {
            template: template.to_owned(),
            supplied: params.len(),
            expected: pass.consumed,
        });
    }

    tracing::debug!(
        consumed = pass.consumed,
        supplied = params.len(),
        compat = pass.compat,
        "prepared statement"
    );
    Ok(Prepared {
        sql,
        consumed: pass.consumed,
    })
}

/// Cursor over the parameters of one pass.
struct Pass<'a> {
    config: &'a EngineConfig,
    template: &'a str,
    values: Vec<&'a Value>,
    keyed: Option<&'a [(String, Value)]>,
    /// The single unpacked argument in compatibility mode.
    whole: Option<&'a Value>,
    compat: bool,
    cursor: usize,
    consumed: usize,
}

impl<'a> Pass<'a> {
    fn new(config: &'a EngineConfig, template: &'a str, params: &'a [Value]) -> Self {
        let mut pass = Pass {
            config,
            template,
            values: params.iter().collect(),
            keyed: None,
            whole: None,
            compat: false,
            cursor: 0,
            consumed: 0,
        };

        if let [only] = params {
            match only {
                Value::List(items) => {
                    pass.values = items.iter().collect();
                    pass.whole = Some(only);
                    pass.compat = true;
                }
                Value::Map(entries) => {
                    pass.values = entries.iter().map(|(_, v)| v).collect();
                    pass.keyed = Some(entries);
                    pass.whole = Some(only);
                    pass.compat = true;
                }
                _ => {}
            }
        }
        if pass.compat {
            tracing::debug!(
                unpacked = pass.values.len(),
                "single sequence or mapping argument unpacked as the parameter list"
            );
        }
        pass
    }

    fn site<'s>(&'s self, token: &'s str, index: usize) -> Site<'s> {
        Site {
            template: self.template,
            token,
            index,
        }
    }

    fn arity_error(&self) -> Error {
        Error::Arity {
            template: self.template.to_owned(),
            supplied: self.values.len(),
            expected: self.config.scanner().count_positional(self.template),
        }
    }

    /// Takes the value under the cursor.
    fn take(&mut self) -> Result<(&'a Value, usize)> {
        let index = self.cursor;
        let value = *self.values.get(index).ok_or_else(|| self.arity_error())?;
        self.cursor += 1;
        self.consumed += 1;
        Ok((value, index))
    }

    /// Takes the value under the cursor only if it is an error handler.
    fn take_handler(&mut self) -> Option<&'a ErrorHandler> {
        match self.values.get(self.cursor) {
            Some(Value::Handler(handler)) => {
                self.cursor += 1;
                self.consumed += 1;
                Some(handler)
            }
            _ => None,
        }
    }

    fn token(&mut self, token: Token<'_>, sql: &mut String) -> Result<()> {
        match token.kind {
            TokenKind::LiteralEscape(c) => sql.push(c),
            TokenKind::Escaped => {
                let (value, index) = self.take()?;
                let escaper = self.config.escaper();
                sql.push_str(&rules::render_escaped(value, escaper, self.site(token.text, index))?);
            }
            TokenKind::Raw => {
                let (value, index) = self.take()?;
                sql.push_str(&rules::render_raw(value, self.site(token.text, index))?);
            }
            TokenKind::Array(inner) => sql.push_str(&self.array(token.text, inner)?),
            TokenKind::Range(min, max) => sql.push_str(&self.range(token.text, min, max)?),
            TokenKind::Typed {
                sigil: Sigil::Percent,
                name,
                modifiers,
                arg,
            } => {
                let (value, index) = self.take()?;
                let handler = self.take_handler();
                let modifiers = Modifiers::parse(modifiers, arg);
                let result = self.typed(value, name, &modifiers, self.site(token.text, index));
                match result {
                    Ok(text) => sql.push_str(&text),
                    Err(err) => {
                        if let Some(handler) = handler {
                            handler.call(&err);
                        }
                        return Err(err);
                    }
                }
            }
            TokenKind::Typed { sigil, name, .. } => match self.keyed {
                Some(entries) => sql.push_str(&self.named(entries, sigil, name, token.text)?),
                None => sql.push_str(token.text),
            },
        }
        Ok(())
    }

    fn array(&mut self, text: &str, inner: &str) -> Result<String> {
        let (value, index) = match self.whole {
            Some(whole) => (whole, 0),
            None => self.take()?,
        };
        let site = self.site(text, index);

        match (inner, value) {
            ("" | "@", Value::List(items)) => rules::render_raw_list(items, site),
            ("?", Value::List(items)) => {
                rules::render_escaped_list(items, self.config.escaper(), site)
            }
            (_, Value::List(_) | Value::Map(_)) if !matches!(inner, "" | "@" | "?") => {
                let nested = prepare(self.config, inner, std::slice::from_ref(value))?;
                Ok(nested.sql)
            }
            _ => Err(site.type_error(value, "only arrays are allowed in `[]` statements")),
        }
    }

    fn range(&mut self, text: &str, min: Bound<'_>, max: Bound<'_>) -> Result<String> {
        let min = self.bound(text, min)?;
        let max = self.bound(text, max)?;
        if min.abs_diff(max) >= MAX_RANGE_ITEMS {
            return Err(self
                .site(text, self.cursor.saturating_sub(1))
                .range_error(format!(
                    "range {min}..{max} expands to more than {MAX_RANGE_ITEMS} values"
                )));
        }
        let items: Vec<String> = if min <= max {
            (min..=max).map(|i| i.to_string()).collect()
        } else {
            (max..=min).rev().map(|i| i.to_string()).collect()
        };
        Ok(items.join(", "))
    }

    fn bound(&mut self, text: &str, bound: Bound<'_>) -> Result<i64> {
        let (value, index) = match bound {
            Bound::Literal(digits) => {
                return digits.parse::<i64>().map_err(|_| {
                    self.site(text, self.cursor)
                        .range_error(format!("range bound `{digits}` is out of range"))
                })
            }
            Bound::Positional => self.take()?,
        };
        match value.as_number() {
            Some(Number::Int(i)) => Ok(i),
            Some(Number::Float(f)) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
            _ => Err(self
                .site(text, index)
                .type_error(value, "ranges require integer bounds")),
        }
    }

    fn named(
        &mut self,
        entries: &'a [(String, Value)],
        sigil: Sigil,
        name: &str,
        text: &str,
    ) -> Result<String> {
        let lookup = |key: &str| entries.iter().position(|(k, _)| k == key);
        let plain = lookup(name);
        let colon = lookup(&format!(":{name}"));
        let raw = lookup(&format!("@{name}"));

        let (index, escaped) = match sigil {
            Sigil::At => match raw.or(plain) {
                Some(index) => (index, false),
                None => return Err(self.unknown_key(text)),
            },
            _ => match (plain.or(colon), raw) {
                (Some(index), _) => (index, true),
                (None, Some(index)) => (index, false),
                (None, None) => return Err(self.unknown_key(text)),
            },
        };

        self.consumed += 1;
        let value = &entries[index].1;
        let site = self.site(text, index);
        if escaped {
            rules::render_escaped(value, self.config.escaper(), site)
        } else {
            rules::render_raw(value, site)
        }
    }

    fn unknown_key(&self, text: &str) -> Error {
        Error::UnknownKey {
            template: self.template.to_owned(),
            key: text.to_owned(),
        }
    }

    fn typed(
        &self,
        value: &Value,
        name: &str,
        modifiers: &Modifiers<'_>,
        site: Site<'_>,
    ) -> Result<String> {
        if value.is_null() {
            if modifiers.is_nullable() {
                return Ok("NULL".to_owned());
            }
            return Err(Error::Nullability {
                template: self.template.to_owned(),
                token: site.token.to_owned(),
                index: site.index,
            });
        }

        let registry = self.config.registry();
        if let Some(rule) = registry.custom_type(name) {
            if let Some(text) = rule.apply(value, modifiers) {
                return Ok(text);
            }
        }

        match BuiltinType::lookup(name) {
            Some(BuiltinType::Text) => rules::apply_text(
                value.clone(),
                self.whole,
                modifiers,
                registry,
                self.config.escaper(),
                site,
            ),
            Some(BuiltinType::Numeric) => rules::apply_numeric(value, false, modifiers, registry, site),
            Some(BuiltinType::Unsigned) => rules::apply_numeric(value, true, modifiers, registry, site),
            Some(BuiltinType::Clamp) => rules::apply_clamp(value, modifiers, site),
            Some(BuiltinType::Passthrough) => rules::render_raw(value, site),
            None => {
                tracing::debug!(placeholder = name, "unregistered placeholder type, value passed through");
                rules::render_raw(value, site)
            }
        }
    }
}
