use std::fmt;
use std::sync::Arc;

use crate::connection::Connection;
use crate::engine::{self, Prepared};
use crate::error::{Error, Result};
use crate::escape::{Escaper, MySqlEscaper};
use crate::keywords::Keywords;
use crate::registry::{Modifiers, Registry};
use crate::scanner::Scanner;
use crate::sql::Sql;
use crate::value::Value;

/// Everything a prepare pass depends on: the custom type and modifier rules,
/// the escaper, the keyword table and an optional connection.
///
/// Configure once, then share it (for example behind an `Arc`) between the
/// threads that build statements. Registration needs `&mut self`, so rules can
/// not change while a pass is running.
///
/// # Examples
///
/// ```
/// use sqlx_prepare::{params, EngineConfig};
///
/// let mut config = EngineConfig::new()?;
/// config.register_type("upper", |v, _| v.as_str().map(|s| format!("'{}'", s.to_uppercase())));
///
/// assert_eq!(config.prepare("age >= ?", &params!["18"])?, "age >= 18");
/// assert_eq!(config.prepare("Hello ?", &params!["World's"])?, r#"Hello "World\'s""#);
/// assert_eq!(config.prepare("name = %upper", &params!["bob"])?, "name = 'BOB'");
/// # Ok::<(), sqlx_prepare::Error>(())
/// ```
#[derive(Clone)]
pub struct EngineConfig {
    registry: Registry,
    escaper: Arc<dyn Escaper>,
    connection: Option<Arc<dyn Connection>>,
    keywords: Keywords,
    scanner: Scanner,
}

impl EngineConfig {
    /// Creates a config with MySQL escaping, `"` quotes and no connection.
    pub fn new() -> Result<Self> {
        Ok(Self {
            registry: Registry::new(),
            escaper: Arc::new(MySqlEscaper::default()),
            connection: None,
            keywords: Keywords::default(),
            scanner: Scanner::new()?,
        })
    }

    pub fn with_escaper<E>(mut self, escaper: E) -> Self
    where
        E: Escaper + 'static,
    {
        self.escaper = Arc::new(escaper);
        self
    }

    /// Attaches a connection and adopts its dialect's escaper.
    pub fn with_connection<C>(self, connection: C) -> Self
    where
        C: Connection + 'static,
    {
        self.with_shared_connection(Arc::new(connection))
    }

    pub fn with_shared_connection(mut self, connection: Arc<dyn Connection>) -> Self {
        self.escaper = connection.escaper();
        self.connection = Some(connection);
        self
    }

    pub fn with_keywords(mut self, keywords: Keywords) -> Self {
        self.keywords = keywords;
        self
    }

    /// Registers a custom `%name` type. A later registration under the same name replaces it.
    pub fn register_type<F>(&mut self, name: impl Into<String>, rule: F) -> &mut Self
    where
        F: Fn(&Value, &Modifiers<'_>) -> Option<String> + Send + Sync + 'static,
    {
        self.registry.register_type(name, rule);
        self
    }

    /// Registers a custom text modifier, shadowing any built-in of the same name.
    pub fn register_modifier<F>(&mut self, name: impl Into<String>, rule: F) -> &mut Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.registry.register_modifier(name, rule);
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn escaper(&self) -> &dyn Escaper {
        self.escaper.as_ref()
    }

    pub fn keywords(&self) -> &Keywords {
        &self.keywords
    }

    pub fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    /// The attached connection, or [`Error::Configuration`] when there is none.
    pub fn connection(&self) -> Result<&dyn Connection> {
        self.connection.as_deref().ok_or_else(Error::no_connection)
    }

    /// Substitutes `params` into `template`.
    pub fn prepare(&self, template: &str, params: &[Value]) -> Result<String> {
        self.prepare_with_count(template, params).map(|p| p.sql)
    }

    /// Like [`prepare`](Self::prepare), also reporting how many parameters were consumed.
    pub fn prepare_with_count(&self, template: &str, params: &[Value]) -> Result<Prepared> {
        engine::prepare(self, template, params)
    }

    /// Starts an empty statement buffer.
    pub fn sql(&self) -> Sql<'_> {
        Sql::new(self)
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("registry", &self.registry)
            .field("quote_char", &self.escaper.quote_char())
            .field("connection", &self.connection.is_some())
            .field("keywords", &self.keywords)
            .finish()
    }
}
