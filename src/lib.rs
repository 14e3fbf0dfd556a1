//! # sqlx-prepare
//!
//! A textual SQL statement assembler with `sprintf`-like typed placeholders.
//! Values are validated, escaped and spliced into the statement text, which can
//! then be sent through an SQLx pool.
//!
//! This is NOT a substitute for driver-level bound parameters: the output is a
//! plain string and is only as safe as the escaper that produced it.
//!
//! ## Features
//!
//! - **Placeholders**: `?` (escaped), `@` (raw), `%type:modifier{arg}` (typed),
//!   `:name` / `@name` (keyed), `[...]` (arrays and sub-patterns), `a..b` (ranges)
//! - **Strict numerics**: `"18"` is emitted bare, `"007"` stays a quoted string
//! - **Arity checking**: placeholder and parameter counts must agree
//! - **Extensible**: register custom `%types` and `:modifiers` per [`EngineConfig`]
//! - **Builder**: chained `select` / `from` / `where_` / `order_by` ... on [`Sql`]
//! - **Connections**: run finished statements through a [`Connection`] such as [`MySqlConnection`]
//!
//! ## Quick Start
//!
//! Add to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! sqlx = { version = "0.8", features = ["mysql", "runtime-tokio"] }
//! sqlx-prepare = "0.1"
//! ```
//!
//! ## Examples
//!
//! ### Placeholders
//!
//! ```rust
//! use sqlx_prepare::{named, params, EngineConfig};
//!
//! let config = EngineConfig::new()?;
//!
//! assert_eq!(config.prepare("age >= ?", &params![18])?, "age >= 18");
//! assert_eq!(config.prepare("name IS ?", &params![None::<&str>])?, "name IS NULL");
//! assert_eq!(config.prepare("id IN (1..5)", &[])?, "id IN (1, 2, 3, 4, 5)");
//! assert_eq!(
//!     config.prepare("%varchar:trim:crop{5}", &params!["  Hello World "])?,
//!     r#""Hello""#
//! );
//! assert_eq!(
//!     config.prepare("id = :id AND created = :created", &[named! { "id" => 5, "@created" => "NOW()" }])?,
//!     "id = 5 AND created = NOW()"
//! );
//! # Ok::<(), sqlx_prepare::Error>(())
//! ```
//!
//! ### Building and Running Statements
//!
//! ```rust,no_run
//! use sqlx_prepare::{params, EngineConfig, MySqlConnection};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let conn = MySqlConnection::connect("mysql://localhost/test").await?;
//! let config = EngineConfig::new()?.with_connection(conn);
//!
//! let rows = config
//!     .sql()
//!     .select(&["id", "name"])
//!     .from("users", &[])?
//!     .where_("age >= ? AND name LIKE ?", &params![18, "A%"])?
//!     .fetch_all()
//!     .await?;
//!
//! for row in rows {
//!     println!("{row:?}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## How It Works
//!
//! 1. **Scan**: the [`Scanner`](scanner::Scanner) splits the template into literal runs and placeholder tokens
//! 2. **Substitute**: each token consumes the next parameter (or looks up a key) and renders it
//!    through the built-in rules, a custom [`TypeRule`], and the configured [`Escaper`]
//! 3. **Check**: the number of consumed parameters must equal the number supplied, unless a
//!    single list or map was unpacked as the whole parameter list
//!
//! ## Limitations
//!
//! - Escaping is textual; prefer bound parameters for untrusted input where possible
//! - Only a MySQL connection adapter is provided
//! - A single `a..b` range expands to at most [`MAX_RANGE_ITEMS`](engine::MAX_RANGE_ITEMS) values
//!
//! ## License
//!
//! Licensed under either of Apache License, Version 2.0 or MIT license at your option.

pub mod config;
pub mod connection;
pub mod engine;
pub mod error;
pub mod escape;
pub mod keywords;
pub mod registry;
mod rules;
pub mod scanner;
pub mod sql;
pub mod value;

pub use config::EngineConfig;
pub use connection::{Connection, ExecOutcome, MySqlConnection, Row};
pub use engine::Prepared;
pub use error::{Error, Result};
pub use escape::{escape_like, Escaper, MySqlEscaper, PostgresEscaper};
pub use keywords::{Keyword, Keywords};
pub use registry::{BuiltinType, ModifierRule, Modifiers, RangeSpec, Registry, TypeRule};
pub use sql::Sql;
pub use value::{Category, ErrorHandler, Number, Value};

/// Convenience re-exports for common use cases
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::{named, params};
    pub use crate::{Connection, EngineConfig, Sql, Value};
}
