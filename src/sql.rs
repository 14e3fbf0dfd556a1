//! Statement buffer with chained builder methods.
//!
//! Each builder method appends a keyword from the config's [`Keywords`] table
//! followed by its fragment. Fragments given with an empty parameter slice are
//! appended verbatim; otherwise they go through the prepare engine first.
//!
//! ```
//! use sqlx_prepare::{params, EngineConfig, Keywords};
//!
//! let config = EngineConfig::new()?.with_keywords(Keywords::default().single_line());
//! let sql = config
//!     .sql()
//!     .select(&["id", "name"])
//!     .from("users", &[])?
//!     .where_("age >= ? AND status = ?", &params![18, "active"])?
//!     .order_by(&["name", "DESC", "id"])
//!     .limit(10, None);
//!
//! assert_eq!(
//!     sql.as_str(),
//!     r#"SELECT id, name FROM users WHERE age >= 18 AND status = "active" ORDER BY name DESC, id LIMIT 10"#
//! );
//! # Ok::<(), sqlx_prepare::Error>(())
//! ```

use std::collections::HashMap;
use std::fmt;

use crate::config::EngineConfig;
use crate::connection::{ExecOutcome, Row};
use crate::error::Result;
use crate::escape::escape_like;
use crate::keywords::Keyword;
use crate::rules::{self, Site};
use crate::value::Value;

#[derive(Clone, Debug)]
pub struct Sql<'c> {
    config: &'c EngineConfig,
    sql: String,
}

impl<'c> Sql<'c> {
    pub fn new(config: &'c EngineConfig) -> Self {
        Self {
            config,
            sql: String::new(),
        }
    }

    /// Creates a buffer holding the prepared `template`.
    pub fn with(config: &'c EngineConfig, template: &str, params: &[Value]) -> Result<Self> {
        Self::new(config).prepare(template, params)
    }

    /// Appends the prepared `template`.
    pub fn prepare(mut self, template: &str, params: &[Value]) -> Result<Self> {
        let prepared = self.config.prepare(template, params)?;
        self.sql.push_str(&prepared);
        Ok(self)
    }

    /// Appends `text` verbatim.
    pub fn push(mut self, text: &str) -> Self {
        self.sql.push_str(text);
        self
    }

    pub fn reset(&mut self) {
        self.sql.clear();
    }

    pub fn as_str(&self) -> &str {
        &self.sql
    }

    pub fn into_string(self) -> String {
        self.sql
    }

    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    fn keyword(mut self, keyword: Keyword) -> Self {
        self.sql.push_str(self.config.keywords().get(keyword));
        self
    }

    fn clause(self, keyword: Keyword, stmt: &str, params: &[Value]) -> Result<Self> {
        let this = self.keyword(keyword);
        if params.is_empty() {
            Ok(this.push(stmt))
        } else {
            this.prepare(stmt, params)
        }
    }

    fn list(self, keyword: Keyword, items: &[&str]) -> Self {
        let this = self.keyword(keyword);
        this.push(&items.join(", "))
    }

    pub fn select(self, columns: &[&str]) -> Self {
        self.list(Keyword::Select, columns)
    }

    pub fn select_distinct(self, columns: &[&str]) -> Self {
        self.keyword(Keyword::Select).list(Keyword::Distinct, columns)
    }

    pub fn from(self, stmt: &str, params: &[Value]) -> Result<Self> {
        self.clause(Keyword::From, stmt, params)
    }

    pub fn join(self, stmt: &str, params: &[Value]) -> Result<Self> {
        self.clause(Keyword::Join, stmt, params)
    }

    pub fn left_join(self, stmt: &str, params: &[Value]) -> Result<Self> {
        self.clause(Keyword::LeftJoin, stmt, params)
    }

    pub fn right_join(self, stmt: &str, params: &[Value]) -> Result<Self> {
        self.clause(Keyword::RightJoin, stmt, params)
    }

    pub fn inner_join(self, stmt: &str, params: &[Value]) -> Result<Self> {
        self.clause(Keyword::InnerJoin, stmt, params)
    }

    pub fn outer_join(self, stmt: &str, params: &[Value]) -> Result<Self> {
        self.clause(Keyword::OuterJoin, stmt, params)
    }

    pub fn cross_join(self, stmt: &str, params: &[Value]) -> Result<Self> {
        self.clause(Keyword::CrossJoin, stmt, params)
    }

    pub fn natural_join(self, stmt: &str, params: &[Value]) -> Result<Self> {
        self.clause(Keyword::NaturalJoin, stmt, params)
    }

    pub fn straight_join(self, stmt: &str, params: &[Value]) -> Result<Self> {
        self.clause(Keyword::StraightJoin, stmt, params)
    }

    /// `JOIN table ON condition`, with `params` applied to the condition.
    pub fn join_on(self, table: &str, condition: &str, params: &[Value]) -> Result<Self> {
        self.join(table, &[])?.on(condition, params)
    }

    pub fn on(self, stmt: &str, params: &[Value]) -> Result<Self> {
        self.clause(Keyword::On, stmt, params)
    }

    pub fn using(self, columns: &[&str]) -> Self {
        let list = format!("({})", columns.join(", "));
        self.keyword(Keyword::Using).push(&list)
    }

    /// `WHERE`; the trailing underscore avoids the keyword.
    pub fn where_(self, stmt: &str, params: &[Value]) -> Result<Self> {
        self.clause(Keyword::Where, stmt, params)
    }

    /// ` IN (...)` with every value escaped.
    pub fn in_(self, values: &[Value]) -> Result<Self> {
        self.value_list(Keyword::In, values)
    }

    /// ` NOT IN (...)` with every value escaped.
    pub fn not_in(self, values: &[Value]) -> Result<Self> {
        self.value_list(Keyword::NotIn, values)
    }

    fn value_list(self, keyword: Keyword, values: &[Value]) -> Result<Self> {
        let this = self.keyword(keyword);
        let list = rules::render_escaped_list(
            values,
            this.config.escaper(),
            Site {
                template: "IN (...)",
                token: "IN",
                index: 0,
            },
        )?;
        Ok(this.push(&format!("({list})")))
    }

    pub fn group_by(self, columns: &[&str]) -> Self {
        self.list(Keyword::GroupBy, columns)
    }

    pub fn having(self, stmt: &str, params: &[Value]) -> Result<Self> {
        self.clause(Keyword::Having, stmt, params)
    }

    /// `ORDER BY`; a bare `ASC` or `DESC` attaches to the column before it.
    pub fn order_by(self, columns: &[&str]) -> Self {
        let mut this = self.keyword(Keyword::OrderBy);
        for (i, column) in columns.iter().enumerate() {
            let direction = column.trim().eq_ignore_ascii_case("ASC")
                || column.trim().eq_ignore_ascii_case("DESC");
            if i == 0 {
                this.sql.push_str(column);
            } else if direction {
                this.sql.push(' ');
                this.sql.push_str(column.trim());
            } else {
                this.sql.push_str(", ");
                this.sql.push_str(column);
            }
        }
        this
    }

    /// `LIMIT n` or `LIMIT offset, n`.
    pub fn limit(self, first: u64, second: Option<u64>) -> Self {
        let text = match second {
            Some(second) => format!("{first}, {second}"),
            None => first.to_string(),
        };
        self.keyword(Keyword::Limit).push(&text)
    }

    pub fn offset(self, offset: u64) -> Self {
        self.keyword(Keyword::Offset).push(&offset.to_string())
    }

    pub fn union(self, stmt: &str, params: &[Value]) -> Result<Self> {
        self.clause(Keyword::Union, stmt, params)
    }

    pub fn union_all(self, stmt: &str, params: &[Value]) -> Result<Self> {
        self.clause(Keyword::UnionAll, stmt, params)
    }

    pub fn insert(self) -> Self {
        self.keyword(Keyword::Insert)
    }

    pub fn insert_into(self, stmt: &str, params: &[Value]) -> Result<Self> {
        self.clause(Keyword::InsertInto, stmt, params)
    }

    /// `INTO table (a, b) VALUES (1, "x")`.
    ///
    /// Columns prefixed with `@` have the prefix stripped and their value
    /// emitted raw, e.g. `("@created", "NOW()".into())`.
    pub fn into_columns(self, table: &str, pairs: &[(&str, Value)]) -> Result<Self> {
        let mut columns = Vec::with_capacity(pairs.len());
        let mut values = Vec::with_capacity(pairs.len());
        for (index, (column, value)) in pairs.iter().enumerate() {
            let (column, raw) = split_raw(column);
            columns.push(column);
            values.push(self.pair_value(table, index, value, raw)?);
        }
        let text = format!("{table} ({}) VALUES ({})", columns.join(", "), values.join(", "));
        Ok(self.keyword(Keyword::Into).push(&text))
    }

    pub fn values(self, stmt: &str, params: &[Value]) -> Result<Self> {
        self.clause(Keyword::Values, stmt, params)
    }

    /// ` SET a = 1, b = "x"`; `@` columns take raw values.
    pub fn set(self, pairs: &[(&str, Value)]) -> Result<Self> {
        let mut assignments = Vec::with_capacity(pairs.len());
        for (index, (column, value)) in pairs.iter().enumerate() {
            let (column, raw) = split_raw(column);
            let value = self.pair_value("SET", index, value, raw)?;
            assignments.push(format!("{column} = {value}"));
        }
        Ok(self.keyword(Keyword::Set).push(&assignments.join(", ")))
    }

    pub fn update(self, stmt: &str, params: &[Value]) -> Result<Self> {
        self.clause(Keyword::Update, stmt, params)
    }

    pub fn delete(self, stmt: &str, params: &[Value]) -> Result<Self> {
        self.clause(Keyword::Delete, stmt, params)
    }

    pub fn delete_from(self, stmt: &str, params: &[Value]) -> Result<Self> {
        self.clause(Keyword::DeleteFrom, stmt, params)
    }

    /// `CALL name(?, ?, ...)`.
    ///
    /// When `name` has no `(` the argument list is generated from `params`;
    /// otherwise `name` is prepared as a template.
    pub fn call(self, name: &str, params: &[Value]) -> Result<Self> {
        if name.contains('(') {
            return self.clause(Keyword::Call, name, params);
        }
        let site = Site {
            template: name,
            token: "?",
            index: 0,
        };
        let args = params
            .iter()
            .enumerate()
            .map(|(index, value)| {
                rules::render_escaped(value, self.config.escaper(), Site { index, ..site })
            })
            .collect::<Result<Vec<_>>>()?;
        let text = format!("{name}({})", args.join(", "));
        Ok(self.keyword(Keyword::Call).push(&text))
    }

    /// Prefixes the whole buffer with `EXPLAIN`.
    pub fn explain(mut self) -> Self {
        let keyword = self.config.keywords().get(Keyword::Explain);
        self.sql.insert_str(0, keyword);
        self
    }

    /// ` LIKE "..."`, replacing `?` in `pattern` with `value` escaped for LIKE.
    ///
    /// `like("%?%", "50%")` matches strings containing the literal `50%`.
    pub fn like(self, pattern: &str, value: &str) -> Self {
        self.like_keyword(Keyword::Like, pattern, value)
    }

    pub fn not_like(self, pattern: &str, value: &str) -> Self {
        self.like_keyword(Keyword::NotLike, pattern, value)
    }

    fn like_keyword(self, keyword: Keyword, pattern: &str, value: &str) -> Self {
        let escaper = self.config.escaper();
        let q = escaper.quote_char();
        let pattern = pattern.trim_matches(q);
        let text = format!("{q}{}{q}", pattern.replace('?', &escape_like(escaper, value)));
        self.keyword(keyword).push(&text)
    }

    /// `MIN(MAX(value, min), max)`, optionally aliased.
    pub fn clamp(
        self,
        value: impl fmt::Display,
        min: impl fmt::Display,
        max: impl fmt::Display,
        alias: Option<&str>,
    ) -> Self {
        let mut text = format!("MIN(MAX({value}, {min}), {max})");
        if let Some(alias) = alias {
            text.push_str(" AS ");
            text.push_str(alias);
        }
        self.push(&text)
    }

    fn pair_value(&self, template: &str, index: usize, value: &Value, raw: bool) -> Result<String> {
        let site = Site {
            template,
            token: if raw { "@" } else { "?" },
            index,
        };
        if !value.category().is_scalar() {
            return Err(site.type_error(value, "only numeric, string and null values are supported"));
        }
        if raw {
            rules::render_raw(value, site)
        } else {
            rules::render_escaped(value, self.config.escaper(), site)
        }
    }

    pub async fn exec(&self) -> Result<ExecOutcome> {
        self.config.connection()?.exec(&self.sql).await
    }

    pub async fn query(&self) -> Result<Vec<Row>> {
        self.config.connection()?.query(&self.sql).await
    }

    pub async fn lookup(&self) -> Result<Option<Value>> {
        self.config.connection()?.lookup(&self.sql).await
    }

    pub async fn fetch_all(&self) -> Result<Vec<Row>> {
        self.config.connection()?.fetch_all(&self.sql).await
    }

    pub async fn fetch_all_indexed_by(&self, key: &str) -> Result<HashMap<String, Row>> {
        self.config
            .connection()?
            .fetch_all_indexed_by(&self.sql, key)
            .await
    }

    pub async fn fetch_all_as_rows(&self) -> Result<Vec<Vec<Value>>> {
        self.config.connection()?.fetch_all_as_rows(&self.sql).await
    }
}

fn split_raw(column: &str) -> (&str, bool) {
    match column.strip_prefix('@') {
        Some(stripped) => (stripped, true),
        None => (column, false),
    }
}

impl fmt::Display for Sql<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

impl From<Sql<'_>> for String {
    fn from(sql: Sql<'_>) -> Self {
        sql.sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::keywords::Keywords;
    use crate::params;

    fn config() -> EngineConfig {
        EngineConfig::new()
            .unwrap()
            .with_keywords(Keywords::default().single_line())
    }

    #[test]
    fn test_fragments_without_params_are_verbatim() {
        let config = config();
        let sql = config.sql().select(&["*"]).from("t", &[]).unwrap().where_("a = ??", &[]).unwrap();
        assert_eq!(sql.as_str(), "SELECT * FROM t WHERE a = ??");
    }

    #[test]
    fn test_default_keywords_are_multi_line() {
        let config = EngineConfig::new().unwrap();
        let sql = config.sql().select(&["a", "b"]).from("t", &[]).unwrap();
        assert_eq!(sql.to_string(), "SELECT a, b\nFROM\n\tt");
    }

    #[test]
    fn test_joins_and_using() {
        let config = config();
        let sql = config
            .sql()
            .select(&["u.id"])
            .from("users u", &[])
            .unwrap()
            .join_on("orders o", "o.user_id = u.id AND o.total > ?", &params![100])
            .unwrap()
            .left_join("addresses", &[])
            .unwrap()
            .using(&["user_id"]);
        assert_eq!(
            sql.as_str(),
            "SELECT u.id FROM users u JOIN orders o ON o.user_id = u.id AND o.total > 100 LEFT JOIN addresses USING (user_id)"
        );
    }

    #[test]
    fn test_order_by_attaches_direction() {
        let config = config();
        let sql = config.sql().order_by(&["a", "desc", "b", "ASC", "c"]);
        assert_eq!(sql.as_str(), " ORDER BY a desc, b ASC, c");
    }

    #[test]
    fn test_limit_offset_group_having() {
        let config = config();
        let sql = config
            .sql()
            .group_by(&["a", "b"])
            .having("COUNT(*) > ?", &params![2])
            .unwrap()
            .limit(5, Some(10))
            .offset(3);
        assert_eq!(sql.as_str(), " GROUP BY a, b HAVING COUNT(*) > 2 LIMIT 5, 10 OFFSET 3");
    }

    #[test]
    fn test_in_list() {
        let config = config();
        let sql = config
            .sql()
            .push("id")
            .in_(&params![1, "x", None::<i32>])
            .unwrap();
        assert_eq!(sql.as_str(), r#"id IN (1, "x", NULL)"#);
        assert!(matches!(
            config.sql().in_(&[Value::List(vec![])]),
            Err(Error::Type { .. })
        ));
    }

    #[test]
    fn test_not_in_list() {
        let config = config();
        let sql = config
            .sql()
            .where_("status", &[])
            .unwrap()
            .not_in(&params!["banned", "o'k"])
            .unwrap();
        assert_eq!(sql.as_str(), r#" WHERE status NOT IN ("banned", "o\'k")"#);
    }

    #[test]
    fn test_insert_into_columns() {
        let config = config();
        let sql = config
            .sql()
            .insert()
            .into_columns(
                "users",
                &[("name", "O'Neil".into()), ("age", 30.into()), ("@created", "NOW()".into())],
            )
            .unwrap();
        assert_eq!(
            sql.as_str(),
            r#"INSERT INTO users (name, age, created) VALUES ("O\'Neil", 30, NOW())"#
        );
    }

    #[test]
    fn test_insert_into_with_values() {
        let config = config();
        let sql = config
            .sql()
            .insert_into("users (a, b)", &[])
            .unwrap()
            .values("(?, @)", &params!["x", "DEFAULT"])
            .unwrap();
        assert_eq!(sql.as_str(), r#"INSERT INTO users (a, b) VALUES ("x", DEFAULT)"#);
    }

    #[test]
    fn test_update_set() {
        let config = config();
        let sql = config
            .sql()
            .update("users", &[])
            .unwrap()
            .set(&[("name", "Bob".into()), ("@seen", "NOW()".into()), ("note", Value::Null)])
            .unwrap()
            .where_("id = ?", &params![7])
            .unwrap();
        assert_eq!(
            sql.as_str(),
            r#"UPDATE users SET name = "Bob", seen = NOW(), note = NULL WHERE id = 7"#
        );
        assert!(matches!(
            config.sql().set(&[("a", Value::from(vec![1]))]),
            Err(Error::Type { .. })
        ));
    }

    #[test]
    fn test_call_generates_placeholders() {
        let config = config();
        assert_eq!(
            config.sql().call("sp_add", &params![1, "two"]).unwrap().as_str(),
            r#"CALL sp_add(1, "two")"#
        );
        assert_eq!(config.sql().call("sp_none", &[]).unwrap().as_str(), "CALL sp_none()");
        assert_eq!(
            config.sql().call("sp_x(?, NOW())", &params![5]).unwrap().as_str(),
            "CALL sp_x(5, NOW())"
        );
    }

    #[test]
    fn test_explain_prefixes_buffer() {
        let config = config();
        let sql = config.sql().select(&["1"]).explain();
        assert_eq!(sql.as_str(), "EXPLAIN SELECT 1");
    }

    #[test]
    fn test_like_escapes_wildcards() {
        let config = config();
        let sql = config.sql().push("name").like("%?%", "50%_o'k");
        assert_eq!(sql.as_str(), r#"name LIKE "%50\%\_o\'k%""#);
        let sql = config.sql().push("name").not_like("\"?%\"", "a");
        assert_eq!(sql.as_str(), r#"name NOT LIKE "a%""#);
    }

    #[test]
    fn test_clamp_expression() {
        let config = config();
        assert_eq!(
            config.sql().clamp("score", 0, 100, Some("s")).as_str(),
            "MIN(MAX(score, 0), 100) AS s"
        );
    }

    #[test]
    fn test_with_and_reset() {
        let config = config();
        let mut sql = Sql::with(&config, "SELECT ?", &params![1]).unwrap();
        assert_eq!(String::from(sql.clone()), "SELECT 1");
        sql.reset();
        assert!(sql.is_empty());
    }

    #[tokio::test]
    async fn test_exec_without_connection() {
        let config = config();
        let sql = config.sql().push("SELECT 1");
        assert!(matches!(sql.exec().await, Err(Error::Configuration(_))));
    }
}
