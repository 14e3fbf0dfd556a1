use std::collections::HashMap;

/// SQL keywords emitted by the [`Sql`](crate::Sql) builder methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Keyword {
    Explain,
    Select,
    Distinct,
    Insert,
    InsertInto,
    Into,
    Values,
    Update,
    Set,
    Delete,
    DeleteFrom,
    Call,
    From,
    Join,
    LeftJoin,
    RightJoin,
    InnerJoin,
    OuterJoin,
    CrossJoin,
    NaturalJoin,
    StraightJoin,
    On,
    Using,
    Where,
    In,
    NotIn,
    GroupBy,
    Having,
    OrderBy,
    Limit,
    Offset,
    Union,
    UnionAll,
    Like,
    NotLike,
}

const DEFAULTS: &[(Keyword, &str)] = &[
    (Keyword::Explain, "EXPLAIN "),
    (Keyword::Select, "SELECT "),
    (Keyword::Distinct, "DISTINCT "),
    (Keyword::Insert, "INSERT "),
    (Keyword::InsertInto, "INSERT INTO "),
    (Keyword::Into, "INTO "),
    (Keyword::Values, "\nVALUES\n\t"),
    (Keyword::Update, "UPDATE "),
    (Keyword::Set, " SET "),
    (Keyword::Delete, "DELETE "),
    (Keyword::DeleteFrom, "DELETE FROM "),
    (Keyword::Call, "CALL "),
    (Keyword::From, "\nFROM\n\t"),
    (Keyword::Join, "\n\tJOIN\n\t\t"),
    (Keyword::LeftJoin, "\n\tLEFT JOIN\n\t\t"),
    (Keyword::RightJoin, "\n\tRIGHT JOIN\n\t\t"),
    (Keyword::InnerJoin, "\n\tINNER JOIN\n\t\t"),
    (Keyword::OuterJoin, "\n\tOUTER JOIN\n\t\t"),
    (Keyword::CrossJoin, "\n\tCROSS JOIN\n\t\t"),
    (Keyword::NaturalJoin, "\n\tNATURAL JOIN\n\t\t"),
    (Keyword::StraightJoin, "\n\tSTRAIGHT_JOIN\n\t\t"),
    (Keyword::On, " ON "),
    (Keyword::Using, " USING "),
    (Keyword::Where, "\nWHERE\n\t"),
    (Keyword::In, " IN "),
    (Keyword::NotIn, " NOT IN "),
    (Keyword::GroupBy, "\nGROUP BY "),
    (Keyword::Having, "\nHAVING "),
    (Keyword::OrderBy, "\nORDER BY "),
    (Keyword::Limit, "\nLIMIT "),
    (Keyword::Offset, " OFFSET "),
    (Keyword::Union, "\nUNION\n"),
    (Keyword::UnionAll, "\nUNION ALL\n"),
    (Keyword::Like, " LIKE "),
    (Keyword::NotLike, " NOT LIKE "),
];

/// Keyword translation table.
///
/// The defaults lay statements out over several lines; [`Keywords::single_line`]
/// and [`Keywords::lower_case`] rewrite every entry.
///
/// ```
/// use sqlx_prepare::{Keyword, Keywords};
///
/// let k = Keywords::default().single_line().lower_case();
/// assert_eq!(k.get(Keyword::From), " from ");
/// ```
#[derive(Clone, Debug)]
pub struct Keywords {
    table: HashMap<Keyword, String>,
}

impl Default for Keywords {
    fn default() -> Self {
        Self {
            table: DEFAULTS
                .iter()
                .map(|(k, text)| (*k, (*text).to_owned()))
                .collect(),
        }
    }
}

impl Keywords {
    pub fn get(&self, keyword: Keyword) -> &str {
        self.table.get(&keyword).map_or("", String::as_str)
    }

    /// Replaces one entry.
    pub fn set(mut self, keyword: Keyword, text: impl Into<String>) -> Self {
        self.table.insert(keyword, text.into());
        self
    }

    /// Collapses every whitespace run to a single space, for console output.
    pub fn single_line(mut self) -> Self {
        for text in self.table.values_mut() {
            *text = collapse_whitespace(text);
        }
        self
    }

    pub fn lower_case(mut self) -> Self {
        for text in self.table.values_mut() {
            *text = text.to_lowercase();
        }
        self
    }
}

fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_space = false;
    for c in s.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}
