use sqlx_prepare::prelude::*;
use sqlx_prepare::{Keywords, Modifiers, PostgresEscaper};

fn config() -> EngineConfig {
    EngineConfig::new().unwrap()
}

#[test]
fn test_numeric_values_are_bare() {
    let config = config();
    assert_eq!(config.prepare("age >= ?", &params![18]).unwrap(), "age >= 18");
    assert_eq!(config.prepare("age >= ?", &params!["18"]).unwrap(), "age >= 18");
    assert_eq!(config.prepare("x = ?", &params![2.5]).unwrap(), "x = 2.5");
    assert_eq!(config.prepare("x = ?", &params!["-3"]).unwrap(), "x = -3");
}

#[test]
fn test_numeric_lookalikes_are_quoted() {
    let config = config();
    assert_eq!(config.prepare("zip = ?", &params!["007"]).unwrap(), r#"zip = "007""#);
    assert_eq!(config.prepare("v = ?", &params!["1e3"]).unwrap(), r#"v = "1e3""#);
    assert_eq!(config.prepare("v = ?", &params![" 5"]).unwrap(), r#"v = " 5""#);
}

#[test]
fn test_null_and_bool() {
    let config = config();
    assert_eq!(config.prepare("name IS ?", &params![None::<&str>]).unwrap(), "name IS NULL");
    assert_eq!(config.prepare("name IS @", &params![None::<&str>]).unwrap(), "name IS NULL");
    assert_eq!(config.prepare("a = ? AND b = @", &params![true, false]).unwrap(), "a = 1 AND b = 0");
}

#[test]
fn test_strings_are_escaped_and_quoted() {
    let config = config();
    assert_eq!(
        config.prepare("Hello ?", &params!["World's"]).unwrap(),
        r#"Hello "World\'s""#
    );
    assert_eq!(
        config.prepare("s = ?", &params!["line\nbreak \"quoted\" back\\slash"]).unwrap(),
        r#"s = "line\nbreak \"quoted\" back\\slash""#
    );
}

#[test]
fn test_raw_values_are_not_escaped() {
    let config = config();
    assert_eq!(
        config.prepare("created = @", &params!["NOW()"]).unwrap(),
        "created = NOW()"
    );
}

#[test]
fn test_literal_escapes() {
    let config = config();
    assert_eq!(
        config.prepare(r"SELECT '??' , '@@', 100%%, \? = ?", &params![1]).unwrap(),
        "SELECT '?' , '@', 100%, ? = 1"
    );
}

#[test]
fn test_no_unresolved_placeholders_when_arity_matches() {
    let config = config();
    for n in 1..6 {
        let template = vec!["?"; n].join(", ");
        let params: Vec<Value> = (0..n as i64).map(Value::from).collect();
        let out = config.prepare(&template, &params).unwrap();
        assert!(!out.contains('?'), "{out}");
    }
}

#[test]
fn test_arity_mismatch_reports_counts() {
    let config = config();
    let err = config.prepare("a = ? AND b = ?", &params![1, 2, 3]).unwrap_err();
    match &err {
        Error::Arity { supplied, expected, .. } => assert_eq!((*supplied, *expected), (3, 2)),
        other => panic!("unexpected error {other:?}"),
    }
    assert!(err.to_string().contains("received 3"));

    let err = config.prepare("a = ? AND b = ?", &params![1]).unwrap_err();
    assert!(matches!(err, Error::Arity { supplied: 1, expected: 2, .. }));
}

#[test]
fn test_compatibility_mode() {
    let config = config();
    assert_eq!(
        config.prepare("a = ? AND b = ?", &[Value::from(vec!["x", "y"])]).unwrap(),
        r#"a = "x" AND b = "y""#
    );
    assert_eq!(
        config.prepare("id IN ([])", &[Value::from(vec![1, 2, 3])]).unwrap(),
        "id IN (1, 2, 3)"
    );
}

#[test]
fn test_arrays_and_sub_patterns() {
    let config = config();
    let ids = Value::from(vec![4, 5]);
    let names = Value::from(vec!["a", "b"]);
    assert_eq!(
        config
            .prepare("id IN ([?]) AND name IN (?)", &[ids.clone(), names.clone()])
            .unwrap(),
        r#"id IN (4, 5) AND name IN ("a", "b")"#
    );
    assert_eq!(
        config
            .prepare("INSERT INTO t VALUES [(?, ?)] ON DUPLICATE KEY UPDATE n = @", &[names, Value::from("n + 1")])
            .unwrap(),
        r#"INSERT INTO t VALUES ("a", "b") ON DUPLICATE KEY UPDATE n = n + 1"#
    );
    assert!(matches!(
        config.prepare("id IN (?) AND ?", &[Value::from(vec![ids]), Value::Null]),
        Err(Error::Type { .. })
    ));
}

#[test]
fn test_range_expansion() {
    let config = config();
    assert_eq!(config.prepare("1..5", &[]).unwrap(), "1, 2, 3, 4, 5");
    assert_eq!(config.prepare("?..?", &params![1, 5]).unwrap(), "1, 2, 3, 4, 5");
    assert_eq!(config.prepare("id IN (?..3)", &params!["1"]).unwrap(), "id IN (1, 2, 3)");
    assert!(matches!(
        config.prepare("?..5", &params!["one"]),
        Err(Error::Type { .. })
    ));
}

#[test]
fn test_typed_placeholders() {
    let config = config();
    assert_eq!(config.prepare("%d", &params!["42"]).unwrap(), "42");
    assert_eq!(config.prepare("%s", &params!["it's"]).unwrap(), r#""it\'s""#);
    assert_eq!(config.prepare("%text:upper", &params!["abc"]).unwrap(), r#""ABC""#);
    assert_eq!(config.prepare("%s:md5:raw", &params!["abc"]).unwrap(), "900150983cd24fb0d6963f7d28e17f72");
    assert_eq!(config.prepare("%s:pack:enull", &params!["   "]).unwrap(), "NULL");
    assert_eq!(config.prepare("%int:clamp:1:10", &params![99]).unwrap(), "10");
    assert_eq!(config.prepare("%clamp::100", &params![-5]).unwrap(), "-5");
    assert_eq!(config.prepare("%bool", &params![true]).unwrap(), "1");
}

#[test]
fn test_typed_errors() {
    let config = config();
    assert!(matches!(config.prepare("%d", &params!["abc"]), Err(Error::Type { .. })));
    assert!(matches!(config.prepare("%s", &params![5]), Err(Error::Type { .. })));
    assert!(matches!(config.prepare("%u", &params![-1]), Err(Error::Range { .. })));
    assert!(matches!(
        config.prepare("%varchar:8:50", &params!["short"]),
        Err(Error::Range { .. })
    ));
    assert!(matches!(
        config.prepare("x = %d AND y = %s", &params![1, None::<&str>]),
        Err(Error::Nullability { index: 1, .. })
    ));
    assert_eq!(
        config.prepare("x = %d AND y = %s:n", &params![1, None::<&str>]).unwrap(),
        "x = 1 AND y = NULL"
    );
}

#[test]
fn test_unregistered_type_passes_through() {
    let config = config();
    assert_eq!(config.prepare("%bogus", &params!["anything'"]).unwrap(), "anything'");
    assert_eq!(config.prepare("%X", &params![255]).unwrap(), "255");
}

#[test]
fn test_custom_type_and_modifier() {
    let mut config = config();
    config
        .register_type("upper", |value: &Value, _: &Modifiers<'_>| {
            value.as_str().map(|s| format!("UPPER('{s}')"))
        })
        .register_modifier("reverse", |s: &str| s.chars().rev().collect());

    assert_eq!(
        config.prepare("name = %upper", &params!["bob"]).unwrap(),
        "name = UPPER('bob')"
    );
    assert_eq!(config.prepare("%s:reverse", &params!["abc"]).unwrap(), r#""cba""#);
}

#[test]
fn test_named_parameters() {
    let config = config();
    let p = [named! { "id" => 7, "name" => "Ann", "@at" => "NOW()" }];
    assert_eq!(
        config.prepare("UPDATE t SET name = :name, at = :at WHERE id = :id", &p).unwrap(),
        r#"UPDATE t SET name = "Ann", at = NOW() WHERE id = 7"#
    );
    assert!(matches!(
        config.prepare("x = :nope", &p),
        Err(Error::UnknownKey { .. })
    ));
}

#[test]
fn test_postgres_casts_and_escaper() {
    let config = config().with_escaper(PostgresEscaper);
    assert_eq!(
        config.prepare("SELECT ?::text, :id::int", &params!["O'Brien"]).unwrap(),
        "SELECT 'O''Brien'::text, :id::int"
    );
    assert_eq!(
        config.prepare("SELECT %d::int, %s::text, %s:trim::varchar", &params![5, "a", " b "]).unwrap(),
        "SELECT 5::int, 'a'::text, 'b'::varchar"
    );
}

#[test]
fn test_builder_round_trip() {
    let config = config().with_keywords(Keywords::default().single_line().lower_case());
    let sql = config
        .sql()
        .select(&["id"])
        .from("users", &[])
        .unwrap()
        .where_("name = ?", &params!["x"])
        .unwrap()
        .into_string();
    assert_eq!(sql, r#"select id from users where name = "x""#);
}
