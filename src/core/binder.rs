//! Placeholder compilation and rebinding
//!
//! Query templates are written with `:name` placeholders (named mode) or with
//! `?` placeholders (positional mode). The binder turns named templates into
//! positional ones with an ordered value list, and rewrites `?` into the
//! placeholder syntax the target driver understands ("rebinding").

use super::args::{Args, NamedArgs};
use super::error::{DatabaseError, Result, StatementKind};
use super::value::DatabaseValue;

/// Placeholder convention of a driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BindType {
    /// `?` (SQLite, MySQL)
    #[default]
    Question,
    /// `$1`, `$2`, ... (PostgreSQL)
    Dollar,
    /// `:arg1`, `:arg2`, ... (Oracle)
    Named,
    /// `@p1`, `@p2`, ... (SQL Server)
    At,
}

impl BindType {
    /// Placeholder convention for a driver name
    ///
    /// Unknown names, including augmented driver names, use `?`.
    pub fn for_driver(driver_name: &str) -> Self {
        match driver_name {
            "postgres" | "pgx" | "pq-timeouts" | "cloudsqlpostgres" | "ql" | "nrpostgres"
            | "cockroach" => BindType::Dollar,
            "oci8" | "ora" | "goracle" | "godror" => BindType::Named,
            "sqlserver" | "azuresql" => BindType::At,
            _ => BindType::Question,
        }
    }

    fn write_placeholder(&self, out: &mut String, position: usize) {
        match self {
            BindType::Question => out.push('?'),
            BindType::Dollar => {
                out.push('$');
                out.push_str(&position.to_string());
            }
            BindType::Named => {
                out.push_str(":arg");
                out.push_str(&position.to_string());
            }
            BindType::At => {
                out.push_str("@p");
                out.push_str(&position.to_string());
            }
        }
    }
}

/// A statement ready for the driver: native SQL plus values in placeholder order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoundQuery {
    /// SQL using the driver's native placeholder syntax
    pub sql: String,
    /// Values matching the placeholders, in order
    pub values: Vec<DatabaseValue>,
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.'
}

/// Compile `:name` placeholders into `bind_type` placeholders
///
/// Returns the rewritten SQL and the placeholder names in order of
/// appearance. `::` produces a literal `:`, `:=` is left untouched, and a
/// `:` that is not followed by a name character is ordinary text.
///
/// ```
/// use dbx::core::binder::{compile_named, BindType};
///
/// let (sql, names) = compile_named("SELECT * FROM t WHERE a = :a AND b = :b", BindType::Dollar);
/// assert_eq!(sql, "SELECT * FROM t WHERE a = $1 AND b = $2");
/// assert_eq!(names, ["a", "b"]);
/// ```
pub fn compile_named(query: &str, bind_type: BindType) -> (String, Vec<String>) {
    let mut sql = String::with_capacity(query.len());
    let mut names = Vec::new();
    let mut chars = query.chars().peekable();

    while let Some(c) = chars.next() {
        if c != ':' {
            sql.push(c);
            continue;
        }

        match chars.peek().copied() {
            Some(':') => {
                chars.next();
                sql.push(':');
            }
            Some('=') => {
                chars.next();
                sql.push_str(":=");
            }
            Some(next) if is_name_char(next) => {
                let mut name = String::new();
                while let Some(&n) = chars.peek() {
                    if !is_name_char(n) {
                        break;
                    }
                    name.push(n);
                    chars.next();
                }
                names.push(name);
                bind_type.write_placeholder(&mut sql, names.len());
            }
            _ => sql.push(':'),
        }
    }

    (sql, names)
}

/// Rewrite `?` placeholders into the `bind_type` convention
pub fn rebind(bind_type: BindType, query: &str) -> String {
    if bind_type == BindType::Question {
        return query.to_string();
    }

    let mut sql = String::with_capacity(query.len() + 8);
    let mut position = 0;
    for c in query.chars() {
        if c == '?' {
            position += 1;
            bind_type.write_placeholder(&mut sql, position);
        } else {
            sql.push(c);
        }
    }
    sql
}

/// Resolve a named template against `args`
///
/// # Errors
///
/// Returns a bind error naming the first placeholder with no value in `args`.
pub fn bind_named(query: &str, args: &NamedArgs, bind_type: BindType) -> Result<BoundQuery> {
    let (sql, names) = compile_named(query, bind_type);

    let values = names
        .iter()
        .map(|name| {
            args.get(name).cloned().ok_or_else(|| {
                DatabaseError::statement(
                    StatementKind::Bind,
                    "failed to bind named parameters",
                    format!("could not find name {} in arguments", name),
                )
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(BoundQuery { sql, values })
}

/// Prepare a bulk retrieval
///
/// Mapping arguments resolve named placeholders and then rebind to
/// `bind_type`. Positional arguments only rebind; the values pass through
/// in caller order and are not checked against the placeholder count here.
pub fn prepare_select(bind_type: BindType, query: &str, args: &Args) -> Result<BoundQuery> {
    let query = rebind(bind_type, query);

    match args {
        Args::Named(named) => {
            let bound = bind_named(&query, named, BindType::Question)?;
            Ok(BoundQuery {
                sql: rebind(bind_type, &bound.sql),
                values: bound.values,
            })
        }
        Args::Positional(values) => Ok(BoundQuery {
            sql: query,
            values: values.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_named_question() {
        let (sql, names) = compile_named(
            "INSERT INTO users (id, name) VALUES (:id,:name)",
            BindType::Question,
        );
        assert_eq!(sql, "INSERT INTO users (id, name) VALUES (?,?)");
        assert_eq!(names, ["id", "name"]);
    }

    #[test]
    fn test_compile_named_repeated_and_dotted() {
        let (sql, names) = compile_named(
            "SELECT * FROM t WHERE a = :u.id OR b = :u.id",
            BindType::At,
        );
        assert_eq!(sql, "SELECT * FROM t WHERE a = @p1 OR b = @p2");
        assert_eq!(names, ["u.id", "u.id"]);
    }

    #[test]
    fn test_compile_named_literal_colons() {
        let (sql, names) = compile_named(
            "SELECT '10::30', x := 1, 'a: b' FROM t WHERE id = :id",
            BindType::Question,
        );
        assert_eq!(sql, "SELECT '10:30', x := 1, 'a: b' FROM t WHERE id = ?");
        assert_eq!(names, ["id"]);
    }

    #[test]
    fn test_compile_named_at_end_of_query() {
        let (sql, names) = compile_named("DELETE FROM t WHERE id=:id", BindType::Dollar);
        assert_eq!(sql, "DELETE FROM t WHERE id=$1");
        assert_eq!(names, ["id"]);
    }

    #[test]
    fn test_rebind() {
        let query = "SELECT * FROM t WHERE a = ? AND b = ?";
        assert_eq!(rebind(BindType::Question, query), query);
        assert_eq!(
            rebind(BindType::Dollar, query),
            "SELECT * FROM t WHERE a = $1 AND b = $2"
        );
        assert_eq!(
            rebind(BindType::Named, query),
            "SELECT * FROM t WHERE a = :arg1 AND b = :arg2"
        );
        assert_eq!(
            rebind(BindType::At, query),
            "SELECT * FROM t WHERE a = @p1 AND b = @p2"
        );
    }

    #[test]
    fn test_bind_type_for_driver() {
        assert_eq!(BindType::for_driver("sqlite3"), BindType::Question);
        assert_eq!(BindType::for_driver("sqlite3_extended"), BindType::Question);
        assert_eq!(BindType::for_driver("postgres"), BindType::Dollar);
        assert_eq!(BindType::for_driver("godror"), BindType::Named);
        assert_eq!(BindType::for_driver("sqlserver"), BindType::At);
    }

    #[test]
    fn test_bind_named_resolves_values_in_order() {
        let args = NamedArgs::new().bind("name", "a").bind("id", 1);
        let bound = bind_named(
            "UPDATE users SET name = :name WHERE id = :id",
            &args,
            BindType::Question,
        )
        .unwrap();

        assert_eq!(bound.sql, "UPDATE users SET name = ? WHERE id = ?");
        assert_eq!(
            bound.values,
            vec![DatabaseValue::from("a"), DatabaseValue::Int(1)]
        );
    }

    #[test]
    fn test_bind_named_missing_name() {
        let args = NamedArgs::new().bind("id", 1);
        let err = bind_named("SELECT :id, :name", &args, BindType::Question).unwrap_err();
        assert_eq!(err.statement_kind(), Some(StatementKind::Bind));
        assert!(err.to_string().contains("could not find name name"));
    }

    #[test]
    fn test_prepare_select_named_mode() {
        let args: Args = NamedArgs::new().bind("min", 3).bind("max", 9).into();
        let bound = prepare_select(
            BindType::Dollar,
            "SELECT * FROM t WHERE v > :min AND v < :max",
            &args,
        )
        .unwrap();

        assert_eq!(bound.sql, "SELECT * FROM t WHERE v > $1 AND v < $2");
        assert_eq!(bound.values, vec![DatabaseValue::Int(3), DatabaseValue::Int(9)]);
    }

    #[test]
    fn test_prepare_select_positional_mode() {
        let args = Args::positional([9i64, 3]);
        let bound = prepare_select(
            BindType::Dollar,
            "SELECT * FROM t WHERE v < ? AND v > ? AND tag = ':x'",
            &args,
        )
        .unwrap();

        // names are not resolved in positional mode
        assert_eq!(
            bound.sql,
            "SELECT * FROM t WHERE v < $1 AND v > $2 AND tag = ':x'"
        );
        assert_eq!(
            bound.values,
            vec![DatabaseValue::Long(9), DatabaseValue::Long(3)]
        );
    }

    #[test]
    fn test_prepare_select_sqlite_is_unchanged() {
        let args = Args::positional([1i64]);
        let bound = prepare_select(BindType::Question, "SELECT * FROM t WHERE id = ?", &args)
            .unwrap();
        assert_eq!(bound.sql, "SELECT * FROM t WHERE id = ?");
    }
}
