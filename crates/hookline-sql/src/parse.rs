//! Statement classifier.
//!
//! Pipeline:
//!   raw &str
//!     └─ strip_leading_noise()      → statement text
//!          └─ INSERT_HEAD / UPDATE_HEAD → operation + table
//!               └─ insert_columns() / update_columns()
//!                    └─ parse_value()   → ColumnValue per column

use std::sync::LazyLock;

use hookline_core::write::{ColumnValue, Operation, WriteRequest, normalize_identifier};
use regex::Regex;

use crate::error::{Error, Result};

const TABLE: &str = r#"(?:"[^"]+"|[a-z_][a-z0-9_$]*)(?:\s*\.\s*(?:"[^"]+"|[a-z_][a-z0-9_$]*))?"#;

static INSERT_HEAD: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(&format!(r"(?is)^insert\s+into\s+({TABLE})")).expect("static regex")
});

static UPDATE_HEAD: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(&format!(r"(?is)^update\s+(?:only\s+)?({TABLE})")).expect("static regex")
});

pub(crate) fn classify(sql: &str) -> Result<WriteRequest> {
  let stmt = strip_leading_noise(sql);
  let stmt = stmt.trim_end().trim_end_matches(';');

  if let Some(caps) = INSERT_HEAD.captures(stmt) {
    let head = caps.get(0).map_or(0, |m| m.end());
    let table = table_name(&caps[1]);
    return insert_columns(&stmt[head..]).map(|columns| request(Operation::Insert, &table, columns));
  }

  if let Some(caps) = UPDATE_HEAD.captures(stmt) {
    let head = caps.get(0).map_or(0, |m| m.end());
    let table = table_name(&caps[1]);
    return update_columns(&stmt[head..]).map(|columns| request(Operation::Update, &table, columns));
  }

  Err(Error::NotAWrite)
}

fn request(op: Operation, table: &str, columns: Vec<(String, ColumnValue)>) -> WriteRequest {
  let mut req = WriteRequest::new(op, table);
  req.columns.extend(columns);
  req
}

fn table_name(raw: &str) -> String {
  let compact: String = raw.split_whitespace().collect();
  normalize_identifier(&compact)
}

// ─── INSERT ──────────────────────────────────────────────────────────────────

fn insert_columns(rest: &str) -> Result<Vec<(String, ColumnValue)>> {
  let rest = rest.trim_start();
  if !rest.starts_with('(') {
    return Err(Error::MissingColumnList);
  }
  let (cols, after) = balanced_group(rest)?;

  let after = after.trim_start();
  let keyword = after.get(..6).unwrap_or_default();
  if !keyword.eq_ignore_ascii_case("values") {
    return Err(Error::MissingValues);
  }
  let after = after[6..].trim_start();
  if !after.starts_with('(') {
    return Err(Error::MissingValues);
  }
  let (vals, _) = balanced_group(after)?;

  let cols = split_top_level(cols, b',')?;
  let vals = split_top_level(vals, b',')?;
  if cols.len() != vals.len() {
    return Err(Error::ColumnCountMismatch { columns: cols.len(), values: vals.len() });
  }

  cols
    .into_iter()
    .zip(vals)
    .map(|(c, v)| Ok((normalize_identifier(c), parse_value(v)?)))
    .collect()
}

// ─── UPDATE ──────────────────────────────────────────────────────────────────

fn update_columns(rest: &str) -> Result<Vec<(String, ColumnValue)>> {
  // Optional alias: `UPDATE claude.todos t SET ...`.
  let mut rest = rest.trim_start();
  if !starts_with_word(rest, "set") {
    let (word, tail) = next_word(rest);
    rest = tail.trim_start();
    if word.eq_ignore_ascii_case("as") {
      rest = next_word(rest).1.trim_start();
    }
  }
  if !starts_with_word(rest, "set") {
    return Err(Error::MissingSet);
  }
  let clause = &rest[3..];
  let end = find_top_level_keyword(clause, &["where", "from", "returning"])?
    .unwrap_or(clause.len());

  split_top_level(&clause[..end], b',')?
    .into_iter()
    .map(|assignment| {
      let eq = find_top_level(assignment, b'=')?
        .ok_or_else(|| Error::MalformedAssignment(assignment.trim().to_owned()))?;
      let column = normalize_identifier(&assignment[..eq]);
      if column.is_empty() {
        return Err(Error::MalformedAssignment(assignment.trim().to_owned()));
      }
      Ok((column, parse_value(&assignment[eq + 1..])?))
    })
    .collect()
}

// ─── Values ──────────────────────────────────────────────────────────────────

/// A quoted literal (optionally cast, `'…'::uuid`) becomes `Text`; `NULL`
/// (optionally cast) becomes `Null`; anything else is an opaque expression.
fn parse_value(raw: &str) -> Result<ColumnValue> {
  let v = raw.trim();

  if v.starts_with('\'') {
    let bytes = v.as_bytes();
    let end = skip_quoted(bytes, 0, b'\'')?;
    let tail = v[end..].trim_start();
    if tail.is_empty() || tail.starts_with("::") {
      return Ok(ColumnValue::Text(v[1..end - 1].replace("''", "'")));
    }
    return Ok(ColumnValue::Expr(v.to_owned()));
  }

  let base = v.split("::").next().unwrap_or(v).trim();
  if base.eq_ignore_ascii_case("null") {
    return Ok(ColumnValue::Null);
  }
  Ok(ColumnValue::Expr(v.to_owned()))
}

// ─── Scanning helpers ────────────────────────────────────────────────────────
//
// All delimiters are ASCII, so byte offsets are always char boundaries.

/// Drop leading whitespace, `-- …` line comments and `/* … */` blocks.
fn strip_leading_noise(sql: &str) -> &str {
  let mut s = sql.trim_start();
  loop {
    if let Some(rest) = s.strip_prefix("--") {
      s = rest.split_once('\n').map_or("", |(_, tail)| tail).trim_start();
    } else if let Some(rest) = s.strip_prefix("/*") {
      s = rest.split_once("*/").map_or("", |(_, tail)| tail).trim_start();
    } else {
      return s;
    }
  }
}

/// Index just past the closing quote of the literal opening at `open`.
/// A doubled quote character is an escaped quote.
fn skip_quoted(bytes: &[u8], open: usize, quote: u8) -> Result<usize> {
  let mut i = open + 1;
  while i < bytes.len() {
    if bytes[i] == quote {
      if bytes.get(i + 1) == Some(&quote) {
        i += 2;
        continue;
      }
      return Ok(i + 1);
    }
    i += 1;
  }
  Err(Error::UnterminatedLiteral)
}

/// Walk `s` outside quotes, calling `visit(index, depth)` for every other
/// byte. Stops early when `visit` returns true, yielding that index.
fn scan(s: &str, mut visit: impl FnMut(usize, i32) -> bool) -> Result<Option<usize>> {
  let bytes = s.as_bytes();
  let mut depth = 0i32;
  let mut i = 0;
  while i < bytes.len() {
    match bytes[i] {
      b'\'' | b'"' => {
        i = skip_quoted(bytes, i, bytes[i])?;
        continue;
      }
      b'(' => depth += 1,
      b')' => {
        depth -= 1;
        if depth < 0 {
          return Err(Error::Unbalanced);
        }
      }
      _ => {}
    }
    if visit(i, depth) {
      return Ok(Some(i));
    }
    i += 1;
  }
  if depth != 0 {
    return Err(Error::Unbalanced);
  }
  Ok(None)
}

/// `s` must start with `(`. Returns the group's inner text and what follows
/// the matching `)`.
fn balanced_group(s: &str) -> Result<(&str, &str)> {
  let bytes = s.as_bytes();
  match scan(s, |i, depth| bytes[i] == b')' && depth == 0)? {
    Some(i) => Ok((&s[1..i], &s[i + 1..])),
    None => Err(Error::Unbalanced),
  }
}

fn find_top_level(s: &str, needle: u8) -> Result<Option<usize>> {
  let bytes = s.as_bytes();
  scan(s, |i, depth| depth == 0 && bytes[i] == needle)
}

fn split_top_level(s: &str, sep: u8) -> Result<Vec<&str>> {
  let bytes = s.as_bytes();
  let mut cuts = Vec::new();
  scan(s, |i, depth| {
    if depth == 0 && bytes[i] == sep {
      cuts.push(i);
    }
    false
  })?;

  let mut parts = Vec::with_capacity(cuts.len() + 1);
  let mut start = 0;
  for cut in cuts {
    parts.push(&s[start..cut]);
    start = cut + 1;
  }
  parts.push(&s[start..]);
  Ok(parts)
}

fn is_ident_byte(b: u8) -> bool { b.is_ascii_alphanumeric() || b == b'_' || b == b'$' }

/// Offset of the first top-level occurrence of any of `keywords` as a whole
/// word.
fn find_top_level_keyword(s: &str, keywords: &[&str]) -> Result<Option<usize>> {
  let bytes = s.as_bytes();
  scan(s, |i, depth| {
    if depth != 0 || !bytes[i].is_ascii_alphabetic() {
      return false;
    }
    if i > 0 && is_ident_byte(bytes[i - 1]) {
      return false;
    }
    keywords.iter().any(|kw| starts_with_word(&s[i..], kw))
  })
}

fn starts_with_word(s: &str, word: &str) -> bool {
  s.get(..word.len()).is_some_and(|head| head.eq_ignore_ascii_case(word))
    && s.as_bytes().get(word.len()).is_none_or(|b| !is_ident_byte(*b))
}

fn next_word(s: &str) -> (&str, &str) {
  let end = s.bytes().position(|b| !is_ident_byte(b)).unwrap_or(s.len());
  s.split_at(end)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn text(s: &str) -> ColumnValue { ColumnValue::Text(s.into()) }

  #[test]
  fn insert_with_schema_and_values() {
    let req = classify(
      "INSERT INTO claude.features (feature_id, project_id, status, priority) \
       VALUES (gen_random_uuid(), '7f2c3a5e-0000-4000-8000-000000000001', 'planned', 2);",
    )
    .unwrap();

    assert_eq!(req.operation, Operation::Insert);
    assert_eq!(req.table, "features");
    assert_eq!(req.value("feature_id"), Some(&ColumnValue::Expr("gen_random_uuid()".into())));
    assert_eq!(req.value("project_id"), Some(&text("7f2c3a5e-0000-4000-8000-000000000001")));
    assert_eq!(req.value("status"), Some(&text("planned")));
    assert_eq!(req.value("priority"), Some(&ColumnValue::Expr("2".into())));
  }

  #[test]
  fn commas_and_quotes_inside_literals_do_not_split() {
    let req = classify(
      "insert into feedback (description, feedback_type) values ('it''s broken, badly', 'bug')",
    )
    .unwrap();
    assert_eq!(req.value("description"), Some(&text("it's broken, badly")));
    assert_eq!(req.value("feedback_type"), Some(&text("bug")));
  }

  #[test]
  fn values_keep_case_identifiers_do_not() {
    let req = classify(r#"INSERT INTO "Projects" ("Phase") VALUES ('Design')"#).unwrap();
    assert_eq!(req.table, "projects");
    assert_eq!(req.value("phase"), Some(&text("Design")));
  }

  #[test]
  fn null_and_casts() {
    let req = classify(
      "INSERT INTO build_tasks (feature_id, status, task_id) \
       VALUES (NULL::uuid, 'todo'::text, '')",
    )
    .unwrap();
    assert_eq!(req.value("feature_id"), Some(&ColumnValue::Null));
    assert_eq!(req.value("status"), Some(&text("todo")));
    assert!(req.value("task_id").unwrap().is_blank());
  }

  #[test]
  fn update_set_clause_stops_at_where() {
    let req = classify(
      "UPDATE claude.features SET status = 'in_progress', priority = 1 \
       WHERE status = 'planned' RETURNING feature_id",
    )
    .unwrap();
    assert_eq!(req.operation, Operation::Update);
    assert_eq!(req.columns.len(), 2);
    assert_eq!(req.value("status"), Some(&text("in_progress")));
  }

  #[test]
  fn update_with_alias_and_from() {
    let req = classify(
      "UPDATE claude.todos t SET status = 'pending', updated_at = NOW() \
       FROM claude.projects p WHERE t.project_id = p.project_id",
    )
    .unwrap();
    assert_eq!(req.table, "todos");
    assert_eq!(req.value("status"), Some(&text("pending")));
    assert_eq!(req.value("updated_at"), Some(&ColumnValue::Expr("NOW()".into())));
  }

  #[test]
  fn leading_comments_are_skipped() {
    let req = classify("-- create it\n/* note */ INSERT INTO features (status) VALUES ('x')").unwrap();
    assert_eq!(req.table, "features");
  }

  #[test]
  fn unclassifiable_statements() {
    assert_eq!(classify("SELECT * FROM features"), Err(Error::NotAWrite));
    assert_eq!(
      classify("INSERT INTO features SELECT * FROM staging"),
      Err(Error::MissingColumnList)
    );
    assert_eq!(
      classify("INSERT INTO features (status) SELECT status FROM staging"),
      Err(Error::MissingValues)
    );
    assert_eq!(
      classify("INSERT INTO features (status, priority) VALUES ('x')"),
      Err(Error::ColumnCountMismatch { columns: 2, values: 1 })
    );
    assert_eq!(
      classify("INSERT INTO features (status) VALUES ('oops)"),
      Err(Error::UnterminatedLiteral)
    );
    assert_eq!(classify("UPDATE features WHERE x = 1"), Err(Error::MissingSet));
  }

  #[test]
  fn mentions_write_is_a_cheap_prefilter() {
    assert!(crate::mentions_write("update x set y = 1"));
    assert!(!crate::mentions_write("select 1"));
  }
}
