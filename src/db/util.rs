use tokio_postgres::error::SqlState;

use crate::error::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnNote {
  /// Generated by the database, never written.
  Generated,
  None,
}

#[derive(Debug, Clone)]
pub struct ColumnMapper {
  pub name: &'static str,
  pub note: ColumnNote,
}

pub fn column(name: &'static str) -> ColumnMapper {
  ColumnMapper {
    name,
    note: ColumnNote::None,
  }
}

pub fn generated(name: &'static str) -> ColumnMapper {
  ColumnMapper {
    name,
    note: ColumnNote::Generated,
  }
}

#[derive(Debug, Default, Clone)]
pub struct ColumnMappers {
  pub table_name: &'static str,
  pub columns: Vec<ColumnMapper>,
}

impl ColumnMappers {
  fn writable(&self) -> impl Iterator<Item = &ColumnMapper> {
    self.columns.iter().filter(|col| col.note != ColumnNote::Generated)
  }

  /// Comma separated list of all columns, optionally prefixed with a table alias.
  pub fn get_columns(&self, alias: Option<&str>) -> String {
    self.columns.iter().map(|col| {
      match alias {
        Some(alias) => format!("{}.{}", alias, col.name),
        None => col.name.to_string(),
      }
    }).collect::<Vec<String>>().join(", ")
  }

  pub fn build_select_query(&self) -> String {
    format!("SELECT {} FROM {}", self.get_columns(None), self.table_name)
  }

  /// Insert all writable columns, returning the full row.
  pub fn build_insert_query(&self) -> String {
    let (names, values): (Vec<_>, Vec<_>) = self.writable().enumerate()
      .map(|(idx, col)| (col.name, format!("${}", idx + 1)))
      .unzip();
    format!("INSERT INTO {}({}) VALUES({}) RETURNING {}",
      self.table_name, names.join(", "), values.join(", "), self.get_columns(None))
  }

  /// Update all writable columns except `lookup`, which becomes the last parameter.
  pub fn build_update_where(&self, lookup: &str) -> String {
    let sets = self.writable()
      .filter(|col| col.name != lookup)
      .enumerate()
      .map(|(idx, col)| format!("{} = ${}", col.name, idx + 1))
      .collect::<Vec<String>>();
    format!("UPDATE {} SET {} WHERE {} = ${}",
      self.table_name, sets.join(", "), lookup, sets.len() + 1)
  }
}

/// Map a unique constraint violation to a `Conflict` error.
///
/// `messages` maps constraint names to the user facing message.
pub fn map_unique_violation(err: Error, messages: &[(&str, &str)]) -> Error {
  if let Error::PgError { ref source } = err {
    if source.code() == Some(&SqlState::UNIQUE_VIOLATION) {
      let constraint = source.as_db_error().and_then(|db| db.constraint());
      for (name, msg) in messages {
        if constraint == Some(*name) {
          return Error::conflict(*msg);
        }
      }
      return Error::conflict("Already exists");
    }
  }
  err
}

#[cfg(test)]
mod tests {
  use super::*;

  fn mappers() -> ColumnMappers {
    ColumnMappers {
      table_name: "users",
      columns: vec![
        generated("id"),
        column("username"),
        column("email"),
        generated("created_at"),
      ],
    }
  }

  #[test]
  fn select_query() {
    assert_eq!(mappers().build_select_query(),
      "SELECT id, username, email, created_at FROM users");
    assert_eq!(mappers().get_columns(Some("u")), "u.id, u.username, u.email, u.created_at");
  }

  #[test]
  fn insert_query_skips_generated() {
    assert_eq!(mappers().build_insert_query(),
      "INSERT INTO users(username, email) VALUES($1, $2) RETURNING id, username, email, created_at");
  }

  #[test]
  fn update_query_puts_lookup_last() {
    let mut cols = mappers();
    cols.columns[0] = column("id");
    assert_eq!(cols.build_update_where("id"),
      "UPDATE users SET username = $1, email = $2 WHERE id = $3");
  }

  #[test]
  fn other_errors_pass_through() {
    let err = map_unique_violation(Error::validation("x"), &[("users_email_key", "Email")]);
    assert!(matches!(err, Error::Validation(_)));
  }
}
