use regex::Regex;

use serde::{Deserialize, Serialize};

use crate::error::*;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_USERNAME_LEN: usize = 3;
pub const MAX_USERNAME_LEN: usize = 20;

lazy_static! {
  static ref EMAIL_RE: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
  static ref USERNAME_RE: Regex = Regex::new(r"^[a-zA-Z0-9_]+$").unwrap();
}

/// Empty strings count as "not provided".
fn provided(field: &Option<String>) -> Option<&str> {
  field.as_deref().filter(|s| !s.is_empty())
}

pub fn validate_email(email: &str) -> Result<()> {
  if !EMAIL_RE.is_match(email) {
    return Err(Error::validation("Invalid email format"));
  }
  Ok(())
}

pub fn validate_password(password: &str) -> Result<()> {
  if password.chars().count() < MIN_PASSWORD_LEN {
    return Err(Error::validation("Password must be at least 6 characters long"));
  }
  Ok(())
}

pub fn validate_username(username: &str) -> Result<()> {
  let len = username.chars().count();
  if len < MIN_USERNAME_LEN {
    return Err(Error::validation("Username must be at least 3 characters long"));
  }
  if len > MAX_USERNAME_LEN {
    return Err(Error::validation("Username must be at most 20 characters long"));
  }
  if !USERNAME_RE.is_match(username) {
    return Err(Error::validation(
      "Username can only contain letters, numbers, and underscores"));
  }
  Ok(())
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterUser {
  pub username: Option<String>,
  pub email: Option<String>,
  pub password: Option<String>,
  pub full_name: Option<String>,
}

/// Checked signup fields.
#[derive(Debug, PartialEq)]
pub struct ValidRegistration<'a> {
  pub username: &'a str,
  pub email: &'a str,
  pub password: &'a str,
  pub full_name: &'a str,
}

impl RegisterUser {
  pub fn validate(&self) -> Result<ValidRegistration<'_>> {
    let (username, email, password, full_name) = match (
      provided(&self.username), provided(&self.email),
      provided(&self.password), provided(&self.full_name),
    ) {
      (Some(u), Some(e), Some(p), Some(f)) => (u, e, p, f),
      _ => return Err(Error::validation("All fields are required")),
    };
    validate_email(email)?;
    validate_password(password)?;
    validate_username(username)?;
    Ok(ValidRegistration {
      username,
      email,
      password,
      full_name,
    })
  }
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoginUser {
  pub username: Option<String>,
  pub password: Option<String>,
}

impl LoginUser {
  pub fn validate(&self) -> Result<(&str, &str)> {
    match (provided(&self.username), provided(&self.password)) {
      (Some(username), Some(password)) => Ok((username, password)),
      _ => Err(Error::validation("All fields are required")),
    }
  }
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateUser {
  pub username: Option<String>,
  pub full_name: Option<String>,
  pub email: Option<String>,
  pub current_password: Option<String>,
  pub new_password: Option<String>,
  pub bio: Option<String>,
  pub link: Option<String>,
  pub profile_picture: Option<String>,
  pub cover_picture: Option<String>,
}

impl UpdateUser {
  pub fn username(&self) -> Option<&str> {
    provided(&self.username)
  }

  pub fn full_name(&self) -> Option<&str> {
    provided(&self.full_name)
  }

  pub fn email(&self) -> Option<&str> {
    provided(&self.email)
  }

  pub fn bio(&self) -> Option<&str> {
    provided(&self.bio)
  }

  pub fn link(&self) -> Option<&str> {
    provided(&self.link)
  }

  pub fn profile_picture(&self) -> Option<&str> {
    provided(&self.profile_picture)
  }

  pub fn cover_picture(&self) -> Option<&str> {
    provided(&self.cover_picture)
  }

  /// Requested password change as `(current, new)`.
  ///
  /// Both passwords must be given together.
  pub fn password_change(&self) -> Result<Option<(&str, &str)>> {
    match (provided(&self.current_password), provided(&self.new_password)) {
      (Some(current), Some(new)) => Ok(Some((current, new))),
      (None, None) => Ok(None),
      _ => Err(Error::validation("Please provide both current and new password")),
    }
  }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct MessageOut {
  pub message: String,
}

impl MessageOut {
  pub fn new(message: impl Into<String>) -> Self {
    MessageOut {
      message: message.into(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn register(password: &str) -> RegisterUser {
    RegisterUser {
      username: Some("alice".into()),
      email: Some("a@x.com".into()),
      password: Some(password.into()),
      full_name: Some("Alice A".into()),
    }
  }

  fn message(err: Error) -> String {
    match err {
      Error::Validation(msg) => msg,
      other => panic!("expected validation error, got {:?}", other),
    }
  }

  #[test]
  fn register_password_length() {
    let err = register("abc12").validate().unwrap_err();
    assert_eq!(message(err), "Password must be at least 6 characters long");
    assert!(register("abc123").validate().is_ok());
  }

  #[test]
  fn register_requires_all_fields() {
    let mut req = register("secret1");
    req.full_name = Some(String::new());
    assert_eq!(message(req.validate().unwrap_err()), "All fields are required");

    let req: RegisterUser = serde_json::from_str(r#"{"username":"bob"}"#).unwrap();
    assert_eq!(message(req.validate().unwrap_err()), "All fields are required");
  }

  #[test]
  fn register_email_format() {
    let mut req = register("secret1");
    req.email = Some("not-an-email".into());
    assert_eq!(message(req.validate().unwrap_err()), "Invalid email format");
  }

  #[test]
  fn username_rules() {
    assert!(validate_username("al").is_err());
    assert!(validate_username("a_very_long_username_x").is_err());
    assert!(validate_username("bad name").is_err());
    assert!(validate_username("good_name_1").is_ok());
  }

  #[test]
  fn register_reads_camel_case() {
    let req: RegisterUser = serde_json::from_str(
      r#"{"username":"alice","email":"a@x.com","password":"secret1","fullName":"Alice A"}"#,
    ).unwrap();
    let valid = req.validate().unwrap();
    assert_eq!(valid.full_name, "Alice A");
  }

  #[test]
  fn password_change_needs_both() {
    let mut req = UpdateUser::default();
    assert_eq!(req.password_change().unwrap(), None);

    req.current_password = Some("secret1".into());
    assert_eq!(
      message(req.password_change().unwrap_err()),
      "Please provide both current and new password"
    );

    req.new_password = Some("secret2".into());
    assert_eq!(req.password_change().unwrap(), Some(("secret1", "secret2")));
  }

  #[test]
  fn empty_update_fields_mean_no_change() {
    let req: UpdateUser = serde_json::from_str(r#"{"bio":"","link":null,"fullName":"New"}"#).unwrap();
    assert_eq!(req.bio(), None);
    assert_eq!(req.link(), None);
    assert_eq!(req.full_name(), Some("New"));
  }
}
