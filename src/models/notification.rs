use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use serde::{Deserialize, Serialize};

use crate::models::*;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
  Follow,
  Like,
  // Valid stored value, nothing creates it yet.
  Comment,
}

impl NotificationKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      NotificationKind::Follow => "follow",
      NotificationKind::Like => "like",
      NotificationKind::Comment => "comment",
    }
  }
}

impl fmt::Display for NotificationKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for NotificationKind {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "follow" => Ok(NotificationKind::Follow),
      "like" => Ok(NotificationKind::Like),
      "comment" => Ok(NotificationKind::Comment),
      other => Err(format!("unknown notification type: {}", other)),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
  pub id: i32,
  pub from_id: i32,
  pub to_id: i32,
  pub kind: NotificationKind,
  pub read: bool,
  pub created_at: DateTime<Utc>,
}

/// Sender projection attached to listed notifications.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Sender {
  pub id: i32,
  pub username: String,
  pub profile_picture: String,
}

impl From<&User> for Sender {
  fn from(user: &User) -> Self {
    Sender {
      id: user.id,
      username: user.username.clone(),
      profile_picture: user.profile_picture.clone(),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDetails {
  pub id: i32,
  /// `None` when the sender has been removed.
  pub from: Option<Sender>,
  pub to: i32,
  #[serde(rename = "type")]
  pub kind: NotificationKind,
  pub read: bool,
  pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn kind_round_trips_through_text() {
    for kind in [NotificationKind::Follow, NotificationKind::Like, NotificationKind::Comment] {
      assert_eq!(kind.as_str().parse::<NotificationKind>(), Ok(kind));
    }
    assert!("mention".parse::<NotificationKind>().is_err());
  }

  #[test]
  fn kind_serializes_as_type_field() {
    let details = NotificationDetails {
      id: 1,
      from: None,
      to: 2,
      kind: NotificationKind::Like,
      read: false,
      created_at: Utc::now(),
    };
    let value = serde_json::to_value(&details).unwrap();
    assert_eq!(value["type"], "like");
    assert_eq!(value["read"], false);
  }
}
