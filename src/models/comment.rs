use chrono::{DateTime, Utc};

use serde::{Deserialize, Serialize};

use crate::models::*;

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
  pub id: i32,
  pub post_id: i32,
  pub user_id: i32,
  pub text: String,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommentDetails {
  pub id: i32,
  pub user: UserSummary,
  pub text: String,
  pub created_at: DateTime<Utc>,
}
