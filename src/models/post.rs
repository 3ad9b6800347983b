use chrono::{DateTime, Utc};

use serde::{Deserialize, Serialize};

use crate::models::*;

#[derive(Debug, Clone, PartialEq)]
pub struct Post {
  pub id: i32,
  pub user_id: i32,
  pub text: Option<String>,
  pub image: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewPost {
  pub user_id: i32,
  pub text: Option<String>,
  pub image: Option<String>,
}

/// Post with owner, likes and (some of) its comments populated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostDetails {
  pub id: i32,
  pub user: UserSummary,
  pub text: Option<String>,
  pub image: Option<String>,
  pub likes: Vec<i32>,
  pub comments: Vec<CommentDetails>,
  pub total_comments: usize,
  pub has_more_comments: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Which posts a listing selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
  All,
  /// Posts owned by a user.
  Owner(i32),
  /// Posts liked by a user.
  LikedBy(i32),
  /// Posts owned by users that a user follows.
  FollowedBy(i32),
}

/// Like edge between a post and a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Like {
  pub post_id: i32,
  pub user_id: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeChange {
  Liked,
  Unliked,
}
