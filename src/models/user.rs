use chrono::{DateTime, Utc};

use serde::{Deserialize, Serialize};

/// Stored user record.  Never serialized, use one of the projections.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
  pub id: i32,
  pub username: String,
  pub email: String,
  pub password: String,
  pub full_name: String,
  pub bio: String,
  pub link: String,
  pub profile_picture: String,
  pub cover_picture: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Fields needed to insert a new user.  `password` is already hashed.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
  pub username: String,
  pub email: String,
  pub password: String,
  pub full_name: String,
}

/// Public profile: the user record minus credentials, plus its derived edges.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
  pub id: i32,
  pub username: String,
  pub email: String,
  pub full_name: String,
  pub bio: String,
  pub link: String,
  pub profile_picture: String,
  pub cover_picture: String,
  pub followers: Vec<i32>,
  pub following: Vec<i32>,
  pub liked_posts: Vec<i32>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Profile {
  pub fn new(user: User, followers: Vec<i32>, following: Vec<i32>, liked_posts: Vec<i32>) -> Self {
    Profile {
      id: user.id,
      username: user.username,
      email: user.email,
      full_name: user.full_name,
      bio: user.bio,
      link: user.link,
      profile_picture: user.profile_picture,
      cover_picture: user.cover_picture,
      followers,
      following,
      liked_posts,
      created_at: user.created_at,
      updated_at: user.updated_at,
    }
  }
}

/// User embedded into posts, comments and suggestions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
  pub id: i32,
  pub username: String,
  pub full_name: String,
  pub bio: String,
  pub link: String,
  pub profile_picture: String,
  pub cover_picture: String,
}

impl From<&User> for UserSummary {
  fn from(user: &User) -> Self {
    UserSummary {
      id: user.id,
      username: user.username.clone(),
      full_name: user.full_name.clone(),
      bio: user.bio.clone(),
      link: user.link.clone(),
      profile_picture: user.profile_picture.clone(),
      cover_picture: user.cover_picture.clone(),
    }
  }
}

/// Result of toggling a follow edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowChange {
  Followed,
  Unfollowed,
}
