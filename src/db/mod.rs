use std::sync::Arc;

use async_trait::async_trait;

use crate::error::*;
use crate::models::*;

pub mod util;

mod user;
mod post;
mod notification;
pub use self::{
  user::*,
  post::*,
  notification::*,
};

mod service;
pub use service::*;

mod memory;
pub use memory::MemStore;

pub mod populate;

/// Document store behind the route handlers.
///
/// Follow and like edges are single records; `followers`/`following` and
/// `likes`/`likedPosts` are both derived from them.  Toggles and their
/// notification fan-out are one atomic operation.
#[async_trait(?Send)]
pub trait Store {
  async fn prepare(&self) -> Result<()> {
    Ok(())
  }

  // users
  async fn user_by_id(&self, id: i32) -> Result<Option<User>>;
  async fn user_by_username(&self, username: &str) -> Result<Option<User>>;
  async fn user_by_email(&self, email: &str) -> Result<Option<User>>;
  async fn users_by_ids(&self, ids: &[i32]) -> Result<Vec<User>>;
  /// Fails with `Conflict` when the username or email is taken.
  async fn insert_user(&self, user: &NewUser) -> Result<User>;
  /// Fails with `Conflict` when the username or email is taken.
  async fn update_user(&self, user: &User) -> Result<()>;
  /// Uniform random sample of up to `size` users other than `exclude`.
  async fn sample_users(&self, exclude: i32, size: i64) -> Result<Vec<User>>;

  // social graph
  async fn follower_ids(&self, user_id: i32) -> Result<Vec<i32>>;
  async fn following_ids(&self, user_id: i32) -> Result<Vec<i32>>;
  /// Toggle the `actor -> target` edge, a new edge notifies `target`.
  async fn toggle_follow(&self, actor: i32, target: i32) -> Result<FollowChange>;

  // posts
  async fn insert_post(&self, post: &NewPost) -> Result<Post>;
  async fn post_by_id(&self, id: i32) -> Result<Option<Post>>;
  /// Removes the post with its comments and likes.
  async fn delete_post(&self, id: i32) -> Result<u64>;
  /// Newest first, returns the page and the total matching count.
  async fn list_posts(&self, filter: PostFilter, skip: i64, limit: i64) -> Result<(Vec<Post>, i64)>;

  // likes
  /// Toggle the like edge, a new like notifies the post owner.
  async fn toggle_like(&self, actor: i32, post: &Post) -> Result<LikeChange>;
  /// Like edges of the posts in like order.
  async fn likes_for(&self, post_ids: &[i32]) -> Result<Vec<Like>>;
  async fn liked_post_ids(&self, user_id: i32) -> Result<Vec<i32>>;

  // comments
  async fn insert_comment(&self, post_id: i32, user_id: i32, text: &str) -> Result<Comment>;
  /// Comments of the posts in insertion order.
  async fn comments_for(&self, post_ids: &[i32]) -> Result<Vec<Comment>>;

  // notifications
  async fn notifications_for(&self, to: i32) -> Result<Vec<Notification>>;
  async fn mark_notifications_read(&self, to: i32) -> Result<u64>;
  async fn delete_notifications(&self, to: i32) -> Result<u64>;
}

/// Which store each worker opens.
#[derive(Clone)]
pub enum Backend {
  Postgres(String),
  Memory(Arc<MemStore>),
}

pub const MEMORY_URL: &str = "memory://";

impl Backend {
  pub fn from_url(url: &str) -> Self {
    if url.starts_with(MEMORY_URL) {
      Backend::Memory(Arc::new(MemStore::new()))
    } else {
      Backend::Postgres(url.to_string())
    }
  }

  /// Open the store for the current worker.
  ///
  /// Postgres clients are per worker, the memory store is shared.
  pub fn open(&self) -> Arc<dyn Store> {
    match self {
      Backend::Postgres(url) => Arc::new(DbService::new(url)),
      Backend::Memory(store) => store.clone(),
    }
  }
}
