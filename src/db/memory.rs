use log::*;

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use rand::seq::SliceRandom;

use crate::error::*;
use crate::models::*;

use super::Store;

/// Follow edge, `follows` is kept in insertion order.
#[derive(Debug, Clone, Copy)]
struct Edge {
  from: i32,
  to: i32,
}

#[derive(Default)]
struct MemState {
  last_id: i32,
  users: BTreeMap<i32, User>,
  follows: Vec<Edge>,
  posts: BTreeMap<i32, Post>,
  likes: Vec<Like>,
  comments: Vec<Comment>,
  notifications: Vec<Notification>,
}

impl MemState {
  /// Ids are shared by all tables, like a single sequence.
  fn next_id(&mut self) -> i32 {
    self.last_id += 1;
    self.last_id
  }

  fn check_unique(&self, id: i32, username: &str, email: &str) -> Result<()> {
    for user in self.users.values().filter(|user| user.id != id) {
      if user.username == username {
        return Err(Error::conflict("Username already exists"));
      }
      if user.email == email {
        return Err(Error::conflict("Email already exists"));
      }
    }
    Ok(())
  }

  fn notify(&mut self, from_id: i32, to_id: i32, kind: NotificationKind) {
    let id = self.next_id();
    self.notifications.push(Notification {
      id,
      from_id,
      to_id,
      kind,
      read: false,
      created_at: Utc::now(),
    });
  }
}

/// Process local store used for development and tests.
///
/// Shared by all workers, every operation holds the lock for its whole
/// duration so toggles are atomic like their SQL counterparts.
#[derive(Default)]
pub struct MemStore {
  state: Mutex<MemState>,
}

impl MemStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn state(&self) -> Result<MutexGuard<'_, MemState>> {
    self.state.lock()
      .map_err(|_| anyhow!("memory store lock poisoned").into())
  }
}

fn newest_first(a: &Post, b: &Post) -> std::cmp::Ordering {
  b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id))
}

#[async_trait(?Send)]
impl Store for MemStore {
  async fn prepare(&self) -> Result<()> {
    info!("MemStore: ready.");
    Ok(())
  }

  async fn user_by_id(&self, id: i32) -> Result<Option<User>> {
    Ok(self.state()?.users.get(&id).cloned())
  }

  async fn user_by_username(&self, username: &str) -> Result<Option<User>> {
    let state = self.state()?;
    Ok(state.users.values().find(|user| user.username == username).cloned())
  }

  async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
    let state = self.state()?;
    Ok(state.users.values().find(|user| user.email == email).cloned())
  }

  async fn users_by_ids(&self, ids: &[i32]) -> Result<Vec<User>> {
    let state = self.state()?;
    Ok(ids.iter().filter_map(|id| state.users.get(id).cloned()).collect())
  }

  async fn insert_user(&self, user: &NewUser) -> Result<User> {
    let mut state = self.state()?;
    state.check_unique(0, &user.username, &user.email)?;
    let now = Utc::now();
    let user = User {
      id: state.next_id(),
      username: user.username.clone(),
      email: user.email.clone(),
      password: user.password.clone(),
      full_name: user.full_name.clone(),
      bio: String::new(),
      link: String::new(),
      profile_picture: String::new(),
      cover_picture: String::new(),
      created_at: now,
      updated_at: now,
    };
    state.users.insert(user.id, user.clone());
    Ok(user)
  }

  async fn update_user(&self, user: &User) -> Result<()> {
    let mut state = self.state()?;
    state.check_unique(user.id, &user.username, &user.email)?;
    if let Some(stored) = state.users.get_mut(&user.id) {
      *stored = User {
        created_at: stored.created_at,
        updated_at: Utc::now(),
        ..user.clone()
      };
    }
    Ok(())
  }

  async fn sample_users(&self, exclude: i32, size: i64) -> Result<Vec<User>> {
    let state = self.state()?;
    let others: Vec<&User> = state.users.values().filter(|user| user.id != exclude).collect();
    let size = size.max(0) as usize;
    Ok(others.choose_multiple(&mut rand::thread_rng(), size).map(|user| (*user).clone()).collect())
  }

  async fn follower_ids(&self, user_id: i32) -> Result<Vec<i32>> {
    let state = self.state()?;
    Ok(state.follows.iter().filter(|edge| edge.to == user_id).map(|edge| edge.from).collect())
  }

  async fn following_ids(&self, user_id: i32) -> Result<Vec<i32>> {
    let state = self.state()?;
    Ok(state.follows.iter().filter(|edge| edge.from == user_id).map(|edge| edge.to).collect())
  }

  async fn toggle_follow(&self, actor: i32, target: i32) -> Result<FollowChange> {
    if actor == target {
      return Err(Error::validation("You cannot follow/unfollow yourself"));
    }
    let mut state = self.state()?;
    let before = state.follows.len();
    state.follows.retain(|edge| !(edge.from == actor && edge.to == target));
    if state.follows.len() < before {
      return Ok(FollowChange::Unfollowed);
    }
    state.follows.push(Edge { from: actor, to: target });
    state.notify(actor, target, NotificationKind::Follow);
    Ok(FollowChange::Followed)
  }

  async fn insert_post(&self, post: &NewPost) -> Result<Post> {
    let mut state = self.state()?;
    let now = Utc::now();
    let post = Post {
      id: state.next_id(),
      user_id: post.user_id,
      text: post.text.clone(),
      image: post.image.clone(),
      created_at: now,
      updated_at: now,
    };
    state.posts.insert(post.id, post.clone());
    Ok(post)
  }

  async fn post_by_id(&self, id: i32) -> Result<Option<Post>> {
    Ok(self.state()?.posts.get(&id).cloned())
  }

  async fn delete_post(&self, id: i32) -> Result<u64> {
    let mut state = self.state()?;
    if state.posts.remove(&id).is_none() {
      return Ok(0);
    }
    state.likes.retain(|like| like.post_id != id);
    state.comments.retain(|comment| comment.post_id != id);
    Ok(1)
  }

  async fn list_posts(&self, filter: PostFilter, skip: i64, limit: i64) -> Result<(Vec<Post>, i64)> {
    let state = self.state()?;
    let mut posts: Vec<&Post> = match filter {
      PostFilter::All => state.posts.values().collect(),
      PostFilter::Owner(user_id) => {
        state.posts.values().filter(|post| post.user_id == user_id).collect()
      },
      PostFilter::LikedBy(user_id) => {
        state.likes.iter()
          .filter(|like| like.user_id == user_id)
          .filter_map(|like| state.posts.get(&like.post_id))
          .collect()
      },
      PostFilter::FollowedBy(user_id) => {
        let following: Vec<i32> = state.follows.iter()
          .filter(|edge| edge.from == user_id)
          .map(|edge| edge.to)
          .collect();
        state.posts.values().filter(|post| following.contains(&post.user_id)).collect()
      },
    };
    posts.sort_by(|a, b| newest_first(a, b));
    let total = posts.len() as i64;
    let page = posts.into_iter()
      .skip(skip.max(0) as usize)
      .take(limit.max(0) as usize)
      .cloned()
      .collect();
    Ok((page, total))
  }

  async fn toggle_like(&self, actor: i32, post: &Post) -> Result<LikeChange> {
    let mut state = self.state()?;
    let before = state.likes.len();
    state.likes.retain(|like| !(like.post_id == post.id && like.user_id == actor));
    if state.likes.len() < before {
      return Ok(LikeChange::Unliked);
    }
    state.likes.push(Like { post_id: post.id, user_id: actor });
    state.notify(actor, post.user_id, NotificationKind::Like);
    Ok(LikeChange::Liked)
  }

  async fn likes_for(&self, post_ids: &[i32]) -> Result<Vec<Like>> {
    let state = self.state()?;
    Ok(state.likes.iter().filter(|like| post_ids.contains(&like.post_id)).copied().collect())
  }

  async fn liked_post_ids(&self, user_id: i32) -> Result<Vec<i32>> {
    let state = self.state()?;
    Ok(state.likes.iter().filter(|like| like.user_id == user_id).map(|like| like.post_id).collect())
  }

  async fn insert_comment(&self, post_id: i32, user_id: i32, text: &str) -> Result<Comment> {
    let mut state = self.state()?;
    if !state.posts.contains_key(&post_id) {
      return Err(Error::not_found("Post not found"));
    }
    let comment = Comment {
      id: state.next_id(),
      post_id,
      user_id,
      text: text.to_string(),
      created_at: Utc::now(),
    };
    state.comments.push(comment.clone());
    Ok(comment)
  }

  async fn comments_for(&self, post_ids: &[i32]) -> Result<Vec<Comment>> {
    let state = self.state()?;
    Ok(state.comments.iter().filter(|comment| post_ids.contains(&comment.post_id)).cloned().collect())
  }

  async fn notifications_for(&self, to: i32) -> Result<Vec<Notification>> {
    let state = self.state()?;
    Ok(state.notifications.iter().filter(|n| n.to_id == to).cloned().collect())
  }

  async fn mark_notifications_read(&self, to: i32) -> Result<u64> {
    let mut state = self.state()?;
    let mut count = 0;
    for n in state.notifications.iter_mut().filter(|n| n.to_id == to && !n.read) {
      n.read = true;
      count += 1;
    }
    Ok(count)
  }

  async fn delete_notifications(&self, to: i32) -> Result<u64> {
    let mut state = self.state()?;
    let before = state.notifications.len();
    state.notifications.retain(|n| n.to_id != to);
    Ok((before - state.notifications.len()) as u64)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn new_user(name: &str) -> NewUser {
    NewUser {
      username: name.to_string(),
      email: format!("{}@example.com", name),
      password: "hash".to_string(),
      full_name: name.to_uppercase(),
    }
  }

  async fn post_by(store: &MemStore, user_id: i32, text: &str) -> Post {
    store.insert_post(&NewPost {
      user_id,
      text: Some(text.to_string()),
      image: None,
    }).await.unwrap()
  }

  #[actix_rt::test]
  async fn unique_username_and_email() {
    let store = MemStore::new();
    store.insert_user(&new_user("alice")).await.unwrap();

    let err = store.insert_user(&new_user("alice")).await.unwrap_err();
    assert!(matches!(err, Error::Conflict(ref msg) if msg == "Username already exists"));

    let mut other = new_user("bob");
    other.email = "alice@example.com".to_string();
    let err = store.insert_user(&other).await.unwrap_err();
    assert!(matches!(err, Error::Conflict(ref msg) if msg == "Email already exists"));
  }

  #[actix_rt::test]
  async fn update_keeps_own_username() {
    let store = MemStore::new();
    let mut alice = store.insert_user(&new_user("alice")).await.unwrap();
    let bob = store.insert_user(&new_user("bob")).await.unwrap();

    alice.bio = "hello".to_string();
    store.update_user(&alice).await.unwrap();
    assert_eq!(store.user_by_id(alice.id).await.unwrap().unwrap().bio, "hello");

    alice.username = bob.username.clone();
    assert!(matches!(store.update_user(&alice).await, Err(Error::Conflict(_))));
  }

  #[actix_rt::test]
  async fn follow_edges_are_symmetric() {
    let store = MemStore::new();
    let a = store.insert_user(&new_user("alice")).await.unwrap();
    let b = store.insert_user(&new_user("bob")).await.unwrap();

    assert_eq!(store.toggle_follow(a.id, b.id).await.unwrap(), FollowChange::Followed);
    assert_eq!(store.following_ids(a.id).await.unwrap(), vec![b.id]);
    assert_eq!(store.follower_ids(b.id).await.unwrap(), vec![a.id]);

    let notes = store.notifications_for(b.id).await.unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].kind, NotificationKind::Follow);
    assert_eq!(notes[0].from_id, a.id);

    assert_eq!(store.toggle_follow(a.id, b.id).await.unwrap(), FollowChange::Unfollowed);
    assert!(store.following_ids(a.id).await.unwrap().is_empty());
    assert!(store.follower_ids(b.id).await.unwrap().is_empty());
    // unfollow does not notify
    assert_eq!(store.notifications_for(b.id).await.unwrap().len(), 1);
  }

  #[actix_rt::test]
  async fn self_follow_is_rejected() {
    let store = MemStore::new();
    let a = store.insert_user(&new_user("alice")).await.unwrap();
    assert!(matches!(store.toggle_follow(a.id, a.id).await, Err(Error::Validation(_))));
  }

  #[actix_rt::test]
  async fn like_toggle_parity() {
    let store = MemStore::new();
    let a = store.insert_user(&new_user("alice")).await.unwrap();
    let b = store.insert_user(&new_user("bob")).await.unwrap();
    let post = post_by(&store, a.id, "hi").await;

    for round in 1..=5 {
      store.toggle_like(b.id, &post).await.unwrap();
      let liked = round % 2 == 1;
      let likes = store.likes_for(&[post.id]).await.unwrap();
      assert_eq!(likes.len(), if liked { 1 } else { 0 });
      assert_eq!(store.liked_post_ids(b.id).await.unwrap().contains(&post.id), liked);
    }
    // one notification per new like
    assert_eq!(store.notifications_for(a.id).await.unwrap().len(), 3);
  }

  #[actix_rt::test]
  async fn listing_is_newest_first_and_paged() {
    let store = MemStore::new();
    let a = store.insert_user(&new_user("alice")).await.unwrap();
    let b = store.insert_user(&new_user("bob")).await.unwrap();
    let mut ids = Vec::new();
    for idx in 0..5 {
      ids.push(post_by(&store, a.id, &format!("post {}", idx)).await.id);
    }
    post_by(&store, b.id, "other").await;

    let (page, total) = store.list_posts(PostFilter::Owner(a.id), 0, 2).await.unwrap();
    assert_eq!(total, 5);
    assert_eq!(page.iter().map(|p| p.id).collect::<Vec<_>>(), vec![ids[4], ids[3]]);

    let (page, _) = store.list_posts(PostFilter::Owner(a.id), 4, 2).await.unwrap();
    assert_eq!(page.len(), 1);

    let (_, total) = store.list_posts(PostFilter::All, 0, 10).await.unwrap();
    assert_eq!(total, 6);

    store.toggle_follow(b.id, a.id).await.unwrap();
    let (_, total) = store.list_posts(PostFilter::FollowedBy(b.id), 0, 10).await.unwrap();
    assert_eq!(total, 5);
  }

  #[actix_rt::test]
  async fn delete_post_removes_likes_and_comments() {
    let store = MemStore::new();
    let a = store.insert_user(&new_user("alice")).await.unwrap();
    let post = post_by(&store, a.id, "bye").await;
    store.toggle_like(a.id, &post).await.unwrap();
    store.insert_comment(post.id, a.id, "first").await.unwrap();

    assert_eq!(store.delete_post(post.id).await.unwrap(), 1);
    assert!(store.post_by_id(post.id).await.unwrap().is_none());
    assert!(store.likes_for(&[post.id]).await.unwrap().is_empty());
    assert!(store.comments_for(&[post.id]).await.unwrap().is_empty());
    assert!(store.liked_post_ids(a.id).await.unwrap().is_empty());
    assert_eq!(store.delete_post(post.id).await.unwrap(), 0);
  }

  #[actix_rt::test]
  async fn notifications_mark_and_clear() {
    let store = MemStore::new();
    let a = store.insert_user(&new_user("alice")).await.unwrap();
    let b = store.insert_user(&new_user("bob")).await.unwrap();
    store.toggle_follow(a.id, b.id).await.unwrap();

    assert_eq!(store.mark_notifications_read(b.id).await.unwrap(), 1);
    assert!(store.notifications_for(b.id).await.unwrap()[0].read);
    assert_eq!(store.mark_notifications_read(b.id).await.unwrap(), 0);

    assert_eq!(store.delete_notifications(b.id).await.unwrap(), 1);
    assert!(store.notifications_for(b.id).await.unwrap().is_empty());
  }
}
