//! Expand stored records into the typed projections returned by the API.
use std::collections::{BTreeSet, HashMap};

use crate::error::*;
use crate::models::*;
use crate::forms::COMMENT_PREVIEW;

use super::Store;

async fn users_map(store: &dyn Store, ids: BTreeSet<i32>) -> Result<HashMap<i32, User>> {
  let ids: Vec<i32> = ids.into_iter().collect();
  let users = store.users_by_ids(&ids).await?;
  Ok(users.into_iter().map(|user| (user.id, user)).collect())
}

fn comment_details(users: &HashMap<i32, User>, comments: Vec<Comment>) -> Vec<CommentDetails> {
  // Comments of a removed user are dropped.
  comments.into_iter().filter_map(|comment| {
    users.get(&comment.user_id).map(|user| CommentDetails {
      id: comment.id,
      user: user.into(),
      text: comment.text,
      created_at: comment.created_at,
    })
  }).collect()
}

pub async fn populate_profile(store: &dyn Store, user: User) -> Result<Profile> {
  let followers = store.follower_ids(user.id).await?;
  let following = store.following_ids(user.id).await?;
  let liked_posts = store.liked_post_ids(user.id).await?;
  Ok(Profile::new(user, followers, following, liked_posts))
}

pub async fn populate_comments(store: &dyn Store, comments: Vec<Comment>) -> Result<Vec<CommentDetails>> {
  let users = users_map(store, comments.iter().map(|c| c.user_id).collect()).await?;
  Ok(comment_details(&users, comments))
}

/// Populate owners, likes and the first comments of each post.
pub async fn populate_posts(store: &dyn Store, posts: Vec<Post>) -> Result<Vec<PostDetails>> {
  if posts.is_empty() {
    return Ok(Vec::new());
  }
  let post_ids: Vec<i32> = posts.iter().map(|post| post.id).collect();

  let mut likes: HashMap<i32, Vec<i32>> = HashMap::new();
  for like in store.likes_for(&post_ids).await? {
    likes.entry(like.post_id).or_default().push(like.user_id);
  }

  let mut comments: HashMap<i32, Vec<Comment>> = HashMap::new();
  for comment in store.comments_for(&post_ids).await? {
    comments.entry(comment.post_id).or_default().push(comment);
  }

  let mut user_ids: BTreeSet<i32> = posts.iter().map(|post| post.user_id).collect();
  for list in comments.values() {
    user_ids.extend(list.iter().take(COMMENT_PREVIEW).map(|c| c.user_id));
  }
  let users = users_map(store, user_ids).await?;

  let details = posts.into_iter().filter_map(|post| {
    let owner = users.get(&post.user_id)?;
    let mut post_comments = comments.remove(&post.id).unwrap_or_default();
    let total_comments = post_comments.len();
    post_comments.truncate(COMMENT_PREVIEW);
    Some(PostDetails {
      id: post.id,
      user: owner.into(),
      text: post.text,
      image: post.image,
      likes: likes.remove(&post.id).unwrap_or_default(),
      comments: comment_details(&users, post_comments),
      total_comments,
      has_more_comments: total_comments > COMMENT_PREVIEW,
      created_at: post.created_at,
      updated_at: post.updated_at,
    })
  }).collect();
  Ok(details)
}

pub async fn populate_notifications(
  store: &dyn Store,
  notifications: Vec<Notification>,
) -> Result<Vec<NotificationDetails>> {
  let users = users_map(store, notifications.iter().map(|n| n.from_id).collect()).await?;
  Ok(notifications.into_iter().map(|n| NotificationDetails {
    id: n.id,
    from: users.get(&n.from_id).map(Sender::from),
    to: n.to_id,
    kind: n.kind,
    read: n.read,
    created_at: n.created_at,
  }).collect())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::MemStore;

  async fn user(store: &MemStore, name: &str) -> User {
    store.insert_user(&NewUser {
      username: name.to_string(),
      email: format!("{}@example.com", name),
      password: "hash".to_string(),
      full_name: name.to_string(),
    }).await.unwrap()
  }

  #[actix_rt::test]
  async fn posts_carry_comment_preview() {
    let store = MemStore::new();
    let alice = user(&store, "alice").await;
    let bob = user(&store, "bob").await;
    let post = store.insert_post(&NewPost {
      user_id: alice.id,
      text: Some("hello".to_string()),
      image: None,
    }).await.unwrap();
    for idx in 0..4 {
      store.insert_comment(post.id, bob.id, &format!("c{}", idx)).await.unwrap();
    }
    store.toggle_like(bob.id, &post).await.unwrap();

    let details = populate_posts(&store, vec![post]).await.unwrap();
    assert_eq!(details.len(), 1);
    let post = &details[0];
    assert_eq!(post.user.username, "alice");
    assert_eq!(post.likes, vec![bob.id]);
    assert_eq!(post.total_comments, 4);
    assert!(post.has_more_comments);
    let texts: Vec<&str> = post.comments.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["c0", "c1", "c2"]);
    assert_eq!(post.comments[0].user.username, "bob");
  }

  #[actix_rt::test]
  async fn profile_derives_edges() {
    let store = MemStore::new();
    let alice = user(&store, "alice").await;
    let bob = user(&store, "bob").await;
    store.toggle_follow(bob.id, alice.id).await.unwrap();

    let profile = populate_profile(&store, alice.clone()).await.unwrap();
    assert_eq!(profile.followers, vec![bob.id]);
    assert!(profile.following.is_empty());

    let value = serde_json::to_value(&profile).unwrap();
    assert!(value.get("password").is_none());
    assert_eq!(value["fullName"], "alice");
  }

  #[actix_rt::test]
  async fn notifications_carry_sender() {
    let store = MemStore::new();
    let alice = user(&store, "alice").await;
    let bob = user(&store, "bob").await;
    store.toggle_follow(bob.id, alice.id).await.unwrap();

    let list = store.notifications_for(alice.id).await.unwrap();
    let details = populate_notifications(&store, list).await.unwrap();
    let from = details[0].from.as_ref().unwrap();
    assert_eq!(from.username, "bob");
    assert_eq!(details[0].kind, NotificationKind::Follow);
  }
}
