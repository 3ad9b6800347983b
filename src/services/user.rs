use log::*;

use actix_web::{get, post, web, HttpResponse};

use crate::error::*;
use crate::app::*;
use crate::forms::*;
use crate::models::*;

use crate::auth::pass;
use crate::db::{populate::*, Store};
use crate::media::{discard_image, host_image, MediaHost};
use crate::middleware::AuthUser;

/// Number of users sampled before dropping the ones already followed.
const SUGGEST_SAMPLE: i64 = 10;
const SUGGEST_COUNT: usize = 4;

/// Picture changes of one update.  Old pictures are only removed once the
/// user record is stored, new uploads are removed if storing fails.
#[derive(Default)]
struct PictureSwap {
  uploaded: Vec<String>,
  replaced: Vec<String>,
}

impl PictureSwap {
  /// Host `value` for the `current` picture slot.
  ///
  /// Sending back the currently stored URL keeps the picture.
  async fn replace(&mut self, media: &dyn MediaHost, current: &mut String, value: &str) -> Result<()> {
    if value == current.as_str() {
      return Ok(());
    }
    let url = host_image(media, value).await?;
    self.uploaded.push(url.clone());
    let old = std::mem::replace(current, url);
    if !old.is_empty() {
      self.replaced.push(old);
    }
    Ok(())
  }

  async fn finish(self, media: &dyn MediaHost, stored: bool) {
    let stale = if stored { self.replaced } else { self.uploaded };
    for url in stale {
      discard_image(media, &url).await;
    }
  }
}

/// get public profile
#[get("/users/profile/{username}")]
async fn profile(
  _auth: AuthUser,
  store: web::Data<dyn Store>,
  username: web::Path<String>,
) -> Result<HttpResponse> {
  let user = store.user_by_username(&username).await?
    .ok_or_else(|| Error::not_found("User not found"))?;
  let profile = populate_profile(store.get_ref(), user).await?;
  Ok(HttpResponse::Ok().json(profile))
}

/// suggest users to follow
#[get("/users/suggested")]
async fn suggested(
  auth: AuthUser,
  store: web::Data<dyn Store>,
) -> Result<HttpResponse> {
  let following = store.following_ids(auth.id()).await?;
  let users = store.sample_users(auth.id(), SUGGEST_SAMPLE).await?;

  let suggested: Vec<UserSummary> = users.iter()
    .filter(|user| !following.contains(&user.id))
    .take(SUGGEST_COUNT)
    .map(UserSummary::from)
    .collect();
  Ok(HttpResponse::Ok().json(suggested))
}

/// follow or unfollow a user
#[post("/users/follow/{id}")]
async fn follow(
  auth: AuthUser,
  store: web::Data<dyn Store>,
  id: web::Path<i32>,
) -> Result<HttpResponse> {
  let target = id.into_inner();
  if target == auth.id() {
    return Err(Error::validation("You cannot follow/unfollow yourself"));
  }
  if store.user_by_id(target).await?.is_none() {
    return Err(Error::not_found("User not found"));
  }

  let message = match store.toggle_follow(auth.id(), target).await? {
    FollowChange::Followed => "Followed successfully",
    FollowChange::Unfollowed => "Unfollowed successfully",
  };
  debug!("follow: {} -> {}: {}", auth.id(), target, message);
  Ok(HttpResponse::Ok().json(MessageOut::new(message)))
}

/// update own profile
#[post("/users/update")]
async fn update(
  auth: AuthUser,
  store: web::Data<dyn Store>,
  media: web::Data<dyn MediaHost>,
  form: web::Json<UpdateUser>,
) -> Result<HttpResponse> {
  let mut user = auth.user;

  if let Some(username) = form.username() {
    validate_username(username)?;
    if let Some(other) = store.user_by_username(username).await? {
      if other.id != user.id {
        return Err(Error::conflict("Username already exists"));
      }
    }
    user.username = username.to_string();
  }

  if let Some((current, new)) = form.password_change()? {
    if !pass::check_password(&user.password, current)?.is_valid {
      return Err(Error::validation("Current password is incorrect"));
    }
    validate_password(new)?;
    user.password = pass::hash_password(new)?;
  }

  if let Some(email) = form.email() {
    validate_email(email)?;
    if let Some(other) = store.user_by_email(email).await? {
      if other.id != user.id {
        return Err(Error::conflict("Email already exists"));
      }
    }
    user.email = email.to_string();
  }

  let mut pictures = PictureSwap::default();
  if let Some(picture) = form.profile_picture() {
    if let Err(err) = pictures.replace(media.get_ref(), &mut user.profile_picture, picture).await {
      pictures.finish(media.get_ref(), false).await;
      return Err(err);
    }
  }
  if let Some(picture) = form.cover_picture() {
    if let Err(err) = pictures.replace(media.get_ref(), &mut user.cover_picture, picture).await {
      pictures.finish(media.get_ref(), false).await;
      return Err(err);
    }
  }

  if let Some(full_name) = form.full_name() {
    user.full_name = full_name.to_string();
  }
  if let Some(bio) = form.bio() {
    user.bio = bio.to_string();
  }
  if let Some(link) = form.link() {
    user.link = link.to_string();
  }

  let stored = store.update_user(&user).await;
  pictures.finish(media.get_ref(), stored.is_ok()).await;
  stored?;
  info!("update: user id={} updated", user.id);
  Ok(HttpResponse::Ok().json(MessageOut::new("Profile updated successfully")))
}

#[derive(Debug, Clone, Default)]
pub struct UserService;

impl super::Service for UserService {
  fn load_app_config(&mut self, _config: &AppConfig, _prefix: &str) -> Result<()> {
    Ok(())
  }

  fn api_config(&self, web: &mut web::ServiceConfig) {
    web
      .service(profile)
      .service(suggested)
      .service(follow)
      .service(update);
  }
}

pub fn new_factory() -> UserService {
  Default::default()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::media::{public_id_from_url, DiskMedia};

  const PNG: &str = "data:image/png;base64,iVBORw0KGgo=";

  fn exists(dir: &std::path::Path, url: &str) -> bool {
    let id = public_id_from_url(url).unwrap();
    dir.join(format!("{}.png", id)).exists()
  }

  #[actix_rt::test]
  async fn failed_update_keeps_old_picture() {
    let dir = tempfile::tempdir().unwrap();
    let media = DiskMedia::new(dir.path(), "/media");
    let old = media.upload(PNG).await.unwrap();

    let mut current = old.clone();
    let mut pictures = PictureSwap::default();
    pictures.replace(&media, &mut current, PNG).await.unwrap();
    assert_ne!(current, old);
    pictures.finish(&media, false).await;

    assert!(exists(dir.path(), &old));
    assert!(!exists(dir.path(), &current));
  }

  #[actix_rt::test]
  async fn stored_update_removes_old_picture() {
    let dir = tempfile::tempdir().unwrap();
    let media = DiskMedia::new(dir.path(), "/media");
    let old = media.upload(PNG).await.unwrap();

    let mut current = old.clone();
    let mut pictures = PictureSwap::default();
    pictures.replace(&media, &mut current, PNG).await.unwrap();
    pictures.finish(&media, true).await;

    assert!(!exists(dir.path(), &old));
    assert!(exists(dir.path(), &current));
  }

  #[actix_rt::test]
  async fn unchanged_picture_is_kept() {
    let dir = tempfile::tempdir().unwrap();
    let media = DiskMedia::new(dir.path(), "/media");
    let old = media.upload(PNG).await.unwrap();

    let mut current = old.clone();
    let mut pictures = PictureSwap::default();
    pictures.replace(&media, &mut current, &old).await.unwrap();
    pictures.finish(&media, true).await;

    assert_eq!(current, old);
    assert!(exists(dir.path(), &old));
  }
}
