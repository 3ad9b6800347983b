use log::*;

use actix_web::{delete, get, post, web, HttpResponse};

use crate::error::*;
use crate::app::*;
use crate::forms::*;
use crate::models::*;

use crate::db::{populate::*, Store};
use crate::media::{discard_image, host_image, MediaHost};
use crate::middleware::AuthUser;

async fn load_post(store: &dyn Store, id: i32) -> Result<Post> {
  store.post_by_id(id).await?
    .ok_or_else(|| Error::not_found("Post not found"))
}

async fn one_post(store: &dyn Store, post: Post) -> Result<PostDetails> {
  populate_posts(store, vec![post]).await?
    .pop()
    .ok_or_else(|| Error::not_found("User not found"))
}

/// Run a listing and wrap it with its pagination.
async fn list_page(
  store: &dyn Store,
  filter: PostFilter,
  page: &PageRequest,
) -> Result<HttpResponse> {
  let (posts, total) = store.list_posts(filter, page.skip(), page.limit()).await?;
  let data = populate_posts(store, posts).await?;
  let pagination = Pagination::paged(page, total, data.len());
  Ok(HttpResponse::Ok().json(Paginated::new(data, pagination)))
}

/// create new post
#[post("/posts/create")]
async fn create_post(
  auth: AuthUser,
  store: web::Data<dyn Store>,
  media: web::Data<dyn MediaHost>,
  form: web::Json<CreatePost>,
) -> Result<HttpResponse> {
  form.validate()?;

  let image = match form.image() {
    Some(image) => Some(host_image(media.get_ref(), image).await?),
    None => None,
  };
  let post = store.insert_post(&NewPost {
    user_id: auth.id(),
    text: form.text().map(str::to_string),
    image,
  }).await?;
  info!("create_post: user={} post={}", auth.id(), post.id);

  let post = one_post(store.get_ref(), post).await?;
  Ok(HttpResponse::Created().json(DataOut::new(post)))
}

/// get post by id
#[get("/posts/{id:\\d+}")]
async fn get_post(
  _auth: AuthUser,
  store: web::Data<dyn Store>,
  id: web::Path<i32>,
) -> Result<HttpResponse> {
  let post = load_post(store.get_ref(), id.into_inner()).await?;
  let post = one_post(store.get_ref(), post).await?;
  Ok(HttpResponse::Ok().json(DataOut::new(post)))
}

/// delete own post
#[delete("/posts/{id:\\d+}")]
async fn delete_post(
  auth: AuthUser,
  store: web::Data<dyn Store>,
  media: web::Data<dyn MediaHost>,
  id: web::Path<i32>,
) -> Result<HttpResponse> {
  let post = load_post(store.get_ref(), id.into_inner()).await?;
  if post.user_id != auth.id() {
    return Err(Error::Forbidden("You are not authorized to delete this post".to_string()));
  }

  if let Some(image) = post.image.as_deref() {
    discard_image(media.get_ref(), image).await;
  }
  store.delete_post(post.id).await?;
  info!("delete_post: user={} post={}", auth.id(), post.id);
  Ok(HttpResponse::Ok().json(SuccessOut::new("Post deleted successfully")))
}

/// comment on a post
#[post("/posts/comment/{id}")]
async fn comment_post(
  auth: AuthUser,
  store: web::Data<dyn Store>,
  id: web::Path<i32>,
  form: web::Json<CreateComment>,
) -> Result<HttpResponse> {
  let text = form.validate()?;
  let post = load_post(store.get_ref(), id.into_inner()).await?;

  store.insert_comment(post.id, auth.id(), text).await?;

  let mut comments = store.comments_for(&[post.id]).await?;
  let total = comments.len();
  comments.truncate(COMMENT_PREVIEW);
  let comments = populate_comments(store.get_ref(), comments).await?;
  Ok(HttpResponse::Created().json(CommentsOut::new(comments, total)))
}

/// page through the comments of a post
#[get("/posts/comments/{id}")]
async fn list_comments(
  _auth: AuthUser,
  store: web::Data<dyn Store>,
  id: web::Path<i32>,
  req: web::Query<SkipRequest>,
) -> Result<HttpResponse> {
  let post = load_post(store.get_ref(), id.into_inner()).await?;

  let comments = store.comments_for(&[post.id]).await?;
  let total = comments.len() as i64;
  let page: Vec<Comment> = comments.into_iter()
    .skip(req.skip() as usize)
    .take(req.limit() as usize)
    .collect();
  let data = populate_comments(store.get_ref(), page).await?;
  let pagination = Pagination::skipped(&req, total, data.len());
  Ok(HttpResponse::Ok().json(Paginated::new(data, pagination)))
}

/// like or unlike a post
#[post("/posts/like/{id}")]
async fn like_post(
  auth: AuthUser,
  store: web::Data<dyn Store>,
  id: web::Path<i32>,
) -> Result<HttpResponse> {
  let post = load_post(store.get_ref(), id.into_inner()).await?;

  let change = store.toggle_like(auth.id(), &post).await?;
  debug!("like_post: user={} post={}: {:?}", auth.id(), post.id, change);

  let likes: Vec<i32> = store.likes_for(&[post.id]).await?
    .into_iter()
    .map(|like| like.user_id)
    .collect();
  Ok(HttpResponse::Ok().json(likes))
}

/// all posts
#[get("/posts/all")]
async fn all_posts(
  _auth: AuthUser,
  store: web::Data<dyn Store>,
  req: web::Query<PageRequest>,
) -> Result<HttpResponse> {
  list_page(store.get_ref(), PostFilter::All, &req).await
}

/// posts liked by a user
#[get("/posts/likes/{id}")]
async fn liked_posts(
  _auth: AuthUser,
  store: web::Data<dyn Store>,
  id: web::Path<i32>,
  req: web::Query<PageRequest>,
) -> Result<HttpResponse> {
  let user = store.user_by_id(id.into_inner()).await?
    .ok_or_else(|| Error::not_found("User not found"))?;
  list_page(store.get_ref(), PostFilter::LikedBy(user.id), &req).await
}

/// posts of followed users
#[get("/posts/following")]
async fn following_posts(
  auth: AuthUser,
  store: web::Data<dyn Store>,
  req: web::Query<PageRequest>,
) -> Result<HttpResponse> {
  list_page(store.get_ref(), PostFilter::FollowedBy(auth.id()), &req).await
}

/// posts of a user
#[get("/posts/user/{username}")]
async fn user_posts(
  _auth: AuthUser,
  store: web::Data<dyn Store>,
  username: web::Path<String>,
  req: web::Query<PageRequest>,
) -> Result<HttpResponse> {
  let user = store.user_by_username(&username).await?
    .ok_or_else(|| Error::not_found("User not found"))?;
  list_page(store.get_ref(), PostFilter::Owner(user.id), &req).await
}

#[derive(Debug, Clone, Default)]
pub struct PostService;

impl super::Service for PostService {
  fn load_app_config(&mut self, _config: &AppConfig, _prefix: &str) -> Result<()> {
    Ok(())
  }

  fn api_config(&self, web: &mut web::ServiceConfig) {
    web
      .service(create_post)
      .service(all_posts)
      .service(following_posts)
      .service(liked_posts)
      .service(user_posts)
      .service(list_comments)
      .service(comment_post)
      .service(like_post)
      .service(get_post)
      .service(delete_post);
  }
}

pub fn new_factory() -> PostService {
  Default::default()
}
