use log::*;

use futures::future::LocalBoxFuture;

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};

use crate::auth::*;
use crate::db::Store;
use crate::error::*;
use crate::models::User;

/// The caller resolved from the session cookie.
///
/// Taking `AuthUser` as a handler argument makes the route require a
/// valid session; the handler never runs otherwise.
#[derive(Debug, Clone)]
pub struct AuthUser {
  pub user: User,
}

impl AuthUser {
  pub fn id(&self) -> i32 {
    self.user.id
  }
}

fn session_token(req: &HttpRequest) -> Option<String> {
  req.cookie(SESSION_COOKIE)
    .map(|cookie| cookie.value().to_string())
    .filter(|token| !token.is_empty())
}

pub async fn authenticate(req: &HttpRequest) -> Result<AuthUser> {
  let token = session_token(req)
    .ok_or_else(|| Error::Unauthorized("Unauthorized: No token provided".to_string()))?;

  let keys = req.app_data::<web::Data<SessionKeys>>()
    .ok_or(Error::InternalServerError)?;
  let auth = keys.decode_jwt(&token).map_err(|err| {
    debug!("Rejected session token: {}", err);
    Error::Unauthorized("Unauthorized: Invalid token".to_string())
  })?;

  let store = req.app_data::<web::Data<dyn Store>>()
    .ok_or(Error::InternalServerError)?;
  let user = store.user_by_id(auth.user_id).await?
    .ok_or_else(|| Error::not_found("User not found"))?;

  Ok(AuthUser { user })
}

impl FromRequest for AuthUser {
  type Error = actix_web::Error;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
    let req = req.clone();
    Box::pin(async move {
      authenticate(&req).await.map_err(actix_web::Error::from)
    })
  }
}
