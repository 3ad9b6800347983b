use log::*;

use actix_web::{get, post, web, HttpResponse};

use crate::error::*;
use crate::app::*;
use crate::forms::*;
use crate::models::*;

use crate::auth::{pass, SessionKeys};
use crate::db::{populate::*, Store};
use crate::middleware::AuthUser;

/// register new user
#[post("/auth/signup")]
async fn signup(
  cfg: web::Data<AuthService>,
  store: web::Data<dyn Store>,
  keys: web::Data<SessionKeys>,
  register: web::Json<RegisterUser>,
) -> Result<HttpResponse> {
  if !cfg.allow_register {
    return Err(Error::Forbidden("Registration is disabled".to_string()));
  }
  let reg = register.validate()?;

  // Pre-checks for friendly errors, the store still enforces uniqueness.
  if store.user_by_username(reg.username).await?.is_some() {
    return Err(Error::conflict("Username already exists"));
  }
  if store.user_by_email(reg.email).await?.is_some() {
    return Err(Error::conflict("Email already exists"));
  }

  let user = store.insert_user(&NewUser {
    username: reg.username.to_string(),
    email: reg.email.to_string(),
    password: pass::hash_password(reg.password)?,
    full_name: reg.full_name.to_string(),
  }).await?;
  info!("signup: new user id={}", user.id);

  let cookie = keys.session_cookie(user.id)?;
  let profile = populate_profile(store.get_ref(), user).await?;
  Ok(HttpResponse::Created().cookie(cookie).json(profile))
}

/// login user
#[post("/auth/login")]
async fn login(
  store: web::Data<dyn Store>,
  keys: web::Data<SessionKeys>,
  login: web::Json<LoginUser>,
) -> Result<HttpResponse> {
  let (username, password) = login.validate()?;

  let mut user = store.user_by_username(username).await?
    .ok_or_else(|| Error::not_found("User not found"))?;

  let res = pass::check_password(&user.password, password)?;
  debug!("login: user={}, res={:?}", user.id, res);
  if !res.is_valid {
    return Err(Error::Unauthorized("Invalid password".to_string()));
  }
  if res.needs_update {
    // Rehash password.
    user.password = pass::hash_password(password)?;
    store.update_user(&user).await?;
  }

  let cookie = keys.session_cookie(user.id)?;
  Ok(HttpResponse::Ok().cookie(cookie).json(MessageOut::new("Login successful")))
}

/// expire the session cookie
#[post("/auth/logout")]
async fn logout(
  keys: web::Data<SessionKeys>,
) -> HttpResponse {
  HttpResponse::Ok()
    .cookie(keys.removal_cookie())
    .json(MessageOut::new("Logout successful"))
}

/// get current user
#[get("/auth/me")]
async fn me(
  auth: AuthUser,
  store: web::Data<dyn Store>,
) -> Result<HttpResponse> {
  let profile = populate_profile(store.get_ref(), auth.user).await?;
  Ok(HttpResponse::Ok().json(profile))
}

#[derive(Debug, Clone)]
pub struct AuthService {
  pub allow_register: bool,
}

impl super::Service for AuthService {
  fn load_app_config(&mut self, config: &AppConfig, _prefix: &str) -> Result<()> {
    self.allow_register = config.get_bool("auth.allow_register")?.unwrap_or(true);
    Ok(())
  }

  fn api_config(&self, web: &mut web::ServiceConfig) {
    web
      .app_data(web::Data::new(self.clone()))
      .service(signup)
      .service(login)
      .service(logout)
      .service(me);
  }
}

pub fn new_factory() -> AuthService {
  AuthService {
    allow_register: true,
  }
}
