use serde::{Deserialize, Serialize};

use chrono::Utc;

use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};

use jsonwebtoken::{
  encode, Header, EncodingKey,
  decode, DecodingKey,
  Validation
};

use crate::app::AppConfig;
use crate::error::*;

pub const SESSION_COOKIE: &str = "jwt";
pub const DEFAULT_SESSION_DAYS: i64 = 30;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct AuthData {
  pub user_id: i32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
  pub user_id: i32,
  pub iat: i64,
  pub exp: i64,
}

/// Signs and verifies session tokens and builds the session cookie.
#[derive(Clone)]
pub struct SessionKeys {
  encoding: EncodingKey,
  decoding: DecodingKey,
  days: i64,
  secure: bool,
}

impl SessionKeys {
  pub fn new(secret: &str, days: i64, secure: bool) -> Self {
    Self {
      encoding: EncodingKey::from_secret(secret.as_bytes()),
      decoding: DecodingKey::from_secret(secret.as_bytes()),
      days,
      secure,
    }
  }

  pub fn from_config(config: &AppConfig) -> Result<Self> {
    let secret = config.require_str("auth.jwt_secret")?;
    let days = config.get_int("auth.session_days")?.unwrap_or(DEFAULT_SESSION_DAYS);
    let secure = config.get_bool("auth.secure_cookie")?.unwrap_or(true);
    Ok(Self::new(&secret, days, secure))
  }

  pub fn generate_jwt(&self, user_id: i32) -> Result<String> {
    let now = Utc::now();
    let claims = Claims{
      user_id,
      iat: now.timestamp(),
      exp: (now + chrono::Duration::days(self.days)).timestamp(),
    };

    let token = encode(&Header::default(), &claims, &self.encoding)?;

    Ok(token)
  }

  pub fn decode_jwt(&self, token: &str) -> Result<AuthData> {
    let token_data = decode::<Claims>(token, &self.decoding, &Validation::default())?;
    Ok(AuthData{
      user_id: token_data.claims.user_id,
    })
  }

  /// Session cookie carrying a fresh token for `user_id`.
  pub fn session_cookie(&self, user_id: i32) -> Result<Cookie<'static>> {
    let token = self.generate_jwt(user_id)?;
    Ok(Cookie::build(SESSION_COOKIE, token)
      .path("/")
      .http_only(true)
      .same_site(SameSite::Strict)
      .secure(self.secure)
      .max_age(CookieDuration::days(self.days))
      .finish())
  }

  /// Cookie that expires the session immediately.
  pub fn removal_cookie(&self) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, "")
      .path("/")
      .http_only(true)
      .same_site(SameSite::Strict)
      .secure(self.secure)
      .max_age(CookieDuration::ZERO)
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn token_round_trip() {
    let keys = SessionKeys::new("test-secret", 30, false);
    let token = keys.generate_jwt(42).unwrap();
    let auth = keys.decode_jwt(&token).unwrap();
    assert_eq!(auth.user_id, 42);
  }

  #[test]
  fn wrong_secret_is_rejected() {
    let token = SessionKeys::new("one", 30, false).generate_jwt(1).unwrap();
    assert!(SessionKeys::new("two", 30, false).decode_jwt(&token).is_err());
    assert!(SessionKeys::new("one", 30, false).decode_jwt("garbage").is_err());
  }

  #[test]
  fn expired_token_is_rejected() {
    let keys = SessionKeys::new("test-secret", -2, false);
    let token = keys.generate_jwt(7).unwrap();
    assert!(keys.decode_jwt(&token).is_err());
  }

  #[test]
  fn cookie_attributes() {
    let keys = SessionKeys::new("test-secret", 30, true);
    let cookie = keys.session_cookie(3).unwrap();
    assert_eq!(cookie.name(), SESSION_COOKIE);
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.same_site(), Some(SameSite::Strict));
    assert_eq!(cookie.secure(), Some(true));
    assert_eq!(cookie.max_age(), Some(CookieDuration::days(30)));

    let removal = keys.removal_cookie();
    assert_eq!(removal.value(), "");
    assert_eq!(removal.max_age(), Some(CookieDuration::ZERO));
  }
}
