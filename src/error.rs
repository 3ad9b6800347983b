use log::*;

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;

use jsonwebtoken::errors::Error as JwtError;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
  // 400
  #[error("validation error: {0}")]
  Validation(String),

  // 400, unique field already taken.
  #[error("conflict: {0}")]
  Conflict(String),

  // 401
  #[error("unauthorized: {0}")]
  Unauthorized(String),

  // 403
  #[error("forbidden: {0}")]
  Forbidden(String),

  // 404
  #[error("not found: {0}")]
  NotFound(String),

  // 500
  #[error("internal server error")]
  InternalServerError,

  // Json error
  #[error("Json error: {source}")]
  JsonError {
    #[from]
    source: serde_json::Error,
  },

  // Password error
  #[error("Password error: {0}")]
  PasswordError(String),

  #[error("JWT error")]
  JwtError {
    #[from]
    source: JwtError,
  },

  #[error("disconnected: {0}")]
  DisconnectedError(String),

  #[error("postgres error")]
  PgError {
    #[from]
    source: tokio_postgres::error::Error,
  },

  #[error("crossbeam recv error")]
  RecvError {
    #[from]
    source: crossbeam_channel::RecvError,
  },

  #[error("std io error")]
  IOError {
    #[from]
    source: std::io::Error,
  },

  #[error("config error")]
  ConfigError {
    #[from]
    source: config::ConfigError,
  },

  #[error(transparent)]
  Other(#[from] anyhow::Error),
}

impl Error {
  pub fn validation(msg: impl Into<String>) -> Self {
    Error::Validation(msg.into())
  }

  pub fn conflict(msg: impl Into<String>) -> Self {
    Error::Conflict(msg.into())
  }

  pub fn not_found(msg: impl Into<String>) -> Self {
    Error::NotFound(msg.into())
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

fn message(msg: &str) -> serde_json::Value {
  json!({ "message": msg })
}

// the ResponseError trait lets us convert errors to http responses with appropriate data
// https://actix.rs/docs/errors/
impl ResponseError for Error {
  fn status_code(&self) -> StatusCode {
    match self {
      Error::Validation(_) | Error::Conflict(_) => StatusCode::BAD_REQUEST,
      Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
      Error::Forbidden(_) => StatusCode::FORBIDDEN,
      Error::NotFound(_) => StatusCode::NOT_FOUND,
      _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    match self {
      Error::Validation(ref msg)
      | Error::Conflict(ref msg)
      | Error::Unauthorized(ref msg)
      | Error::Forbidden(ref msg)
      | Error::NotFound(ref msg) => {
        HttpResponse::build(self.status_code()).json(message(msg))
      },
      ref err => {
        error!("InternalServerError: {:?}", err);
        HttpResponse::InternalServerError().json(message("Internal Server Error"))
      },
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_codes_follow_taxonomy() {
    assert_eq!(Error::validation("x").status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(Error::conflict("x").status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(Error::Unauthorized("x".into()).status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(Error::Forbidden("x".into()).status_code(), StatusCode::FORBIDDEN);
    assert_eq!(Error::not_found("x").status_code(), StatusCode::NOT_FOUND);
    assert_eq!(
      Error::DisconnectedError("db".into()).status_code(),
      StatusCode::INTERNAL_SERVER_ERROR
    );
  }

  #[test]
  fn internal_errors_hide_details() {
    let resp = Error::PasswordError("bad phc".into()).error_response();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
  }
}
