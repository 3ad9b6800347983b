use argon2::{
  password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Algorithm, Argon2, Params, Version,
};

use crate::error::*;

pub const PWD_ALGORITHM: Algorithm = Algorithm::Argon2id;
pub const PWD_VERSION: Version = Version::V0x13;

// Changing the algorithm, version or params makes stored hashes `needs_update`.
lazy_static! {
  static ref HASHER: Argon2<'static> = Argon2::new(PWD_ALGORITHM, PWD_VERSION, Params::default());
}

#[derive(Debug)]
pub struct CheckedPass {
  pub is_valid: bool,
  pub needs_update: bool,
}

impl CheckedPass {
  pub fn new(is_valid: bool, needs_update: bool) -> Self {
    Self {
      is_valid, needs_update
    }
  }
}

fn pass_error<E: std::fmt::Display>(err: E) -> Error {
  Error::PasswordError(err.to_string())
}

fn needs_update(hash: &PasswordHash) -> bool {
  if hash.algorithm != PWD_ALGORITHM.ident() || hash.version != Some(PWD_VERSION.into()) {
    return true;
  }
  let current = Params::default();
  match Params::try_from(hash) {
    Ok(params) => {
      params.m_cost() != current.m_cost()
        || params.t_cost() != current.t_cost()
        || params.p_cost() != current.p_cost()
    },
    Err(_) => true,
  }
}

pub fn check_password(stored: &str, password: &str) -> Result<CheckedPass> {
  let hash = PasswordHash::new(stored).map_err(pass_error)?;
  if HASHER.verify_password(password.as_bytes(), &hash).is_ok() {
    Ok(CheckedPass::new(true, needs_update(&hash)))
  } else {
    Ok(CheckedPass::new(false, false))
  }
}

pub fn hash_password(password: &str) -> Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  let hash = HASHER.hash_password(password.as_bytes(), &salt).map_err(pass_error)?;
  Ok(hash.to_string())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hash_and_check() {
    let stored = hash_password("secret1").unwrap();
    assert_ne!(stored, "secret1");

    let res = check_password(&stored, "secret1").unwrap();
    assert!(res.is_valid);
    assert!(!res.needs_update);

    assert!(!check_password(&stored, "secret2").unwrap().is_valid);
  }

  #[test]
  fn hashes_are_salted() {
    assert_ne!(hash_password("abc123").unwrap(), hash_password("abc123").unwrap());
  }

  #[test]
  fn weaker_params_need_update() {
    let params = Params::new(1024, 1, 1, None).unwrap();
    let old = Argon2::new(PWD_ALGORITHM, PWD_VERSION, params);
    let salt = SaltString::generate(&mut OsRng);
    let stored = old.hash_password(b"secret1", &salt).unwrap().to_string();

    let res = check_password(&stored, "secret1").unwrap();
    assert!(res.is_valid);
    assert!(res.needs_update);
  }

  #[test]
  fn garbage_hash_is_an_error() {
    assert!(check_password("not a phc string", "secret1").is_err());
  }
}
