pub mod user;
pub mod post;
pub mod comment;
pub mod notification;
pub use self::{
  user::*,
  post::*,
  comment::*,
  notification::*,
};
