pub mod page;
pub mod user;
pub mod post;
pub use self::{
  page::*,
  user::*,
  post::*,
};
