use serde::{Deserialize, Serialize};

use crate::error::*;
use crate::models::*;

/// Number of comments embedded into a listed post.
pub const COMMENT_PREVIEW: usize = 3;

fn provided(field: &Option<String>) -> Option<&str> {
  field.as_deref().filter(|s| !s.trim().is_empty())
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CreatePost {
  pub text: Option<String>,
  pub image: Option<String>,
}

impl CreatePost {
  pub fn text(&self) -> Option<&str> {
    provided(&self.text)
  }

  pub fn image(&self) -> Option<&str> {
    provided(&self.image)
  }

  pub fn validate(&self) -> Result<()> {
    if self.text().is_none() && self.image().is_none() {
      return Err(Error::validation("Please provide text or image"));
    }
    Ok(())
  }
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CreateComment {
  pub text: Option<String>,
}

impl CreateComment {
  pub fn validate(&self) -> Result<&str> {
    provided(&self.text).ok_or_else(|| Error::validation("Please provide text"))
  }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DataOut<T> {
  pub success: bool,
  pub data: T,
}

impl<T> DataOut<T> {
  pub fn new(data: T) -> Self {
    DataOut {
      success: true,
      data,
    }
  }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessOut {
  pub success: bool,
  pub message: String,
}

impl SuccessOut {
  pub fn new(message: impl Into<String>) -> Self {
    SuccessOut {
      success: true,
      message: message.into(),
    }
  }
}

/// Comment preview returned after commenting.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentsOut {
  pub comments: Vec<CommentDetails>,
  pub total_comments: usize,
  pub has_more_comments: bool,
}

impl CommentsOut {
  /// `comments` holds at most the first `COMMENT_PREVIEW` of `total_comments`.
  pub fn new(comments: Vec<CommentDetails>, total_comments: usize) -> Self {
    CommentsOut {
      comments,
      total_comments,
      has_more_comments: total_comments > COMMENT_PREVIEW,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn post_needs_text_or_image() {
    let empty = CreatePost { text: Some("  ".into()), image: Some(String::new()) };
    assert!(matches!(empty.validate(), Err(Error::Validation(_))));

    let text = CreatePost { text: Some("hello".into()), image: None };
    assert!(text.validate().is_ok());

    let image = CreatePost { text: None, image: Some("data:image/png;base64,AA==".into()) };
    assert!(image.validate().is_ok());
  }

  #[test]
  fn comment_needs_text() {
    assert!(CreateComment::default().validate().is_err());
    let comment = CreateComment { text: Some("hi".into()) };
    assert_eq!(comment.validate().unwrap(), "hi");
  }
}
