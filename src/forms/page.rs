use serde::{Deserialize, Serialize};

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

fn clamp_limit(limit: Option<i64>) -> i64 {
  match limit {
    Some(limit) if limit > 0 => limit.min(MAX_LIMIT),
    _ => DEFAULT_LIMIT,
  }
}

/// `?page=&limit=` query, 1-based pages.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageRequest {
  pub page: Option<i64>,
  pub limit: Option<i64>,
}

impl PageRequest {
  pub fn page(&self) -> i64 {
    match self.page {
      Some(page) if page > 0 => page,
      _ => 1,
    }
  }

  pub fn limit(&self) -> i64 {
    clamp_limit(self.limit)
  }

  pub fn skip(&self) -> i64 {
    (self.page() - 1).saturating_mul(self.limit())
  }
}

/// `?skip=&limit=` query.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkipRequest {
  pub skip: Option<i64>,
  pub limit: Option<i64>,
}

impl SkipRequest {
  pub fn skip(&self) -> i64 {
    self.skip.filter(|skip| *skip > 0).unwrap_or(0)
  }

  pub fn limit(&self) -> i64 {
    clamp_limit(self.limit)
  }
}

pub fn has_more(skip: i64, returned: usize, total: i64) -> bool {
  skip + (returned as i64) < total
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub page: Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub skip: Option<i64>,
  pub limit: i64,
  pub total: i64,
  pub has_more: bool,
}

impl Pagination {
  pub fn paged(req: &PageRequest, total: i64, returned: usize) -> Self {
    Pagination {
      page: Some(req.page()),
      skip: None,
      limit: req.limit(),
      total,
      has_more: has_more(req.skip(), returned, total),
    }
  }

  pub fn skipped(req: &SkipRequest, total: i64, returned: usize) -> Self {
    Pagination {
      page: None,
      skip: Some(req.skip()),
      limit: req.limit(),
      total,
      has_more: has_more(req.skip(), returned, total),
    }
  }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Paginated<T> {
  pub success: bool,
  pub data: Vec<T>,
  pub pagination: Pagination,
}

impl<T> Paginated<T> {
  pub fn new(data: Vec<T>, pagination: Pagination) -> Self {
    Paginated {
      success: true,
      data,
      pagination,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn page_defaults() {
    let req = PageRequest::default();
    assert_eq!((req.page(), req.limit(), req.skip()), (1, DEFAULT_LIMIT, 0));

    let req = PageRequest { page: Some(0), limit: Some(-5) };
    assert_eq!((req.page(), req.limit(), req.skip()), (1, DEFAULT_LIMIT, 0));
  }

  #[test]
  fn page_to_skip() {
    let req = PageRequest { page: Some(3), limit: Some(20) };
    assert_eq!(req.skip(), 40);

    let req = PageRequest { page: Some(2), limit: Some(10_000) };
    assert_eq!(req.limit(), MAX_LIMIT);
    assert_eq!(req.skip(), MAX_LIMIT);
  }

  #[test]
  fn has_more_matches_remaining_items() {
    for total in 0..12i64 {
      for skip in 0..14i64 {
        for limit in 1..5i64 {
          let returned = (total - skip).clamp(0, limit) as usize;
          assert!(returned as i64 <= limit);
          let expected = skip + (returned as i64) < total;
          assert_eq!(has_more(skip, returned, total), expected);
          // a full page that reaches the end is not "more"
          if skip + limit == total {
            assert!(!has_more(skip, returned, total));
          }
        }
      }
    }
  }

  #[test]
  fn pagination_serializes_page_or_skip() {
    let paged = Pagination::paged(&PageRequest::default(), 25, 10);
    let value = serde_json::to_value(&paged).unwrap();
    assert_eq!(value["page"], 1);
    assert_eq!(value["hasMore"], true);
    assert!(value.get("skip").is_none());

    let req = SkipRequest { skip: Some(20), limit: None };
    let skipped = Pagination::skipped(&req, 25, 5);
    let value = serde_json::to_value(&skipped).unwrap();
    assert_eq!(value["skip"], 20);
    assert_eq!(value["hasMore"], false);
    assert!(value.get("page").is_none());
  }
}
