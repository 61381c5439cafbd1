//! Query-string parameters shared by several endpoints.

use std::future::Future;

use fibreflow_core::store::ListQuery;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// `GET` parameters for collection endpoints. `id` selects a single record;
/// the rest filter and page the list.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub id:         Option<Uuid>,
  #[serde(alias = "q", alias = "search")]
  pub text:       Option<String>,
  pub status:     Option<String>,
  pub client_id:  Option<Uuid>,
  pub project_id: Option<Uuid>,
  pub limit:      Option<usize>,
  pub offset:     Option<usize>,
}

impl ListParams {
  /// The store query, with the limit clamped to `max`.
  pub fn to_query(&self, max: usize) -> ListQuery {
    ListQuery {
      text:       self.text.clone().filter(|t| !t.trim().is_empty()),
      status:     self.status.clone().filter(|s| !s.trim().is_empty()),
      client_id:  self.client_id,
      project_id: self.project_id,
      limit:      self.limit,
      offset:     self.offset,
    }
    .capped(max)
  }
}

/// `?id=<uuid>` for updates and deletes.
#[derive(Debug, Default, Deserialize)]
pub struct IdParam {
  pub id: Option<Uuid>,
}

impl IdParam {
  pub fn require(&self) -> ApiResult<Uuid> { self.id.ok_or_else(|| ApiError::missing("id")) }
}

/// Page through a list operation until it runs dry.
pub async fn collect_all<T, E, F, Fut>(page_size: usize, mut fetch: F) -> Result<Vec<T>, E>
where
  F: FnMut(ListQuery) -> Fut,
  Fut: Future<Output = Result<Vec<T>, E>>,
{
  let page_size = page_size.max(1);
  let mut all = Vec::new();
  loop {
    let query = ListQuery {
      limit: Some(page_size),
      offset: Some(all.len()),
      ..ListQuery::default()
    };
    let page = fetch(query).await?;
    let last = page.len() < page_size;
    all.extend(page);
    if last {
      return Ok(all);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn blank_filters_are_ignored_and_limit_capped() {
    let params = ListParams {
      text: Some("  ".into()),
      status: Some("active".into()),
      limit: Some(50_000),
      ..ListParams::default()
    };
    let q = params.to_query(1000);
    assert_eq!(q.text, None);
    assert_eq!(q.status.as_deref(), Some("active"));
    assert_eq!(q.limit(), 1000);
  }

  #[tokio::test]
  async fn collect_all_walks_every_page() {
    let source: Vec<u32> = (0..7).collect();
    let source = &source;
    let all = collect_all(3, move |q| async move {
      let start = q.offset();
      let end = (start + q.limit()).min(source.len());
      Ok::<_, std::convert::Infallible>(source[start..end].to_vec())
    })
    .await
    .unwrap();
    assert_eq!(all, source.clone());
  }
}
