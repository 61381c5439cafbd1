//! Bounded retries for store calls that may hit lock contention.
//!
//! Each attempt runs under a timeout. Only errors the backend classifies as
//! [`ErrorClass::Transient`] (and timeouts) are retried; anything else is
//! returned straight away.

use std::{future::Future, time::Duration};

use fibreflow_core::store::{ErrorClass, StoreError};

use crate::error::ApiError;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
  pub attempts:   u32,
  /// Delay before the second attempt; doubled for each one after.
  pub base_delay: Duration,
  pub timeout:    Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      attempts:   3,
      base_delay: Duration::from_millis(200),
      timeout:    Duration::from_secs(10),
    }
  }
}

impl RetryPolicy {
  fn delay(&self, attempt: u32) -> Duration {
    self.base_delay.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
  }

  /// Run `op` until it succeeds, fails permanently, or attempts run out.
  pub async fn run<T, E, F, Fut>(&self, what: &'static str, mut op: F) -> Result<T, ApiError>
  where
    E: StoreError,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
  {
    let attempts = self.attempts.max(1);
    let mut attempt = 1;
    loop {
      let err = match tokio::time::timeout(self.timeout, op()).await {
        Ok(Ok(value)) => return Ok(value),
        Ok(Err(e)) if e.class() == ErrorClass::Transient => ApiError::store(e),
        Ok(Err(e)) => return Err(ApiError::store(e)),
        Err(_) => ApiError::Timeout(what),
      };
      if attempt >= attempts {
        return Err(err);
      }
      let delay = self.delay(attempt);
      tracing::warn!(operation = what, attempt, ?delay, error = %err, "retrying");
      tokio::time::sleep(delay).await;
      attempt += 1;
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicU32, Ordering};

  use thiserror::Error;

  use super::*;

  #[derive(Debug, Error)]
  #[error("{0:?}")]
  struct Fake(ErrorClass);

  impl StoreError for Fake {
    fn class(&self) -> ErrorClass { self.0 }
  }

  fn fast() -> RetryPolicy {
    RetryPolicy {
      attempts:   3,
      base_delay: Duration::from_millis(1),
      timeout:    Duration::from_millis(200),
    }
  }

  #[test]
  fn backoff_doubles() {
    let p = RetryPolicy::default();
    assert_eq!(p.delay(1), Duration::from_millis(200));
    assert_eq!(p.delay(2), Duration::from_millis(400));
    assert_eq!(p.delay(3), Duration::from_millis(800));
  }

  #[tokio::test]
  async fn transient_errors_are_retried_until_success() {
    let calls = &AtomicU32::new(0);
    let out = fast()
      .run("op", move || async move {
        if calls.fetch_add(1, Ordering::SeqCst) < 2 {
          Err(Fake(ErrorClass::Transient))
        } else {
          Ok(7)
        }
      })
      .await
      .unwrap();
    assert_eq!(out, 7);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn gives_up_after_the_last_attempt() {
    let calls = &AtomicU32::new(0);
    let err = fast()
      .run("op", move || async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Err::<(), _>(Fake(ErrorClass::Transient))
      })
      .await
      .unwrap_err();
    assert!(matches!(err, ApiError::Store { class: ErrorClass::Transient, .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn permanent_errors_are_not_retried() {
    let calls = &AtomicU32::new(0);
    let err = fast()
      .run("op", move || async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Err::<(), _>(Fake(ErrorClass::Conflict))
      })
      .await
      .unwrap_err();
    assert!(matches!(err, ApiError::Store { class: ErrorClass::Conflict, .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn slow_attempts_time_out() {
    let policy = RetryPolicy { attempts: 2, timeout: Duration::from_millis(5), ..fast() };
    let err = policy
      .run("slow op", || async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok::<_, Fake>(())
      })
      .await
      .unwrap_err();
    assert!(matches!(err, ApiError::Timeout("slow op")));
  }
}
