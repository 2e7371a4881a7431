// waypost/src/core/predicate.rs

//! Defines the `CompletionPredicate` trait: the caller-owned condition that
//! completes an `Auto`-triggered step once it holds.

use async_trait::async_trait;
use std::future::Future;
use std::marker::PhantomData;

/// A condition the host resolves when an `Auto` step's goal has been reached
/// (e.g. "the player opened the inventory").
///
/// Failure is reported with `anyhow::Error`; the step wraps it in
/// `WaypostError::PredicateFailure` and stays `Active`.
#[async_trait]
pub trait CompletionPredicate: Send + Sync {
  /// Resolves once the condition holds.
  async fn wait_until_met(&self) -> anyhow::Result<()>;
}

/// Adapts an async closure into a [`CompletionPredicate`].
pub struct FnPredicate<F, Fut>
where
  F: Fn() -> Fut + Send + Sync + 'static,
  Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
  wait: F,
  _phantom_fut: PhantomData<fn() -> Fut>,
}

impl<F, Fut> FnPredicate<F, Fut>
where
  F: Fn() -> Fut + Send + Sync + 'static,
  Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
  pub fn new(wait: F) -> Self {
    Self {
      wait,
      _phantom_fut: PhantomData,
    }
  }
}

#[async_trait]
impl<F, Fut> CompletionPredicate for FnPredicate<F, Fut>
where
  F: Fn() -> Fut + Send + Sync + 'static,
  Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
  async fn wait_until_met(&self) -> anyhow::Result<()> {
    (self.wait)().await
  }
}
