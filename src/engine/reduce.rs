//! Sequential, order-preserving fold over async steps.
//!
//! Every iteration in the orchestrator goes through here: step `i + 1` is
//! not started until step `i` has resolved, results keep input order, and
//! the first error ends the fold with nothing accumulated.

use std::future::Future;

use crate::error::Result;
use crate::scanners::Finding;

/// Apply `step` to each item strictly one at a time, collecting results in
/// order.
pub async fn fold_in_order<I, T, F, Fut>(items: I, mut step: F) -> Result<Vec<T>>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut acc = Vec::new();
    for item in items {
        acc.push(step(item).await?);
    }
    Ok(acc)
}

/// [`fold_in_order`] over scanner steps, dropping empty results.
pub async fn fold_findings<I, F, Fut>(items: I, step: F) -> Result<Vec<Finding>>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<Option<Finding>>>,
{
    Ok(fold_in_order(items, step).await?.into_iter().flatten().collect())
}
