//! Resolver output that may be ready, deferred, or a list of either.

use crate::error::ResolveResult;
use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;
use serde_json::Value;
use std::fmt;
use std::future::Future;

/// Output of a resolver.
///
/// Lists keep their elements unresolved so the middleware can decide
/// whether a batch join is needed.
pub enum Resolved {
    /// A value that is already available.
    Ready(Value),
    /// A value that still has to be awaited.
    Deferred(BoxFuture<'static, ResolveResult<Resolved>>),
    /// An ordered collection whose elements may be deferred.
    List(Vec<Resolved>),
}

impl Resolved {
    /// Wrap an available value.
    pub fn ready(value: impl Into<Value>) -> Self {
        Resolved::Ready(value.into())
    }

    /// Wrap a future producing another output.
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = ResolveResult<Resolved>> + Send + 'static,
    {
        Resolved::Deferred(future.boxed())
    }

    /// Wrap a future producing a plain value.
    pub fn deferred_value<F>(future: F) -> Self
    where
        F: Future<Output = ResolveResult<Value>> + Send + 'static,
    {
        Resolved::Deferred(future.map(|result| result.map(Resolved::Ready)).boxed())
    }

    /// Build a list output.
    pub fn list(items: impl IntoIterator<Item = Resolved>) -> Self {
        Resolved::List(items.into_iter().collect())
    }

    /// Check if this output must be awaited before use.
    pub fn is_deferred(&self) -> bool {
        matches!(self, Resolved::Deferred(_))
    }

    /// Await deferred layers until a ready value or a list is reached.
    ///
    /// List elements are left untouched.
    pub async fn flatten(self) -> ResolveResult<Resolved> {
        let mut current = self;
        loop {
            match current {
                Resolved::Deferred(future) => current = future.await?,
                settled => return Ok(settled),
            }
        }
    }

    /// Resolve everything into a plain value. List elements are joined concurrently.
    pub fn settle(self) -> BoxFuture<'static, ResolveResult<Value>> {
        async move {
            match self {
                Resolved::Ready(value) => Ok(value),
                Resolved::Deferred(future) => future.await?.settle().await,
                Resolved::List(items) => {
                    let values = try_join_all(items.into_iter().map(Resolved::settle)).await?;
                    Ok(Value::Array(values))
                }
            }
        }
        .boxed()
    }
}

impl From<Value> for Resolved {
    fn from(value: Value) -> Self {
        Resolved::Ready(value)
    }
}

impl fmt::Debug for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolved::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
            Resolved::Deferred(_) => f.write_str("Deferred(..)"),
            Resolved::List(items) => f.debug_tuple("List").field(items).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResolveError;
    use serde_json::json;

    #[tokio::test]
    async fn test_settle_nested() {
        let output = Resolved::deferred(async {
            Ok(Resolved::list([
                Resolved::ready(json!(1)),
                Resolved::deferred_value(async { Ok(json!(2)) }),
            ]))
        });
        assert!(output.is_deferred());
        assert_eq!(output.settle().await.unwrap(), json!([1, 2]));
    }

    #[tokio::test]
    async fn test_flatten_keeps_list_elements() {
        let output = Resolved::deferred(async {
            Ok(Resolved::list([Resolved::deferred_value(async { Ok(json!("x")) })]))
        });
        match output.flatten().await.unwrap() {
            Resolved::List(items) => assert!(items[0].is_deferred()),
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_settle_propagates_fault() {
        let output = Resolved::list([
            Resolved::ready(json!(1)),
            Resolved::deferred_value(async { Err(ResolveError::resolver("db down")) }),
        ]);
        let err = output.settle().await.unwrap_err();
        assert_eq!(err.to_string(), "resolver failed: db down");
    }
}
