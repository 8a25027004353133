//! Resolver middleware.
//!
//! Wraps field resolvers so that requests for unreadable fields never reach
//! the resolver and returned entities are filtered by row and column rules.

pub mod middleware;
pub mod resolved;
pub mod return_type;

pub use middleware::{
    resolver_fn, resolver_wrapper, wrap_resolvers, RequestContext, ResolveInfo, Resolver,
    ResolverMap,
};
pub use resolved::Resolved;
pub use return_type::{parse_return_type, ReturnType};
