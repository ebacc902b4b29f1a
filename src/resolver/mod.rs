//! # Resolver Module
//!
//! Turns a request path into a handler.
//!
//! - [`PathResolver`] walks the handler tree one segment at a time and returns a
//!   [`ResolvedRoute`]: the matched file, its import reference and the bound parameters.
//! - [`RouteCache`] remembers resolved routes per path.
//! - [`Resolver`] is the facade the router uses: base path stripping, caching, module
//!   loading and method selection, producing an [`Endpoint`](crate::Endpoint).
//!
//! ## Matching rules
//!
//! At every level a literal child (matched after turning hyphens into underscores)
//! wins over the dynamic child. Parameter values are the request segments exactly as
//! received, so `nested/abc-123` binds `nested_id = "abc-123"`. A path ending on a
//! directory uses that directory's default file; an empty segment (trailing slash)
//! uses its `mod` index.

mod cache;
mod core;
mod path;
#[cfg(test)]
mod tests;

pub use self::core::{ResolverState, Resolver, RouteInfo};
pub use cache::RouteCache;
pub use path::{ParamVec, PathResolver, ResolvedRoute, MAX_INLINE_PARAMS};
