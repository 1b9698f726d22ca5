//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. A [`Router`] is a plain
//! route table: build one for a sub-application and mount it on an
//! [`App`](crate::App) with [`App::nest`](crate::App::nest), or register routes
//! on the app directly.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use matchit::Router as MatchitRouter;

use crate::handler::{BoxedHandler, Handler};

/// A route could not be registered.
#[derive(Debug, thiserror::Error)]
#[error("invalid route `{method} {path}`: {source}")]
pub struct RouteError {
    pub method: Method,
    pub path: String,
    #[source]
    pub source: matchit::InsertError,
}

/// The application route table.
///
/// Each [`Router::on`] call returns `self` so registrations chain naturally.
#[derive(Default)]
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
    entries: Vec<(Method, String, BoxedHandler)>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them.
    ///
    /// ```rust
    /// # use mortar::{Context, Error, Request, Router, handle};
    /// # use http::Method;
    /// # async fn get_user(_: Request, _: Context) -> Result<(), Error> { Ok(()) }
    /// # async fn create_user(_: Request, _: Context) -> Result<(), Error> { Ok(()) }
    /// let users = Router::new()
    ///     .on(Method::GET,  "/users/{id}", handle(get_user))?
    ///     .on(Method::POST, "/users",      handle(create_user))?;
    /// # Ok::<(), mortar::RouteError>(())
    /// ```
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Result<Self, RouteError> {
        self.add(method, path, handler.into_boxed_handler())?;
        Ok(self)
    }

    pub(crate) fn add(&mut self, method: Method, path: &str, handler: BoxedHandler) -> Result<(), RouteError> {
        self.routes
            .entry(method.clone())
            .or_default()
            .insert(path, Arc::clone(&handler))
            .map_err(|source| RouteError { method: method.clone(), path: path.to_owned(), source })?;
        self.entries.push((method, path.to_owned(), handler));
        Ok(())
    }

    /// Copies every route of `other` under `prefix`.
    pub(crate) fn merge(&mut self, prefix: &str, other: Router) -> Result<(), RouteError> {
        let prefix = prefix.trim_end_matches('/');
        for (method, path, handler) in other.entries {
            let full = if path == "/" && !prefix.is_empty() {
                prefix.to_owned()
            } else {
                format!("{prefix}{path}")
            };
            self.add(method, &full, handler)?;
        }
        Ok(())
    }

    pub(crate) fn lookup(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::error::Error;
    use crate::handler::handle;
    use crate::request::Request;

    async fn noop(_req: Request, _ctx: Context) -> Result<(), Error> {
        Ok(())
    }

    #[test]
    fn lookup_extracts_params() {
        let router = Router::new().on(Method::GET, "/users/{id}", handle(noop)).unwrap();
        let (_, params) = router.lookup(&Method::GET, "/users/42").unwrap();
        assert_eq!(params.get("id").map(String::as_str), Some("42"));
        assert!(router.lookup(&Method::POST, "/users/42").is_none());
        assert!(router.lookup(&Method::GET, "/users").is_none());
    }

    #[test]
    fn duplicate_routes_are_rejected() {
        let router = Router::new().on(Method::GET, "/a", handle(noop)).unwrap();
        let err = router.on(Method::GET, "/a", handle(noop)).err().unwrap();
        assert_eq!(err.path, "/a");
    }

    #[test]
    fn merge_prefixes_every_route() {
        let sub = Router::new()
            .on(Method::GET, "/", handle(noop)).unwrap()
            .on(Method::GET, "/{id}", handle(noop)).unwrap();
        let mut root = Router::new();
        root.merge("/orders/", sub).unwrap();

        assert_eq!(root.len(), 2);
        assert!(root.lookup(&Method::GET, "/orders").is_some());
        assert!(root.lookup(&Method::GET, "/orders/7").is_some());
    }
}
