//! Route table module
//!
//! Routes are registered programmatically at startup: a binding from
//! (HTTP method, exact path) to a handler function. Dispatch walks the
//! table in registration order; misses are answered here with 404 or 405
//! so handlers never see requests outside their contract.

use crate::response;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Method, Response};

/// Request context passed to handlers, decoupled from the hyper body type.
pub struct RequestContext<'a> {
    pub method: &'a Method,
    pub path: &'a str,
    pub is_head: bool,
}

/// A handler receives a request context and produces a complete response.
pub type HandlerFn = fn(&RequestContext) -> Response<Full<Bytes>>;

/// A single (method, path) -> handler binding.
pub struct Route {
    pub method: Method,
    pub path: &'static str,
    pub handler: HandlerFn,
}

/// Route table, matched in registration order.
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub const fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Register a handler for an exact (method, path) pair.
    #[must_use]
    pub fn route(mut self, method: Method, path: &'static str, handler: HandlerFn) -> Self {
        self.routes.push(Route {
            method,
            path,
            handler,
        });
        self
    }

    /// Dispatch a request through the route table.
    ///
    /// HEAD requests are served by the matching GET route; the body is
    /// stripped by the handler via `ctx.is_head`.
    pub fn dispatch(&self, ctx: &RequestContext) -> Response<Full<Bytes>> {
        let lookup = if ctx.is_head { &Method::GET } else { ctx.method };

        if let Some(route) = self
            .routes
            .iter()
            .find(|r| r.path == ctx.path && r.method == *lookup)
        {
            return (route.handler)(ctx);
        }

        // Path known but method not registered -> 405 with Allow header
        let allowed = self.allowed_methods(ctx.path);
        if allowed.is_empty() {
            response::build_404_response()
        } else {
            response::build_405_response(&allowed)
        }
    }

    /// Methods registered for a path, with HEAD implied by GET.
    fn allowed_methods(&self, path: &str) -> Vec<Method> {
        let mut allowed: Vec<Method> = Vec::new();
        for route in self.routes.iter().filter(|r| r.path == path) {
            if !allowed.contains(&route.method) {
                allowed.push(route.method.clone());
            }
            if route.method == Method::GET && !allowed.contains(&Method::HEAD) {
                allowed.push(Method::HEAD);
            }
        }
        allowed
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
