use crate::handlers::Handler;
use coap_lite::RequestType;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("route path must start with '/': {0}")]
    MissingLeadingSlash(&'static str),
    #[error("route paths must be unique and sorted ascending: {1} follows {0}")]
    OutOfOrder(&'static str, &'static str),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteKind {
    Exact,
    Subtree,
}

/// One row of the static dispatch table. `slot` is the per-route context an
/// execution route carries; it binds the route to its storage location so a
/// request can never select a slot beyond the registered set.
pub struct Route {
    pub method: RequestType,
    pub path: &'static str,
    pub kind: RouteKind,
    pub slot: Option<&'static str>,
    pub handler: Arc<dyn Handler>,
}

impl Route {
    pub fn exact(method: RequestType, path: &'static str, handler: Arc<dyn Handler>) -> Self {
        Self {
            method,
            path,
            kind: RouteKind::Exact,
            slot: None,
            handler,
        }
    }

    pub fn exact_with_slot(
        method: RequestType,
        path: &'static str,
        slot: &'static str,
        handler: Arc<dyn Handler>,
    ) -> Self {
        Self {
            method,
            path,
            kind: RouteKind::Exact,
            slot: Some(slot),
            handler,
        }
    }

    pub fn subtree(method: RequestType, path: &'static str, handler: Arc<dyn Handler>) -> Self {
        Self {
            method,
            path,
            kind: RouteKind::Subtree,
            slot: None,
            handler,
        }
    }
}

pub enum RouteMatch<'r, 'p> {
    Found {
        route: &'r Route,
        subtree_path: Option<&'p str>,
    },
    MethodNotAllowed,
    NotFound,
}

/// Static dispatch table, validated once at startup: paths must be unique
/// and sorted ascending, so a misregistered table is a boot failure instead
/// of a routing surprise.
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new(routes: Vec<Route>) -> Result<Self, RouterError> {
        for route in &routes {
            if !route.path.starts_with('/') {
                return Err(RouterError::MissingLeadingSlash(route.path));
            }
        }
        for pair in routes.windows(2) {
            if pair[0].path >= pair[1].path {
                return Err(RouterError::OutOfOrder(pair[0].path, pair[1].path));
            }
        }
        Ok(Self { routes })
    }

    pub fn paths(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.routes.iter().map(|r| r.path)
    }

    pub fn lookup<'p>(&self, method: RequestType, path: &'p str) -> RouteMatch<'_, 'p> {
        for route in &self.routes {
            let subtree_path = match route.kind {
                RouteKind::Exact => {
                    if path != route.path {
                        continue;
                    }
                    None
                }
                RouteKind::Subtree => match path.strip_prefix(route.path) {
                    Some("") => None,
                    Some(rest) if rest.starts_with('/') => Some(&rest[1..]),
                    _ => continue,
                },
            };
            if route.method != method {
                return RouteMatch::MethodNotAllowed;
            }
            return RouteMatch::Found {
                route,
                subtree_path,
            };
        }
        RouteMatch::NotFound
    }
}
