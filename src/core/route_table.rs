//! Immutable, ordered route table.
//!
//! Built once from configuration and shared read-only (behind an `Arc`) by every
//! request worker, so lookups need no synchronization. Matching is a linear scan
//! in configured order: the first route whose prefix (pattern minus the trailing
//! `/**`) starts the request path wins. Paths are compared byte for byte; there is
//! no case folding or slash normalization.
use crate::config::{ROUTE_WILDCARD, RouteEntry};

/// A resolved backend route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub id: String,
    pub path_pattern: String,
    pub target_base_uri: String,
    pub strip_segments: usize,
    prefix: String,
}

impl Route {
    pub fn new(
        id: impl Into<String>,
        path_pattern: impl Into<String>,
        target_base_uri: impl Into<String>,
        strip_segments: usize,
    ) -> Self {
        let path_pattern = path_pattern.into();
        let prefix = path_pattern
            .strip_suffix(ROUTE_WILDCARD)
            .unwrap_or(&path_pattern)
            .to_string();
        Self {
            id: id.into(),
            path_pattern,
            target_base_uri: target_base_uri.into(),
            strip_segments,
            prefix,
        }
    }

    /// The literal prefix compared against request paths.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }
}

impl From<&RouteEntry> for Route {
    fn from(entry: &RouteEntry) -> Self {
        Route::new(&entry.id, &entry.path, &entry.uri, entry.strip_prefix)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    pub fn from_entries(entries: &[RouteEntry]) -> Self {
        let routes: Vec<Route> = entries.iter().map(Route::from).collect();
        for route in &routes {
            tracing::info!(
                "Configured route: {} -> {} ({})",
                route.path_pattern,
                route.target_base_uri,
                route.id
            );
        }
        Self { routes }
    }

    /// First route, in configured order, whose prefix starts `path`.
    pub fn find(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.matches(path))
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
