//! Post-render filters shared between widgets
//!
//! Widgets that restyle content register a filter here; widgets that
//! replace panel content run every registered filter over the new HTML
//! before writing it, so content rendered after mount is treated the same
//! way as content that was on the page at mount time.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Transforms rendered HTML before it reaches the page
pub type RenderFilter = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Named filters applied in registration order
#[derive(Clone, Default)]
pub struct RenderFilters {
    filters: Arc<RwLock<Vec<(String, RenderFilter)>>>,
}

impl RenderFilters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `filter` under `name`, replacing any filter with that name
    pub fn register<S: Into<String>>(&self, name: S, filter: RenderFilter) {
        let name = name.into();
        let mut filters = self.write();
        if let Some(slot) = filters.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = filter;
        } else {
            filters.push((name, filter));
        }
    }

    /// Remove the filter registered under `name`
    pub fn remove(&self, name: &str) -> bool {
        let mut filters = self.write();
        let before = filters.len();
        filters.retain(|(n, _)| n != name);
        filters.len() != before
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().iter().any(|(n, _)| n == name)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Run every filter over `html`
    pub fn apply(&self, html: &str) -> String {
        // Filters run outside the lock so one may register or remove others.
        let filters: Vec<RenderFilter> = self.read().iter().map(|(_, f)| f.clone()).collect();
        filters
            .iter()
            .fold(html.to_string(), |current, filter| filter(&current))
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<(String, RenderFilter)>> {
        self.filters
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<(String, RenderFilter)>> {
        self.filters
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for RenderFilters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.read().iter().map(|(n, _)| n.clone()).collect();
        f.debug_struct("RenderFilters").field("filters", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_run_in_registration_order() {
        let filters = RenderFilters::new();
        filters.register("wrap", Arc::new(|html: &str| format!("<div>{html}</div>")));
        filters.register("mark", Arc::new(|html: &str| format!("{html}!")));

        assert_eq!(filters.apply("x"), "<div>x</div>!");
    }

    #[test]
    fn test_register_replaces_same_name() {
        let filters = RenderFilters::new();
        filters.register("case", Arc::new(|html: &str| html.to_uppercase()));
        filters.register("case", Arc::new(|html: &str| html.to_lowercase()));

        assert_eq!(filters.len(), 1);
        assert_eq!(filters.apply("MiXeD"), "mixed");
    }

    #[test]
    fn test_remove_and_empty_passthrough() {
        let filters = RenderFilters::new();
        assert_eq!(filters.apply("<p>a</p>"), "<p>a</p>");

        filters.register("drop", Arc::new(|_: &str| String::new()));
        assert!(filters.contains("drop"));
        assert!(filters.remove("drop"));
        assert!(!filters.remove("drop"));
        assert!(filters.is_empty());
        assert_eq!(filters.apply("<p>a</p>"), "<p>a</p>");
    }

    #[test]
    fn test_clones_share_registrations() {
        let filters = RenderFilters::new();
        let shared = filters.clone();
        shared.register("mark", Arc::new(|html: &str| format!("{html}?")));

        assert_eq!(filters.apply("a"), "a?");
    }
}
