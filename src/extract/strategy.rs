use tracing::debug;

use super::page::Page;

/// One independent way of reading a value off a page. Absence is a normal
/// negative result, never an error.
pub(crate) trait PageStrategy {
    fn name(&self) -> &'static str;
    fn extract(&self, page: &Page) -> Option<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Hit {
    pub(crate) value: String,
    pub(crate) source: &'static str,
}

/// Runs `strategies` in order and stops at the first non-empty value.
pub(crate) fn first_success(strategies: &[&dyn PageStrategy], page: &Page) -> Option<Hit> {
    strategies.iter().find_map(|strategy| {
        let value = strategy.extract(page)?;
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        debug!(strategy = strategy.name(), value, "strategy matched");
        Some(Hit {
            value: value.to_string(),
            source: strategy.name(),
        })
    })
}
