//! Live filter registry.
//!
//! Holds the ordered set of active advanced filters and the
//! topic-pattern tier derived from enabled processors. Reloads are
//! diff-based: a filter is only constructed or torn down when its own
//! enabled state actually changed, because construction can involve
//! network queries and must not run on every unrelated settings write.
//!
//! All mutation happens on the routing task, so no lock is needed.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use regex::Regex;

use crate::filters::{self, Filter};
use crate::processors::ProcessorRegistry;

/// Topic-tier filter: one compiled pattern per enabled processor.
pub struct TopicFilter {
    pub processor_name: String,
    pattern: Regex,
}

impl TopicFilter {
    pub fn matches_topic(&self, topic: &str) -> bool {
        self.pattern.is_match(topic)
    }
}

#[derive(Default)]
pub struct FilterRegistry {
    enabled_names: Vec<String>,
    advanced: Vec<Arc<dyn Filter>>,
    topic_filters: Vec<TopicFilter>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Active advanced filters, in enablement order.
    pub fn advanced(&self) -> &[Arc<dyn Filter>] {
        &self.advanced
    }

    /// Active topic filters, in processor discovery order.
    pub fn topic_filters(&self) -> &[TopicFilter] {
        &self.topic_filters
    }

    /// Apply a new enabled-filter set.
    ///
    /// Filters absent from `enabled_names` are shut down and dropped;
    /// names newly present are constructed with their stored free-text
    /// setting and appended. Unchanged filters are left alone.
    pub fn reload(
        &mut self,
        enabled_names: &[String],
        filter_settings: &HashMap<String, String>,
    ) {
        let wanted: HashSet<&str> = enabled_names.iter().map(String::as_str).collect();

        self.advanced.retain(|filter| {
            if wanted.contains(filter.name()) {
                return true;
            }
            tracing::info!(filter = filter.name(), "Removing disabled filter");
            filter.shutdown();
            false
        });
        self.enabled_names.retain(|name| wanted.contains(name.as_str()));

        for name in enabled_names {
            if self.enabled_names.contains(name) {
                continue;
            }
            let setting = filter_settings.get(name).map(String::as_str).unwrap_or("");
            match filters::construct(name, setting) {
                Some(filter) => {
                    tracing::info!(filter = name.as_str(), "Enabling filter");
                    self.advanced.push(filter);
                }
                None => {
                    tracing::warn!(filter = name.as_str(), "Unknown filter kind, ignoring");
                }
            }
            // Remember unknown names too, so a repeated reload with the
            // same set stays a no-op.
            self.enabled_names.push(name.clone());
        }
    }

    /// Rebuild the topic tier from the enabled processor names.
    /// Order follows processor discovery order, not enablement order.
    pub fn reload_topic_filters(
        &mut self,
        enabled_services: &HashSet<String>,
        processors: &ProcessorRegistry,
    ) {
        self.topic_filters = processors
            .iter()
            .filter(|p| enabled_services.contains(p.name()))
            .map(|p| TopicFilter {
                processor_name: p.name().to_string(),
                pattern: p.topic_pattern().clone(),
            })
            .collect();
        tracing::debug!(count = self.topic_filters.len(), "Topic filters reloaded");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> HashMap<String, String> {
        HashMap::from([
            ("usernames".to_string(), "lmacken".to_string()),
            ("package-list".to_string(), "kernel".to_string()),
        ])
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn reload_adds_and_removes_by_diff() {
        let mut registry = FilterRegistry::new();
        registry.reload(&names(&["usernames", "package-list"]), &settings());
        assert_eq!(registry.advanced().len(), 2);
        assert_eq!(registry.advanced()[0].name(), "usernames");
        assert_eq!(registry.advanced()[1].name(), "package-list");

        registry.reload(&names(&["package-list"]), &settings());
        assert_eq!(registry.advanced().len(), 1);
        assert_eq!(registry.advanced()[0].name(), "package-list");
    }

    #[test]
    fn reload_does_not_reconstruct_unchanged_filters() {
        let mut registry = FilterRegistry::new();
        registry.reload(&names(&["usernames"]), &settings());
        let original = Arc::clone(&registry.advanced()[0]);

        // Repeated no-op reloads keep the same instance.
        registry.reload(&names(&["usernames"]), &settings());
        registry.reload(&names(&["usernames", "package-list"]), &settings());
        assert!(Arc::ptr_eq(&original, &registry.advanced()[0]));
        assert_eq!(registry.advanced().len(), 2);
    }

    #[test]
    fn disable_then_reenable_reconstructs_once() {
        let mut registry = FilterRegistry::new();
        registry.reload(&names(&["usernames"]), &settings());
        let first = Arc::clone(&registry.advanced()[0]);

        registry.reload(&[], &settings());
        assert!(registry.advanced().is_empty());

        registry.reload(&names(&["usernames"]), &settings());
        assert_eq!(registry.advanced().len(), 1);
        assert!(!Arc::ptr_eq(&first, &registry.advanced()[0]));
    }

    #[test]
    fn unknown_filter_names_are_ignored_without_churn() {
        let mut registry = FilterRegistry::new();
        registry.reload(&names(&["no-such-filter", "usernames"]), &settings());
        assert_eq!(registry.advanced().len(), 1);

        registry.reload(&names(&["no-such-filter", "usernames"]), &settings());
        assert_eq!(registry.advanced().len(), 1);
    }

    #[test]
    fn topic_tier_follows_discovery_order() {
        let mut registry = FilterRegistry::new();
        let processors = ProcessorRegistry::with_defaults();

        // Enablement order deliberately reversed.
        let enabled = HashSet::from(["Koji".to_string(), "Bodhi".to_string()]);
        registry.reload_topic_filters(&enabled, &processors);

        let order: Vec<&str> = registry
            .topic_filters()
            .iter()
            .map(|tf| tf.processor_name.as_str())
            .collect();
        assert_eq!(order, vec!["Bodhi", "Koji"]);
    }
}
