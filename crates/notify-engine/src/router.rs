//! Per-message evaluation against the two filter tiers.
//!
//! Advanced filters run first; the topic tier is the fallback. The
//! first match in either tier short-circuits; insertion order breaks
//! ties. A message matching neither tier is dropped silently, which is
//! the expected common case.

use crate::Message;
use crate::processors::Processor;
use crate::registry::FilterRegistry;

/// Which tier matched a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteMatch {
    /// An advanced filter matched on message content.
    Advanced { filter: String },
    /// A topic filter matched on the raw topic string.
    Topic { processor: String },
}

/// Evaluate a message. `processor` is the zero-or-one processor that
/// classifies its body; advanced filters that need one treat `None`
/// as no match, while the topic tier works without it.
pub fn route(
    message: &Message,
    processor: Option<&dyn Processor>,
    registry: &FilterRegistry,
) -> Option<RouteMatch> {
    for filter in registry.advanced() {
        if filter.matches(message, processor) {
            tracing::debug!(topic = %message.topic, filter = filter.name(), "Matched advanced filter");
            return Some(RouteMatch::Advanced {
                filter: filter.name().to_string(),
            });
        }
    }
    for topic_filter in registry.topic_filters() {
        if topic_filter.matches_topic(&message.topic) {
            tracing::debug!(
                topic = %message.topic,
                processor = %topic_filter.processor_name,
                "Matched topic filter"
            );
            return Some(RouteMatch::Topic {
                processor: topic_filter.processor_name.clone(),
            });
        }
    }
    tracing::debug!(topic = %message.topic, "Message matched no filters");
    None
}
