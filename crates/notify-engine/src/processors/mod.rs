//! Message-type processors.
//!
//! A processor knows how to recognize one family of bus topics, render
//! a message into human-readable notification fields, and answer
//! queries about the usernames and packages a message involves.

mod bodhi;
mod compose;
mod git;
mod koji;
mod planet;

use std::collections::HashSet;
use std::sync::Arc;

use regex::Regex;

use crate::{EngineError, Message, Rendered};

pub use bodhi::BodhiProcessor;
pub use compose::ComposeProcessor;
pub use git::GitProcessor;
pub use koji::KojiProcessor;
pub use planet::PlanetProcessor;

/// One family of message types.
pub trait Processor: Send + Sync {
    /// Stable name, used for the topic-tier enablement set.
    fn name(&self) -> &'static str;

    /// Human-readable description for the configuration surface.
    fn description(&self) -> &'static str;

    /// Link to the service this processor covers.
    fn link(&self) -> &'static str;

    /// Compiled pattern over the raw topic string.
    fn topic_pattern(&self) -> &Regex;

    fn handles(&self, message: &Message) -> bool {
        self.topic_pattern().is_match(&message.topic)
    }

    /// Render notification fields from the message body.
    fn render(&self, message: &Message) -> Result<Rendered, EngineError>;

    /// Usernames the message involves.
    fn usernames(&self, message: &Message) -> HashSet<String> {
        let _ = message;
        HashSet::new()
    }

    /// Package names the message involves.
    fn packages(&self, message: &Message) -> HashSet<String> {
        let _ = message;
        HashSet::new()
    }
}

/// All known processors, in discovery order.
pub struct ProcessorRegistry {
    processors: Vec<Arc<dyn Processor>>,
}

impl ProcessorRegistry {
    pub fn empty() -> Self {
        Self {
            processors: Vec::new(),
        }
    }

    /// The built-in processor set.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(BodhiProcessor::new()));
        registry.register(Arc::new(KojiProcessor::new()));
        registry.register(Arc::new(GitProcessor::new()));
        registry.register(Arc::new(PlanetProcessor::new()));
        registry.register(Arc::new(ComposeProcessor::new()));
        registry
    }

    pub fn register(&mut self, processor: Arc<dyn Processor>) {
        self.processors.push(processor);
    }

    /// Zero-or-one processor that handles this message.
    pub fn processor_for(&self, message: &Message) -> Option<Arc<dyn Processor>> {
        self.processors.iter().find(|p| p.handles(message)).cloned()
    }

    /// Processors in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Processor>> {
        self.processors.iter()
    }
}

/// String at a JSON pointer, or empty.
pub(crate) fn str_at(body: &serde_json::Value, pointer: &str) -> String {
    body.pointer(pointer)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

/// Non-empty string at a JSON pointer, or a malformed-body error.
pub(crate) fn require_str_at(
    body: &serde_json::Value,
    pointer: &'static str,
) -> Result<String, EngineError> {
    body.pointer(pointer)
        .and_then(|v| v.as_str())
        .map(ToString::to_string)
        .ok_or(EngineError::MalformedBody(pointer))
}
