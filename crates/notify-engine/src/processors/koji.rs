//! Koji build system processor.
//!
//! Covers `org.fedoraproject.*.buildsys.*` topics, most importantly
//! `buildsys.build.state.change`.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::{EngineError, Message, Rendered};

use super::{Processor, require_str_at, str_at};

static TOPIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^org\.fedoraproject\.(dev|stg|prod)\.buildsys\.").expect("hard-coded pattern")
});

const ICON_URL: &str = "https://apps.fedoraproject.org/img/icons/koji.png";

/// Build states as reported by koji.
fn state_label(state: Option<u64>) -> &'static str {
    match state {
        Some(0) => "started",
        Some(1) => "completed",
        Some(2) => "was deleted",
        Some(3) => "failed",
        Some(4) => "was cancelled",
        _ => "changed state",
    }
}

pub struct KojiProcessor {
    pattern: &'static Regex,
}

impl KojiProcessor {
    pub fn new() -> Self {
        Self { pattern: &TOPIC }
    }
}

impl Default for KojiProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for KojiProcessor {
    fn name(&self) -> &'static str {
        "Koji"
    }

    fn description(&self) -> &'static str {
        "Fedora build system events"
    }

    fn link(&self) -> &'static str {
        "https://koji.fedoraproject.org"
    }

    fn topic_pattern(&self) -> &Regex {
        self.pattern
    }

    fn render(&self, message: &Message) -> Result<Rendered, EngineError> {
        let name = require_str_at(&message.body, "/name")?;
        let version = str_at(&message.body, "/version");
        let release = str_at(&message.body, "/release");
        let state = message.body.pointer("/new").and_then(|v| v.as_u64());
        let subtitle = format!("{name}-{version}-{release} {}", state_label(state));
        let link = message
            .body
            .pointer("/build_id")
            .and_then(|v| v.as_u64())
            .map(|id| format!("https://koji.fedoraproject.org/koji/buildinfo?buildID={id}"))
            .unwrap_or_default();
        Ok(Rendered {
            title: "koji".to_string(),
            subtitle,
            link,
            icon_url: ICON_URL.to_string(),
            secondary_icon_url: String::new(),
        })
    }

    fn usernames(&self, message: &Message) -> HashSet<String> {
        let owner = str_at(&message.body, "/owner");
        if owner.is_empty() {
            HashSet::new()
        } else {
            HashSet::from([owner])
        }
    }

    fn packages(&self, message: &Message) -> HashSet<String> {
        let name = str_at(&message.body, "/name");
        if name.is_empty() {
            HashSet::new()
        } else {
            HashSet::from([name])
        }
    }
}
