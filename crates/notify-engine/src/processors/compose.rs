//! Release-engineering compose processor.

use std::sync::LazyLock;

use regex::Regex;

use crate::{EngineError, Message, Rendered};

use super::{Processor, require_str_at, str_at};

static TOPIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^org\.fedoraproject\.(dev|stg|prod)\.compose\.").expect("hard-coded pattern")
});

const ICON_URL: &str = "https://apps.fedoraproject.org/img/icons/fedora.png";

pub struct ComposeProcessor {
    pattern: &'static Regex,
}

impl ComposeProcessor {
    pub fn new() -> Self {
        Self { pattern: &TOPIC }
    }
}

impl Default for ComposeProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for ComposeProcessor {
    fn name(&self) -> &'static str {
        "Compose"
    }

    fn description(&self) -> &'static str {
        "Fedora distribution compose runs"
    }

    fn link(&self) -> &'static str {
        "https://kojipkgs.fedoraproject.org/compose"
    }

    fn topic_pattern(&self) -> &Regex {
        self.pattern
    }

    fn render(&self, message: &Message) -> Result<Rendered, EngineError> {
        let branch = require_str_at(&message.body, "/branch")?;
        let stage = message
            .topic
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .to_string();
        let arch = str_at(&message.body, "/arch");
        let subtitle = if arch.is_empty() {
            format!("compose of {branch} {stage}")
        } else {
            format!("compose of {branch} ({arch}) {stage}")
        };
        Ok(Rendered {
            title: "compose".to_string(),
            subtitle,
            link: String::new(),
            icon_url: ICON_URL.to_string(),
            secondary_icon_url: String::new(),
        })
    }
}
