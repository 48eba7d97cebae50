//! Fedora Planet blog aggregator processor.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::{EngineError, Message, Rendered};

use super::{Processor, require_str_at, str_at};

static TOPIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^org\.fedoraproject\.(dev|stg|prod)\.planet\.post\.new$")
        .expect("hard-coded pattern")
});

const ICON_URL: &str = "https://apps.fedoraproject.org/img/icons/planet.png";

pub struct PlanetProcessor {
    pattern: &'static Regex,
}

impl PlanetProcessor {
    pub fn new() -> Self {
        Self { pattern: &TOPIC }
    }
}

impl Default for PlanetProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for PlanetProcessor {
    fn name(&self) -> &'static str {
        "Planet"
    }

    fn description(&self) -> &'static str {
        "New posts on the Fedora Planet blog aggregator"
    }

    fn link(&self) -> &'static str {
        "https://fedoraplanet.org"
    }

    fn topic_pattern(&self) -> &Regex {
        self.pattern
    }

    fn render(&self, message: &Message) -> Result<Rendered, EngineError> {
        let title = require_str_at(&message.body, "/post/title")?;
        let author = str_at(&message.body, "/username");
        Ok(Rendered {
            title: "planet".to_string(),
            subtitle: format!("{author}: {title}"),
            link: str_at(&message.body, "/post/link"),
            icon_url: ICON_URL.to_string(),
            secondary_icon_url: str_at(&message.body, "/face"),
        })
    }

    fn usernames(&self, message: &Message) -> HashSet<String> {
        let username = str_at(&message.body, "/username");
        if username.is_empty() {
            HashSet::new()
        } else {
            HashSet::from([username])
        }
    }
}
