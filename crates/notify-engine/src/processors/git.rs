//! Package SCM processor for dist-git commit messages.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::{EngineError, Message, Rendered};

use super::{Processor, require_str_at, str_at};

static TOPIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^org\.fedoraproject\.(dev|stg|prod)\.git\.receive").expect("hard-coded pattern")
});

const ICON_URL: &str = "https://apps.fedoraproject.org/img/icons/git-logo.png";

pub struct GitProcessor {
    pattern: &'static Regex,
}

impl GitProcessor {
    pub fn new() -> Self {
        Self { pattern: &TOPIC }
    }
}

impl Default for GitProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for GitProcessor {
    fn name(&self) -> &'static str {
        "Git"
    }

    fn description(&self) -> &'static str {
        "Fedora package source commits"
    }

    fn link(&self) -> &'static str {
        "https://src.fedoraproject.org"
    }

    fn topic_pattern(&self) -> &Regex {
        self.pattern
    }

    fn render(&self, message: &Message) -> Result<Rendered, EngineError> {
        let repo = require_str_at(&message.body, "/commit/repo")?;
        let username = str_at(&message.body, "/commit/username");
        let summary = str_at(&message.body, "/commit/summary");
        let branch = str_at(&message.body, "/commit/branch");
        let rev = str_at(&message.body, "/commit/rev");
        Ok(Rendered {
            title: "git".to_string(),
            subtitle: format!("{username} pushed to {repo} ({branch}): {summary}"),
            link: format!("https://src.fedoraproject.org/rpms/{repo}/c/{rev}"),
            icon_url: ICON_URL.to_string(),
            secondary_icon_url: String::new(),
        })
    }

    fn usernames(&self, message: &Message) -> HashSet<String> {
        let username = str_at(&message.body, "/commit/username");
        if username.is_empty() {
            HashSet::new()
        } else {
            HashSet::from([username])
        }
    }

    fn packages(&self, message: &Message) -> HashSet<String> {
        let repo = str_at(&message.body, "/commit/repo");
        if repo.is_empty() {
            HashSet::new()
        } else {
            HashSet::from([repo])
        }
    }
}
