//! Bodhi update system processor.
//!
//! Topics look like `org.fedoraproject.prod.bodhi.update.request.testing`.
//! The body carries an `update` object with the update title, the
//! referenced bugs, and the builds it contains.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::{EngineError, Message, Rendered};

use super::{Processor, require_str_at, str_at};

static TOPIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^org\.fedoraproject\.(dev|stg|prod)\.bodhi\.").expect("hard-coded pattern")
});

const ICON_URL: &str = "https://apps.fedoraproject.org/img/icons/bodhi.png";

pub struct BodhiProcessor {
    pattern: &'static Regex,
}

impl BodhiProcessor {
    pub fn new() -> Self {
        Self { pattern: &TOPIC }
    }

    /// Bug numbers referenced by the update, if any.
    pub fn bug_ids(message: &Message) -> HashSet<u64> {
        message
            .body
            .pointer("/update/bugs")
            .and_then(|v| v.as_array())
            .map(|bugs| {
                bugs.iter()
                    .filter_map(|bug| bug.get("bz_id").and_then(|id| id.as_u64()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Default for BodhiProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for BodhiProcessor {
    fn name(&self) -> &'static str {
        "Bodhi"
    }

    fn description(&self) -> &'static str {
        "Fedora package update notices"
    }

    fn link(&self) -> &'static str {
        "https://bodhi.fedoraproject.org"
    }

    fn topic_pattern(&self) -> &Regex {
        self.pattern
    }

    fn render(&self, message: &Message) -> Result<Rendered, EngineError> {
        let update = require_str_at(&message.body, "/update/title")?;
        let action = message
            .topic
            .rsplit_once(".bodhi.")
            .map(|(_, action)| action.replace('.', " "))
            .unwrap_or_default();
        let agent = str_at(&message.body, "/agent");
        let subtitle = if agent.is_empty() {
            format!("{update}: {action}")
        } else {
            format!("{agent}: {update} {action}")
        };
        Ok(Rendered {
            title: "bodhi".to_string(),
            subtitle,
            link: format!("https://bodhi.fedoraproject.org/updates/{update}"),
            icon_url: ICON_URL.to_string(),
            secondary_icon_url: str_at(&message.body, "/avatar"),
        })
    }

    fn usernames(&self, message: &Message) -> HashSet<String> {
        let mut names = HashSet::new();
        for pointer in ["/agent", "/update/user/name", "/update/submitter"] {
            let name = str_at(&message.body, pointer);
            if !name.is_empty() {
                names.insert(name);
            }
        }
        names
    }

    fn packages(&self, message: &Message) -> HashSet<String> {
        message
            .body
            .pointer("/update/builds")
            .and_then(|v| v.as_array())
            .map(|builds| {
                builds
                    .iter()
                    .filter_map(|build| build.get("nvr").and_then(|nvr| nvr.as_str()))
                    .filter_map(package_from_nvr)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Strip `-version-release` from an NVR, leaving the package name.
fn package_from_nvr(nvr: &str) -> Option<String> {
    let (rest, _release) = nvr.rsplit_once('-')?;
    let (name, _version) = rest.rsplit_once('-')?;
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::package_from_nvr;

    #[test]
    fn nvr_splitting() {
        assert_eq!(package_from_nvr("foo-1.0-1.fc40").as_deref(), Some("foo"));
        assert_eq!(
            package_from_nvr("python-requests-2.31.0-3.fc40").as_deref(),
            Some("python-requests")
        );
        assert_eq!(package_from_nvr("no-dashes"), None);
    }
}
