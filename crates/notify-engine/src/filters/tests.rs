use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde_json::json;

use crate::processors::{Processor, ProcessorRegistry};
use crate::{EngineError, Message, Rendered};

use super::*;

static ANY_TOPIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(".*").expect("hard-coded pattern"));

/// Processor stub with fixed username/package facts.
pub(crate) struct FactProcessor {
    pub usernames: HashSet<String>,
    pub packages: HashSet<String>,
}

impl FactProcessor {
    pub fn with_packages(packages: &[&str]) -> Self {
        Self {
            usernames: HashSet::new(),
            packages: packages.iter().map(ToString::to_string).collect(),
        }
    }

    pub fn with_usernames(usernames: &[&str]) -> Self {
        Self {
            usernames: usernames.iter().map(ToString::to_string).collect(),
            packages: HashSet::new(),
        }
    }
}

impl Processor for FactProcessor {
    fn name(&self) -> &'static str {
        "Fact"
    }

    fn description(&self) -> &'static str {
        "test stub"
    }

    fn link(&self) -> &'static str {
        ""
    }

    fn topic_pattern(&self) -> &Regex {
        &ANY_TOPIC
    }

    fn render(&self, _message: &Message) -> Result<Rendered, EngineError> {
        Ok(Rendered::default())
    }

    fn usernames(&self, _message: &Message) -> HashSet<String> {
        self.usernames.clone()
    }

    fn packages(&self, _message: &Message) -> HashSet<String> {
        self.packages.clone()
    }
}

fn message() -> Message {
    Message::new("org.fedoraproject.prod.test", json!({}))
}

#[test]
fn construct_by_kind_name() {
    assert!(construct("usernames", "lmacken").is_some());
    assert!(construct("package-list", "kernel").is_some());
    assert!(construct("no-such-filter", "").is_none());
    assert_eq!(kinds().len(), 5);
}

#[test]
fn usernames_filter_matches_involved_users() {
    let filter = UsernamesFilter::new("lmacken toshio");
    let involved = FactProcessor::with_usernames(&["toshio"]);
    let uninvolved = FactProcessor::with_usernames(&["spot"]);

    assert!(filter.matches(&message(), Some(&involved)));
    assert!(!filter.matches(&message(), Some(&uninvolved)));
}

#[test]
fn package_list_filter_matches_involved_packages() {
    let filter = PackageListFilter::new("kernel chromium");
    let involved = FactProcessor::with_packages(&["kernel"]);
    let uninvolved = FactProcessor::with_packages(&["vim"]);

    assert!(filter.matches(&message(), Some(&involved)));
    assert!(!filter.matches(&message(), Some(&uninvolved)));
}

#[test]
fn filters_without_processor_never_match() {
    let filter = UsernamesFilter::new("lmacken");
    assert!(!filter.matches(&message(), None));

    let filter = PackageListFilter::new("kernel");
    assert!(!filter.matches(&message(), None));
}

#[test]
fn my_packages_matches_once_populated() {
    let filter =
        MyPackagesFilter::with_packages(HashSet::from(["foo".to_string(), "bar".to_string()]));
    let involved = FactProcessor::with_packages(&["foo"]);
    assert!(filter.matches(&message(), Some(&involved)));
}

#[test]
fn reported_bugs_matches_bodhi_bug_reference() {
    let filter = ReportedBugsFilter::with_bugs(HashSet::from([12345]));
    let registry = ProcessorRegistry::with_defaults();

    let hit = Message::new(
        "org.fedoraproject.prod.bodhi.update.request.testing",
        json!({"update": {"title": "foo-1.0-1.fc40", "bugs": [{"bz_id": 12345}]}}),
    );
    let processor = registry.processor_for(&hit).unwrap();
    assert!(filter.matches(&hit, Some(processor.as_ref())));

    let miss = Message::new(
        "org.fedoraproject.prod.bodhi.update.request.testing",
        json!({"update": {"title": "bar-1.0-1.fc40", "bugs": [{"bz_id": 999}]}}),
    );
    assert!(!filter.matches(&miss, Some(processor.as_ref())));

    // Bug references on a non-Bodhi processor are ignored.
    let other = FactProcessor::with_packages(&[]);
    assert!(!filter.matches(&hit, Some(&other)));
}

#[test]
fn installed_packages_matches_local_package() {
    let filter = InstalledPackagesFilter::with_packages(HashSet::from(["vim".to_string()]));
    let involved = FactProcessor::with_packages(&["vim"]);
    let uninvolved = FactProcessor::with_packages(&["emacs"]);

    assert!(filter.matches(&message(), Some(&involved)));
    assert!(!filter.matches(&message(), Some(&uninvolved)));
}

#[tokio::test]
async fn shared_set_is_empty_until_populated() {
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let set: SharedSet<String> = SharedSet::populating("test", async move {
        let _ = rx.await;
        Ok(HashSet::from(["ready".to_string()]))
    });

    assert!(!set.is_populated());
    assert!(!set.contains("ready"));

    tx.send(()).expect("loader alive");
    tokio::time::timeout(Duration::from_secs(1), async {
        while !set.is_populated() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("population completes");
    assert!(set.contains("ready"));
}

#[tokio::test]
async fn shared_set_failure_degrades_to_empty() {
    let set: SharedSet<String> = SharedSet::populating("test", async {
        Err(EngineError::MalformedBody("boom"))
    });

    tokio::time::timeout(Duration::from_secs(1), async {
        while !set.is_populated() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("population settles");
    assert!(!set.contains("anything"));
}

#[tokio::test]
async fn shared_set_result_discarded_when_readers_drop() {
    // Dropping the set mid-population must not panic the loader.
    let set: SharedSet<String> = SharedSet::populating("test", async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok(HashSet::from(["late".to_string()]))
    });
    drop(set);
    tokio::time::sleep(Duration::from_millis(50)).await;
}
