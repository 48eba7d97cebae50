//! Filter for messages referencing bugs reported from this machine.
//!
//! Bug numbers are scraped from the local ABRT spool directory, where
//! every crash that was filed upstream leaves a `reported_to` record
//! with a `Bugzilla: URL=...=<bug>` line. Only Bodhi updates carry
//! bug references, so other message types never match.

use std::collections::HashSet;
use std::path::PathBuf;

use crate::processors::{BodhiProcessor, Processor};
use crate::{EngineError, Message};

use super::{Filter, SharedSet};

pub struct ReportedBugsFilter {
    bugs: SharedSet<u64>,
}

impl ReportedBugsFilter {
    pub fn new(_setting: &str) -> Self {
        Self {
            bugs: SharedSet::populating("reported-bugs", scan_spool(default_spool_dir())),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_bugs(bugs: HashSet<u64>) -> Self {
        Self {
            bugs: SharedSet::ready(bugs),
        }
    }
}

fn default_spool_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_default()
        .join(".cache/abrt/spool")
}

async fn scan_spool(spool: PathBuf) -> Result<HashSet<u64>, EngineError> {
    let mut bugs = HashSet::new();
    let mut entries = tokio::fs::read_dir(&spool).await?;
    while let Some(entry) = entries.next_entry().await? {
        let report = entry.path().join("reported_to");
        let Ok(contents) = tokio::fs::read_to_string(&report).await else {
            continue;
        };
        for line in contents.lines() {
            if let Some(bug) = parse_bugzilla_line(line) {
                bugs.insert(bug);
            }
        }
    }
    Ok(bugs)
}

/// Extract the bug number from a `Bugzilla: ... =<num>` record line.
fn parse_bugzilla_line(line: &str) -> Option<u64> {
    if !line.starts_with("Bugzilla:") {
        return None;
    }
    line.rsplit('=').next()?.trim().parse().ok()
}

impl Filter for ReportedBugsFilter {
    fn name(&self) -> &'static str {
        "reported-bugs"
    }

    fn matches(&self, message: &Message, processor: Option<&dyn Processor>) -> bool {
        let Some(processor) = processor else {
            return false;
        };
        if processor.name() != "Bodhi" {
            return false;
        }
        BodhiProcessor::bug_ids(message)
            .iter()
            .any(|bug| self.bugs.contains(bug))
    }
}
