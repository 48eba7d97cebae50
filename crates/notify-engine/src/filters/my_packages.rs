//! Filter for packages the configured users maintain.
//!
//! Ownership is queried from the dist-git pagure API once at
//! construction. The query can take a while for prolific maintainers,
//! so it runs in the background.

use std::collections::HashSet;

use serde::Deserialize;

use crate::processors::Processor;
use crate::{EngineError, Message};

use super::{Filter, SharedSet, split_setting};

const OWNERSHIP_API: &str = "https://src.fedoraproject.org/api/0/projects";
const PAGE_SIZE: u32 = 100;

#[derive(Debug, Deserialize)]
struct ProjectsPage {
    projects: Vec<Project>,
}

#[derive(Debug, Deserialize)]
struct Project {
    name: String,
}

pub struct MyPackagesFilter {
    packages: SharedSet<String>,
}

impl MyPackagesFilter {
    /// `setting` is a whitespace-delimited list of FAS usernames.
    pub fn new(setting: &str) -> Self {
        let usernames: Vec<String> = split_setting(setting).map(ToString::to_string).collect();
        Self {
            packages: SharedSet::populating("my-packages", fetch_owned_packages(usernames)),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_packages(packages: HashSet<String>) -> Self {
        Self {
            packages: SharedSet::ready(packages),
        }
    }
}

async fn fetch_owned_packages(usernames: Vec<String>) -> Result<HashSet<String>, EngineError> {
    let client = reqwest::Client::new();
    let mut packages = HashSet::new();
    for username in &usernames {
        tracing::info!(username, "Querying the ownership directory");
        let url = format!("{OWNERSHIP_API}?owner={username}&short=true&per_page={PAGE_SIZE}");
        let page: ProjectsPage = client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        packages.extend(page.projects.into_iter().map(|p| p.name));
    }
    Ok(packages)
}

impl Filter for MyPackagesFilter {
    fn name(&self) -> &'static str {
        "my-packages"
    }

    fn matches(&self, message: &Message, processor: Option<&dyn Processor>) -> bool {
        let Some(processor) = processor else {
            return false;
        };
        processor
            .packages(message)
            .iter()
            .any(|package| self.packages.contains(package.as_str()))
    }
}
