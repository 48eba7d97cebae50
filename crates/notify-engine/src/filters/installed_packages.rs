//! Filter for packages installed on the local machine.
//!
//! The installed set is enumerated once at construction by asking the
//! system package manager. Hosts without an rpm database degrade to an
//! empty set.

use std::collections::HashSet;

use tokio::process::Command;

use crate::processors::Processor;
use crate::{EngineError, Message};

use super::{Filter, SharedSet};

pub struct InstalledPackagesFilter {
    packages: SharedSet<String>,
}

impl InstalledPackagesFilter {
    pub fn new(_setting: &str) -> Self {
        Self {
            packages: SharedSet::populating("installed-packages", query_installed()),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_packages(packages: HashSet<String>) -> Self {
        Self {
            packages: SharedSet::ready(packages),
        }
    }
}

async fn query_installed() -> Result<HashSet<String>, EngineError> {
    let output = Command::new("rpm")
        .args(["-qa", "--queryformat", "%{NAME}\n"])
        .output()
        .await?;
    if !output.status.success() {
        return Err(EngineError::Io(std::io::Error::other(format!(
            "rpm query exited with {}",
            output.status
        ))));
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout
        .lines()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ToString::to_string)
        .collect())
}

impl Filter for InstalledPackagesFilter {
    fn name(&self) -> &'static str {
        "installed-packages"
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
