//! Filter for an explicit list of package names.

use std::collections::HashSet;

use crate::Message;
use crate::processors::Processor;

use super::{Filter, split_setting};

pub struct PackageListFilter {
    packages: HashSet<String>,
}

impl PackageListFilter {
    /// `setting` is a whitespace-delimited list of package names.
    pub fn new(setting: &str) -> Self {
        Self {
            packages: split_setting(setting).map(ToString::to_string).collect(),
        }
    }
}

impl Filter for PackageListFilter {
    fn name(&self) -> &'static str {
        "package-list"
    }

    fn matches(&self, message: &Message, processor: Option<&dyn Processor>) -> bool {
        let Some(processor) = processor else {
            return false;
        };
        processor
            .packages(message)
            .iter()
            .any(|package| self.packages.contains(package))
    }
}
