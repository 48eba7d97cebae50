//! Filter for messages involving specific usernames.

use std::collections::HashSet;

use crate::Message;
use crate::processors::Processor;

use super::{Filter, split_setting};

pub struct UsernamesFilter {
    usernames: HashSet<String>,
}

impl UsernamesFilter {
    /// `setting` is a whitespace-delimited list of usernames.
    pub fn new(setting: &str) -> Self {
        Self {
            usernames: split_setting(setting).map(ToString::to_string).collect(),
        }
    }
}

impl Filter for UsernamesFilter {
    fn name(&self) -> &'static str {
        "usernames"
    }

    fn matches(&self, message: &Message, processor: Option<&dyn Processor>) -> bool {
        let Some(processor) = processor else {
            return false;
        };
        processor
            .usernames(message)
            .iter()
            .any(|name| self.usernames.contains(name))
    }
}
