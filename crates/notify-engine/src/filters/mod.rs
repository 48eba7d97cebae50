//! Advanced content filters.
//!
//! Each filter is a user-configurable predicate over parsed message
//! content. Filters that need slow sources (network directory lookups,
//! filesystem scans, package queries) populate their state in the
//! background and simply match nothing until the data arrives.

mod installed_packages;
mod my_packages;
mod package_list;
mod population;
mod reported_bugs;
#[cfg(test)]
mod tests;
mod usernames;

use std::sync::Arc;

use crate::Message;
use crate::processors::Processor;

pub use installed_packages::InstalledPackagesFilter;
pub use my_packages::MyPackagesFilter;
pub use package_list::PackageListFilter;
pub use population::SharedSet;
pub use reported_bugs::ReportedBugsFilter;
pub use usernames::UsernamesFilter;

/// A predicate over a message and its (optional) processor.
pub trait Filter: Send + Sync {
    /// Stable name, matching the kind it was constructed from.
    fn name(&self) -> &'static str;

    /// Whether this message is interesting. Filters that need a
    /// processor treat `None` as no match.
    fn matches(&self, message: &Message, processor: Option<&dyn Processor>) -> bool;

    /// Release owned resources before the filter is dropped.
    fn shutdown(&self) {}
}

/// A self-registered filter kind: stable name plus constructor.
///
/// The constructor receives the filter's free-text user setting
/// (empty string if none was stored).
pub struct FilterKind {
    pub name: &'static str,
    pub description: &'static str,
    constructor: fn(&str) -> Arc<dyn Filter>,
}

static KINDS: &[FilterKind] = &[
    FilterKind {
        name: "my-packages",
        description: "Messages about packages owned by the given users",
        constructor: |setting| Arc::new(MyPackagesFilter::new(setting)),
    },
    FilterKind {
        name: "reported-bugs",
        description: "Messages referencing bugs reported from this machine",
        constructor: |setting| Arc::new(ReportedBugsFilter::new(setting)),
    },
    FilterKind {
        name: "usernames",
        description: "Messages involving the given usernames",
        constructor: |setting| Arc::new(UsernamesFilter::new(setting)),
    },
    FilterKind {
        name: "package-list",
        description: "Messages involving the given packages",
        constructor: |setting| Arc::new(PackageListFilter::new(setting)),
    },
    FilterKind {
        name: "installed-packages",
        description: "Messages about packages installed on this machine",
        constructor: |setting| Arc::new(InstalledPackagesFilter::new(setting)),
    },
];

/// All known filter kinds, in registration order.
pub fn kinds() -> &'static [FilterKind] {
    KINDS
}

/// Construct a filter by kind name with its user setting.
pub fn construct(name: &str, setting: &str) -> Option<Arc<dyn Filter>> {
    KINDS
        .iter()
        .find(|kind| kind.name == name)
        .map(|kind| (kind.constructor)(setting))
}

/// Split a free-text setting into whitespace-delimited entries.
pub(crate) fn split_setting(setting: &str) -> impl Iterator<Item = &str> {
    setting.split_whitespace()
}
