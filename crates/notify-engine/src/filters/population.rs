//! Background-populated membership sets.

use std::borrow::Borrow;
use std::collections::HashSet;
use std::hash::Hash;
use std::sync::{Arc, RwLock};

use crate::EngineError;

/// A set whose contents may arrive later from a slow source.
///
/// `contains` answers false until population completes. A failed
/// population degrades to a permanently empty set. Dropping every
/// reader while population is in flight just discards the result;
/// the loader task never blocks the routing path.
#[derive(Clone)]
pub struct SharedSet<T> {
    inner: Arc<RwLock<Option<HashSet<T>>>>,
}

impl<T> SharedSet<T>
where
    T: Eq + Hash + Send + Sync + 'static,
{
    /// A set that is already populated.
    pub fn ready(values: HashSet<T>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(values))),
        }
    }

    /// Spawn a loader task and return immediately in the
    /// "populating" state.
    pub fn populating<F>(label: &'static str, load: F) -> Self
    where
        F: Future<Output = Result<HashSet<T>, EngineError>> + Send + 'static,
    {
        let set = Self {
            inner: Arc::new(RwLock::new(None)),
        };
        let slot = Arc::clone(&set.inner);
        tokio::spawn(async move {
            let values = match load.await {
                Ok(values) => {
                    tracing::info!(label, count = values.len(), "Filter state populated");
                    values
                }
                Err(e) => {
                    tracing::warn!(label, error = %e, "Filter population failed, staying empty");
                    HashSet::new()
                }
            };
            if let Ok(mut slot) = slot.write() {
                *slot = Some(values);
            }
        });
        set
    }

    pub fn is_populated(&self) -> bool {
        self.inner.read().map(|s| s.is_some()).unwrap_or(false)
    }

    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.inner
            .read()
            .ok()
            .and_then(|slot| slot.as_ref().map(|set| set.contains(value)))
            .unwrap_or(false)
    }
}
