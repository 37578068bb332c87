use courier_kernel::{CapabilityProbe, CapabilitySource};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A scriptable capability source.
///
/// Clones share state, so a test can keep a handle after giving one to a
/// [`CapabilityProbe`] and still change the environment or read how often it
/// was asked.
#[derive(Clone, Default)]
pub struct StubEnvironment {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    types: RwLock<BTreeSet<String>>,
    config: RwLock<BTreeMap<String, String>>,
    type_probes: AtomicUsize,
    config_probes: AtomicUsize,
    value_reads: AtomicUsize,
}

impl StubEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(self, name: &str) -> Self {
        self.set_type(name, true);
        self
    }

    pub fn with_config(self, key: &str, value: &str) -> Self {
        self.set_config(key, Some(value));
        self
    }

    pub fn set_type(&self, name: &str, present: bool) {
        let mut types = self.inner.types.write();
        if present {
            types.insert(name.to_string());
        } else {
            types.remove(name);
        }
    }

    pub fn set_config(&self, key: &str, value: Option<&str>) {
        let mut config = self.inner.config.write();
        match value {
            Some(value) => config.insert(key.to_string(), value.to_string()),
            None => config.remove(key),
        };
    }

    /// A probe over a shared handle to this environment.
    pub fn probe(&self) -> CapabilityProbe {
        CapabilityProbe::from_source(self.clone())
    }

    /// Times a component was looked up.
    pub fn type_probes(&self) -> usize {
        self.inner.type_probes.load(Ordering::SeqCst)
    }

    /// Times a configuration key was checked for presence.
    pub fn config_probes(&self) -> usize {
        self.inner.config_probes.load(Ordering::SeqCst)
    }

    pub fn value_reads(&self) -> usize {
        self.inner.value_reads.load(Ordering::SeqCst)
    }
}

impl CapabilitySource for StubEnvironment {
    fn type_loadable(&self, name: &str) -> bool {
        self.inner.type_probes.fetch_add(1, Ordering::SeqCst);
        self.inner.types.read().contains(name)
    }

    fn has_config_value(&self, key: &str) -> bool {
        self.inner.config_probes.fetch_add(1, Ordering::SeqCst);
        self.inner.config.read().contains_key(key)
    }

    fn config_value(&self, key: &str) -> Option<String> {
        self.inner.value_reads.fetch_add(1, Ordering::SeqCst);
        self.inner.config.read().get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state_and_counters() {
        let env = StubEnvironment::new().with_type("smtp");
        let probe = env.probe();

        assert!(probe.type_present("smtp"));
        env.set_config("mail.host", Some("localhost"));
        assert_eq!(probe.config_value("mail.host").as_deref(), Some("localhost"));

        assert_eq!(env.type_probes(), 1);
        assert_eq!(env.value_reads(), 1);
    }
}
