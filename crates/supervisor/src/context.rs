use crate::{Error, LifecycleState, Result, StateCell};

use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use keel_config::NodeConfig;
use keel_genesis::GenesisBlock;
use parking_lot::RwLock;
use tracing::debug;

/// Named on/off switches that the init routine may set.
///
/// Switches become read-only once the node is running.
#[derive(Debug, Default)]
pub struct FeatureSwitches {
    switches: RwLock<BTreeMap<String, bool>>,
    frozen: AtomicBool,
}

impl FeatureSwitches {
    /// Set a switch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FeaturesFrozen`] once the node is running.
    pub fn set(&self, name: impl Into<String>, enabled: bool) -> Result<()> {
        let name = name.into();
        let mut switches = self.switches.write();

        if self.frozen.load(Ordering::Acquire) {
            return Err(Error::FeaturesFrozen(name));
        }

        debug!(feature = %name, enabled, "feature switch set");
        switches.insert(name, enabled);

        Ok(())
    }

    /// Whether a switch is on. Unknown switches are off.
    #[must_use]
    pub fn is_enabled(&self, name: &str) -> bool {
        self.switches.read().get(name).copied().unwrap_or(false)
    }

    /// Whether switches can no longer change.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    pub(crate) fn freeze(&self) {
        let _switches = self.switches.write();
        self.frozen.store(true, Ordering::Release);
    }
}

struct Inner {
    config: Arc<NodeConfig>,
    genesis: GenesisBlock,
    state: Arc<StateCell>,
    features: FeatureSwitches,
    public_ip: RwLock<Option<IpAddr>>,
}

/// Everything the node's collaborators need to know about it.
///
/// Created once the genesis block is verified and shared by reference with
/// the init routine, the runtime and the modules.
#[derive(Clone)]
pub struct NodeContext {
    inner: Arc<Inner>,
}

impl NodeContext {
    pub(crate) fn new(
        config: Arc<NodeConfig>,
        genesis: GenesisBlock,
        state: Arc<StateCell>,
    ) -> Self {
        let public_ip = RwLock::new(config.public_ip);

        Self {
            inner: Arc::new(Inner {
                config,
                genesis,
                state,
                features: FeatureSwitches::default(),
                public_ip,
            }),
        }
    }

    /// The resolved configuration.
    #[must_use]
    pub fn config(&self) -> &NodeConfig {
        &self.inner.config
    }

    /// The verified genesis block.
    #[must_use]
    pub fn genesis(&self) -> &GenesisBlock {
        &self.inner.genesis
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.inner.state.get()
    }

    /// Feature switches.
    #[must_use]
    pub fn features(&self) -> &FeatureSwitches {
        &self.inner.features
    }

    /// The node's public address, as configured or observed.
    #[must_use]
    pub fn public_ip(&self) -> Option<IpAddr> {
        *self.inner.public_ip.read()
    }

    /// Record the public address observed by the runtime.
    pub fn set_public_ip(&self, ip: IpAddr) {
        debug!(%ip, "public ip observed");
        *self.inner.public_ip.write() = Some(ip);
    }
}

impl fmt::Debug for NodeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeContext")
            .field("net_version", &self.config().net_version)
            .field("genesis", &self.genesis().id())
            .field("state", &self.state())
            .field("public_ip", &self.public_ip())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_switches_freeze() {
        let features = FeatureSwitches::default();

        features.set("forging", true).unwrap();
        assert!(features.is_enabled("forging"));
        assert!(!features.is_enabled("sidechains"));

        features.freeze();

        assert!(matches!(
            features.set("forging", false),
            Err(Error::FeaturesFrozen(name)) if name == "forging"
        ));
        assert!(features.is_enabled("forging"));
    }
}
