//! # Plugin boundary: pluggable node backends.
//!
//! A [`Plugin`] provides the three factories that let the same trigger
//! vocabulary target something other than a local child process — a remote
//! host, a container, a VM — without touching the orchestration logic:
//!
//! ```text
//! create_node(id)      ──► Arc<dyn Node>          the killable target
//! create_hooks(node)   ──► Arc<dyn RuntimeHooks>  its observation surface
//! create_frac()        ──► Arc<dyn Frac>          the orchestrator to use
//! ```
//!
//! Backends register in a [`PluginRegistry`]; the registry is the closed set
//! of available backends, and resolving an unknown name fails fast with the
//! available names listed. `create_hooks` must validate it was handed its
//! own backend's node type (via [`Node::as_any`]) before wrapping it.
//!
//! ## Writing a backend
//! ```no_run
//! use std::sync::Arc;
//! use frac::{
//!     BaseHooks, Frac, FracError, LocalFrac, Node, Plugin, PluginRegistry, RuntimeHooks,
//! };
//! # struct SshNode;
//! # impl SshNode { fn connect(_: &str) -> Result<Arc<dyn Node>, FracError> { unimplemented!() } }
//!
//! struct SshPlugin;
//!
//! impl Plugin for SshPlugin {
//!     fn name(&self) -> &'static str { "ssh" }
//!
//!     fn create_node(&self, node_id: &str) -> Result<Arc<dyn Node>, FracError> {
//!         SshNode::connect(node_id)
//!     }
//!
//!     fn create_hooks(&self, node: Arc<dyn Node>) -> Result<Arc<dyn RuntimeHooks>, FracError> {
//!         // validate the node type, then wrap it...
//!         Ok(Arc::new(BaseHooks::new()))
//!     }
//!
//!     fn create_frac(&self) -> Arc<dyn Frac> {
//!         Arc::new(LocalFrac)
//!     }
//! }
//!
//! let mut registry = PluginRegistry::default();
//! registry.register(Arc::new(SshPlugin));
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::FracConfig;
use crate::error::FracError;
use crate::frac::{Frac, LocalFrac};
use crate::hooks::RuntimeHooks;
use crate::local::{split_command, FaultMode, LocalProcessNode, LocalStreamingHooks};
use crate::node::Node;

/// # Factory contract for a node backend.
///
/// All three factories must be present by construction; a backend that
/// cannot build one of them does not satisfy the trait, so the "missing
/// factory function" failure of a loadable-unit design is a compile error
/// here instead of a runtime one.
pub trait Plugin: Send + Sync + 'static {
    /// Registry name of this backend.
    fn name(&self) -> &'static str;

    /// Builds the killable target for `node_id`.
    fn create_node(&self, node_id: &str) -> Result<Arc<dyn Node>, FracError>;

    /// Builds the observation surface around `node`.
    ///
    /// Must validate that `node` is this backend's concrete type and return
    /// [`FracError::NodeTypeMismatch`] otherwise.
    fn create_hooks(&self, node: Arc<dyn Node>) -> Result<Arc<dyn RuntimeHooks>, FracError>;

    /// Builds the orchestrator for this backend.
    fn create_frac(&self) -> Arc<dyn Frac>;
}

/// Named set of available backends.
pub struct PluginRegistry {
    plugins: BTreeMap<String, Arc<dyn Plugin>>,
}

impl PluginRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            plugins: BTreeMap::new(),
        }
    }

    /// Registry with the built-in [`LocalPlugin`] registered as `"local"`.
    pub fn with_builtin(cfg: FracConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(LocalPlugin::new(cfg)));
        registry
    }

    /// Registers `plugin` under its own name, replacing any previous entry.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) {
        self.plugins.insert(plugin.name().to_string(), plugin);
    }

    /// Resolves a backend by name; unknown names fail fast with the
    /// available set listed.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Plugin>, FracError> {
        self.plugins
            .get(name)
            .cloned()
            .ok_or_else(|| FracError::PluginNotFound {
                name: name.to_string(),
                available: self.plugins.keys().cloned().collect(),
            })
    }
}

impl Default for PluginRegistry {
    /// Same as [`PluginRegistry::with_builtin`] with default configuration.
    fn default() -> Self {
        Self::with_builtin(FracConfig::default())
    }
}

/// Built-in backend: the node identifier is a local command line.
///
/// Nodes are created in [`FaultMode::Suspend`] so that the inject/resurrect
/// pairing round-trips: a resurrection resumes the stopped process instead
/// of only ever respawning it.
pub struct LocalPlugin {
    cfg: FracConfig,
}

impl LocalPlugin {
    /// Creates the local backend with the given configuration.
    pub fn new(cfg: FracConfig) -> Self {
        Self { cfg }
    }
}

impl Plugin for LocalPlugin {
    fn name(&self) -> &'static str {
        "local"
    }

    fn create_node(&self, node_id: &str) -> Result<Arc<dyn Node>, FracError> {
        let argv = split_command(node_id)?;
        Ok(Arc::new(LocalProcessNode::new(
            argv,
            FaultMode::Suspend,
            &self.cfg,
        )?))
    }

    fn create_hooks(&self, node: Arc<dyn Node>) -> Result<Arc<dyn RuntimeHooks>, FracError> {
        let actual = node.name().to_string();
        let local = node
            .as_any()
            .downcast::<LocalProcessNode>()
            .map_err(|_| FracError::NodeTypeMismatch {
                plugin: "local",
                expected: "LocalProcessNode",
                actual,
            })?;
        Ok(LocalStreamingHooks::new(local, &self.cfg))
    }

    fn create_frac(&self) -> Arc<dyn Frac> {
        Arc::new(LocalFrac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::any::Any;

    struct ForeignNode;

    #[async_trait]
    impl Node for ForeignNode {
        fn name(&self) -> &str {
            "foreign"
        }
        async fn kill(&self) -> Result<(), FracError> {
            Ok(())
        }
        async fn resurrect(&self) -> Result<(), FracError> {
            Ok(())
        }
        fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    #[test]
    fn test_unknown_plugin_fails_fast_with_available_set() {
        let registry = PluginRegistry::default();
        let err = registry.resolve("k8s").map(|_| ()).unwrap_err();
        match err {
            FracError::PluginNotFound { name, available } => {
                assert_eq!(name, "k8s");
                assert_eq!(available, vec!["local".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_local_plugin_round_trip() {
        let registry = PluginRegistry::default();
        let plugin = registry.resolve("local").unwrap();
        let node = plugin.create_node("cat -A").unwrap();
        assert_eq!(node.name(), "cat");
        plugin.create_hooks(node).unwrap();
        plugin.create_frac();
    }

    #[test]
    fn test_create_hooks_validates_node_type() {
        let registry = PluginRegistry::default();
        let plugin = registry.resolve("local").unwrap();
        let err = plugin
            .create_hooks(Arc::new(ForeignNode))
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(err, FracError::NodeTypeMismatch { .. }));
    }

    #[test]
    fn test_create_node_rejects_bad_command() {
        let registry = PluginRegistry::default();
        let plugin = registry.resolve("local").unwrap();
        assert!(matches!(
            plugin.create_node(""),
            Err(FracError::InvalidCommand { .. })
        ));
    }
}
