//! Plugin entry point: wires the filter and the resolver into the host.

use anyhow::Context;
use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;

use crate::config::{ConfigError, PluginConfig};
use crate::error::Result;
use crate::filter::limit_dependencies;
use crate::host::{Environment, Pad, Record, TemplateValue, VirtualSource};
use crate::logger;
use crate::resolve::resolve_virtual_path;
use crate::results::QueryResults;

/// The limit-dependencies plugin.
#[derive(Debug, Clone, Default)]
pub struct LimitDependencies {
    config: PluginConfig,
}

impl LimitDependencies {
    pub const NAME: &'static str = "Limit Dependencies";
    pub const DESCRIPTION: &'static str = "Limit dependencies created by queries.";

    pub fn new(config: PluginConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        logger::set_verbose(config.verbose);
        Ok(Self { config })
    }

    /// Load the plugin with the project's `configs/limit-dependencies.toml`.
    pub fn from_project(project_root: &Path) -> anyhow::Result<Self> {
        let config = PluginConfig::discover(project_root).with_context(|| {
            format!(
                "failed to load limit-dependencies config under `{}`",
                project_root.display()
            )
        })?;
        Ok(Self::new(config)?)
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    /// Virtual path namespace the frozen results live under.
    pub fn prefix(&self) -> &str {
        &self.config.prefix
    }

    /// Apply the template filter. See [`limit_dependencies`].
    pub fn filter<P, V>(&self, value: &V) -> Result<V>
    where
        P: Pad,
        V: TemplateValue<P> + Debug,
    {
        limit_dependencies::<P, V>(value, &self.config.prefix)
    }

    /// Resolve a virtual path. See [`resolve_virtual_path`].
    pub fn resolve<R: Record>(
        &self,
        record: &R,
        pieces: &[&str],
    ) -> Option<Arc<QueryResults<R::Pad>>> {
        resolve_virtual_path(record, pieces, &self.config.prefix)
    }

    /// Register the filter and the virtual path resolver with the host.
    pub fn on_setup_env<E>(self: Arc<Self>, env: &mut E)
    where
        E: Environment,
        E::Value: Debug + 'static,
    {
        let plugin = Arc::clone(&self);
        env.register_filter(
            &self.config.filter_name,
            Box::new(move |value: &E::Value| plugin.filter::<E::Pad, _>(value)),
        );

        let plugin = Arc::clone(&self);
        env.register_virtual_path_resolver(
            &self.config.prefix,
            Box::new(move |record: &<E::Pad as Pad>::Record, pieces: &[&str]| {
                plugin
                    .resolve(record, pieces)
                    .map(|results| results as Arc<dyn VirtualSource>)
            }),
        );
    }
}
