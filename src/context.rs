use std::path::PathBuf;
use std::sync::Arc;

use crate::client::RestClient;
use crate::config::OctaneConfig;
use crate::error::Result;
use crate::plugin::PluginServices;

/// Everything a service needs to operate: configuration, the REST client, and
/// the plugin callbacks. Passed explicitly to each service constructor; there
/// is no global state.
pub struct SdkContext {
    config: OctaneConfig,
    rest: RestClient,
    plugin: Arc<dyn PluginServices>,
}

impl SdkContext {
    /// Builds a context, validating the configuration.
    pub fn new(config: OctaneConfig, plugin: Arc<dyn PluginServices>) -> Result<Self> {
        config.validate()?;
        let rest = RestClient::new(&config)?;
        Ok(Self {
            config,
            rest,
            plugin,
        })
    }

    pub fn config(&self) -> &OctaneConfig {
        &self.config
    }

    pub fn rest(&self) -> &RestClient {
        &self.rest
    }

    pub fn plugin(&self) -> &dyn PluginServices {
        &*self.plugin
    }

    /// Spool subdirectory for one durable queue, when spooling is configured.
    pub fn spool_subdir(&self, name: &str) -> Option<PathBuf> {
        self.config.spool_dir.as_ref().map(|dir| dir.join(name))
    }
}
