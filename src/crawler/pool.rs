//! Network identity pools
//!
//! Each crawl run uses one user agent and one proxy, drawn at random from
//! the configured lists.

use crate::config::NetworkConfig;
use crate::ScoutError;
use rand::seq::IndexedRandom;

#[derive(Debug, Clone)]
pub struct NetworkPool {
    user_agents: Vec<String>,
    proxies: Vec<String>,
    allow_direct: bool,
}

impl NetworkPool {
    pub fn new(config: &NetworkConfig) -> Self {
        Self {
            user_agents: config.user_agents.clone(),
            proxies: config.proxies.clone(),
            allow_direct: config.allow_direct,
        }
    }

    /// Picks a user agent at random
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The chosen user-agent string
    /// * `Err(ScoutError::NoUserAgents)` - The pool is empty
    pub fn pick_user_agent(&self) -> Result<String, ScoutError> {
        self.user_agents
            .choose(&mut rand::rng())
            .cloned()
            .ok_or(ScoutError::NoUserAgents)
    }

    /// Picks a proxy at random
    ///
    /// `Ok(None)` means a direct connection, only possible when the pool is
    /// empty and direct connections are allowed.
    pub fn pick_proxy(&self) -> Result<Option<String>, ScoutError> {
        match self.proxies.choose(&mut rand::rng()) {
            Some(proxy) => Ok(Some(proxy.clone())),
            None if self.allow_direct => Ok(None),
            None => Err(ScoutError::NoProxies),
        }
    }
}
