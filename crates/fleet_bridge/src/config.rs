//! Bridge configuration.

/// Default WebSocket listen address.
pub const DEFAULT_LISTEN: &str = "0.0.0.0:3001";

/// Default machine server address.
pub const DEFAULT_RPC_ADDR: &str = "127.0.0.1:50051";

/// Default WebSocket path.
pub const DEFAULT_PATH: &str = "/machine";

/// Configuration for the bridge process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Address the WebSocket listener binds to.
    pub listen: String,
    /// Address of the machine server.
    pub rpc_addr: String,
    /// Request path clients must upgrade on.
    pub path: String,
}

impl BridgeConfig {
    /// Override the listen address.
    #[must_use]
    pub fn with_listen(mut self, listen: impl Into<String>) -> Self {
        self.listen = listen.into();
        self
    }

    /// Override the machine server address.
    #[must_use]
    pub fn with_rpc_addr(mut self, rpc_addr: impl Into<String>) -> Self {
        self.rpc_addr = rpc_addr.into();
        self
    }

    /// Override the WebSocket path. A missing leading `/` is added.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };
        self
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
            rpc_addr: DEFAULT_RPC_ADDR.to_string(),
            path: DEFAULT_PATH.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.listen, "0.0.0.0:3001");
        assert_eq!(config.rpc_addr, "127.0.0.1:50051");
        assert_eq!(config.path, "/machine");
    }

    #[test]
    fn test_path_gets_leading_slash() {
        assert_eq!(BridgeConfig::default().with_path("ws/machine").path, "/ws/machine");
        assert_eq!(BridgeConfig::default().with_path("/m").path, "/m");
    }
}
