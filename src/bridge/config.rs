use crate::utils::error::{BridgeError, Result};

#[derive(Clone, Debug)]
pub struct BridgeConfig {
    /// Upper bound in bytes for all live native allocations.
    pub memory_limit: u64,
    /// Log a warning for every handle still live when the bridge is dropped.
    pub warn_on_leak: bool,
    /// Whether host finalizers dispose handles the host forgot about.
    pub finalizer_reclaims: bool,
    /// Initial layout convention for shapes crossing the boundary.
    pub row_major: bool,
}

impl BridgeConfig {
    pub fn build(self) -> Result<Self> {
        if self.memory_limit == 0 {
            return Err(BridgeError::InvalidConfig(
                "memory limit must be greater than zero".to_string(),
            ));
        }

        Ok(self)
    }

    pub fn with_memory_limit(mut self, bytes: u64) -> Self {
        self.memory_limit = bytes;
        self
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            memory_limit: u64::MAX,
            warn_on_leak: true,
            finalizer_reclaims: true,
            row_major: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::ErrorKind;

    #[test]
    fn default_is_unlimited() {
        let config = BridgeConfig::default().build().unwrap();
        assert_eq!(config.memory_limit, u64::MAX);
        assert!(config.finalizer_reclaims);
    }

    #[test]
    fn zero_limit_is_rejected() {
        let err = BridgeConfig::default()
            .with_memory_limit(0)
            .build()
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);
    }
}
