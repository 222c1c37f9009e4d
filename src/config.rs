/// Configuration for a bump [`Arena`](crate::arena::Arena)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Size of the first chunk (default: 8KB)
    pub initial_chunk_size: usize,

    /// Chunks double in size until they reach this cap (default: 1MB)
    pub max_chunk_size: usize,

    /// Upper bound on the total bytes reserved by the arena (default: none)
    pub memory_limit: Option<usize>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            initial_chunk_size: 8 * 1024, // 8KB
            max_chunk_size: 1024 * 1024, // 1MB
            memory_limit: None,
        }
    }
}

impl ArenaConfig {
    /// Set the size of the first chunk
    pub fn initial_chunk_size(mut self, size: usize) -> Self {
        self.initial_chunk_size = size;
        self
    }

    /// Set the maximum chunk size
    pub fn max_chunk_size(mut self, size: usize) -> Self {
        self.max_chunk_size = size;
        self
    }

    /// Cap the total memory the arena may reserve
    pub fn memory_limit(mut self, limit: usize) -> Self {
        self.memory_limit = Some(limit);
        self
    }
}

/// Configuration for a [`DeltaMemStore`](crate::delta::DeltaMemStore)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeltaStoreConfig {
    /// Arena holding the copied change lists
    pub arena: ArenaConfig,
}

impl DeltaStoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the backing arena
    pub fn arena(mut self, config: ArenaConfig) -> Self {
        self.arena = config;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides_defaults() {
        let config = DeltaStoreConfig::new().arena(
            ArenaConfig::default()
                .initial_chunk_size(64)
                .max_chunk_size(256)
                .memory_limit(1024),
        );

        assert_eq!(config.arena.initial_chunk_size, 64);
        assert_eq!(config.arena.max_chunk_size, 256);
        assert_eq!(config.arena.memory_limit, Some(1024));
    }

    #[test]
    fn test_defaults() {
        let config = ArenaConfig::default();
        assert_eq!(config.initial_chunk_size, 8 * 1024);
        assert_eq!(config.max_chunk_size, 1024 * 1024);
        assert!(config.memory_limit.is_none());
    }
}
