//! Environment the PCH tasks are generated in.

/// Supplies host specific settings to tasks right before they run.
pub trait Environment: Send + Sync {
    /// Search path for headers the compiler pre-includes.
    fn pre_include_search_path(&self) -> String;
}

/// Environment with fixed values, usually taken from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticEnvironment {
    pre_include_search_path: String,
}

impl StaticEnvironment {
    pub fn new(pre_include_search_path: impl Into<String>) -> Self {
        Self {
            pre_include_search_path: pre_include_search_path.into(),
        }
    }
}

impl Environment for StaticEnvironment {
    fn pre_include_search_path(&self) -> String {
        self.pre_include_search_path.clone()
    }
}
