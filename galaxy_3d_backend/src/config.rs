/// Backend configuration

/// When command validation happens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Validate handles, ranges and pass transitions as each command is recorded.
    /// Invalid commands are refused and never reach the queue.
    Eager,
    /// Record everything; the executor reports violations when the batch runs
    Deferred,
}

/// Configuration for a `DriverApi`
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Application name (used in log output)
    pub app_name: String,
    /// Validation strategy for recorded commands
    pub validation: ValidationMode,
}

impl BackendConfig {
    /// Same configuration with a different validation mode
    pub fn with_validation(mut self, validation: ValidationMode) -> Self {
        self.validation = validation;
        self
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            app_name: "Galaxy3D Application".to_string(),
            validation: if cfg!(debug_assertions) {
                ValidationMode::Eager
            } else {
                ValidationMode::Deferred
            },
        }
    }
}
