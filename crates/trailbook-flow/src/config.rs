//! Workflow configuration.

use derive_builder::Builder;

/// Configuration for the deletion workflow.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct WorkflowConfig {
    /// Restore the original two-choice message-photo deletion that offers
    /// the destructive option without a cross-reference check. Off by
    /// default: the check runs first and blocks on outside usages.
    #[builder(default = "false")]
    pub legacy_message_path: bool,

    /// Cap on the number of blocking references surfaced to the operator
    /// (0 = unlimited). Truncates the presented list, never the gating
    /// decision.
    #[builder(default = "0")]
    pub max_blocking_refs: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            legacy_message_path: false,
            max_blocking_refs: 0,
        }
    }
}

impl WorkflowConfig {
    /// Create a new config builder.
    pub fn builder() -> WorkflowConfigBuilder {
        WorkflowConfigBuilder::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = WorkflowConfig::default();
        assert!(!config.legacy_message_path);
        assert_eq!(config.max_blocking_refs, 0);
    }

    #[test]
    fn test_config_builder() {
        let config = WorkflowConfig::builder()
            .legacy_message_path(true)
            .max_blocking_refs(5usize)
            .build()
            .unwrap();
        assert!(config.legacy_message_path);
        assert_eq!(config.max_blocking_refs, 5);
    }
}
