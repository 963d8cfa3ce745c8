use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Highlight window between accepting a command and applying it.
    pub action_delay: Duration,
    pub highlight_duration: Duration,
    pub feedback_duration: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            action_delay: Duration::from_secs(1),
            highlight_duration: Duration::from_secs(2),
            feedback_duration: Duration::from_secs(3),
        }
    }
}

impl EngineConfig {
    /// No visual delays; used by scripted runs.
    pub fn immediate() -> Self {
        Self {
            action_delay: Duration::ZERO,
            highlight_duration: Duration::ZERO,
            feedback_duration: Duration::ZERO,
        }
    }
}
