//! Error kinds surfaced by the planner.

/// Failures of a planning run.
///
/// Filtering and the junction cost model are pure and cannot fail, so they have no
/// variants here.
#[derive(Debug, thiserror::Error)]
pub enum DefragError {
    #[error("no matches of at least {min_match} bp survived filtering")]
    NoUsableMatches { min_match: usize },

    /// The search exhausted every branch. The closest partial state is kept for diagnostics.
    #[error(
        "no assembly within {max_count} fragments closes the target (closest: {})",
        closest_desc(.closest_cost, .closest_count)
    )]
    NoFeasibleAssembly {
        max_count: usize,
        closest_cost: Option<f64>,
        closest_count: Option<usize>,
    },

    #[error("primers for {node_id} have pair penalty {penalty:.3}, above the limit of {max:.3}")]
    PrimerPenaltyExceeded {
        node_id: String,
        penalty: f64,
        max: f64,
    },

    #[error("primer {primer} for {node_id} binds off-target in {source_id} at {start}..{end}")]
    OffTargetMismatch {
        node_id: String,
        primer: String,
        source_id: String,
        start: usize,
        end: usize,
    },

    #[error("{tool} failed for {node_id}: {cause}")]
    ExternalToolFailure {
        tool: String,
        node_id: String,
        cause: String,
        /// Killed after running past its deadline.
        timed_out: bool,
    },
}

impl DefragError {
    pub fn tool(tool: &str, node_id: &str, cause: impl ToString) -> Self {
        DefragError::ExternalToolFailure {
            tool: tool.to_string(),
            node_id: node_id.to_string(),
            cause: cause.to_string(),
            timed_out: false,
        }
    }

    pub fn timeout(tool: &str, node_id: &str, cause: impl ToString) -> Self {
        DefragError::ExternalToolFailure {
            tool: tool.to_string(),
            node_id: node_id.to_string(),
            cause: cause.to_string(),
            timed_out: true,
        }
    }

    /// Timeouts are the only failures worth a second attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, DefragError::ExternalToolFailure { timed_out: true, .. })
    }
}

fn closest_desc(cost: &Option<f64>, count: &Option<usize>) -> String {
    match (cost, count) {
        (Some(cost), Some(count)) => format!("cost {:.2} with {} fragments", cost, count),
        _ => "nothing reachable".to_string(),
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    #[error("failed to parse config {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("invalid config value for {field}: {message}")]
    ValidationFailed { field: String, message: String },
}
