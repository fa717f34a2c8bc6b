/// Failures at the edges of the calculator: rule-table lookups, solver
/// configuration and profile pre-fill. The calculation stages themselves
/// never fail.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalcError {
    #[error("no tax rules available for plan year {0}")]
    UnsupportedYear(u16),

    #[error("invalid solver configuration: {0}")]
    InvalidSolverConfig(String),

    #[error("invalid profile value for {field}: {message}")]
    InvalidProfile {
        field: &'static str,
        message: String,
    },
}
