use thiserror::Error;

/// Recoverable failures.
///
/// Contract violations are not represented here: they abort through the
/// macros in [`crate::dbc`].
#[derive(Error, Debug)]
pub enum ProfugusError {
    #[error("Solver diverged at iteration {iteration}: {message}")]
    SolverDiverged { iteration: usize, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Physics constraint violated: {0}")]
    PhysicsViolation(String),

    #[error("Communication error: {0}")]
    Comm(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Linear algebra error: {0}")]
    LinAlg(String),
}

pub type ProfugusResult<T> = Result<T, ProfugusError>;
