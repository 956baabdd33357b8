use crate::dual::DualError;
use crate::parameter::ParameterError;
use crate::si::QuantityError;
use thiserror::Error;

/// Everything that can go wrong when creating states or solving for
/// equilibria.
///
/// Solvers never panic on bad input. Failed iterations, inputs outside
/// the domain of a model and inconsistent specifications are all
/// reported through this type.
#[derive(Error, Debug)]
pub enum EosError {
    // iterations
    #[error("`{0}` reached its iteration limit without converging.")]
    NotConverged(String),
    #[error("`{0}` produced non-finite or unphysical iterates.")]
    IterationFailed(String),
    #[error("The iteration collapsed onto a trivial solution.")]
    TrivialSolution,
    #[error("The system is supercritical.")]
    SuperCritical,
    #[error("The stability analysis found no phase split.")]
    NoPhaseSplit,
    #[error("Linear solve failed: {0}")]
    LinAlgError(String),

    // inputs
    #[error("The model has {0} components, the input has {1}.")]
    IncompatibleComponents(usize, usize),
    #[error("{0}: {1} = {2} is not allowed.")]
    InvalidState(String, String, f64),
    #[error("The state is not uniquely specified: {0}")]
    UndeterminedState(String),
    #[error("Expected a quantity in {0}, got {1}.")]
    WrongUnits(String, String),
    #[error("The model does not provide {0}.")]
    MissingCapability(String),
    #[error("The states belong to different model instances.")]
    IncompatibleModels,

    // wrapped
    #[error(transparent)]
    Domain(#[from] DualError),
    #[error(transparent)]
    UnitMismatch(#[from] QuantityError),
    #[error(transparent)]
    ParameterError(#[from] ParameterError),
    #[cfg(feature = "rayon")]
    #[error(transparent)]
    RayonError(#[from] rayon::ThreadPoolBuildError),
}

pub type EosResult<T> = Result<T, EosError>;
