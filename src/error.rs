//! Rule compilation errors.

use thiserror::Error;

/// Errors reported synchronously by rule compilation.
///
/// Runtime conditions (a despawned entity in a term, an empty table set)
/// are not errors: they surface as ordinary match failures during
/// evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("rule has no terms")]
    NoTerms,

    #[error("rule cannot only have terms with Not operator")]
    OnlyNotTerms,

    #[error("too many variables in rule")]
    TooManyVariables,

    #[error("unconstrained variable '{0}'")]
    UnconstrainedVariable(String),

    #[error("missing predicate variable '{0}'")]
    MissingPredicateVariable(String),

    #[error("missing object variable '{0}'")]
    MissingObjectVariable(String),
}

pub type RuleResult<T> = Result<T, RuleError>;
