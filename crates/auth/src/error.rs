use thiserror::Error;

use crate::policy::PolicyClassName;

/// Authorization failure.
///
/// Triage is driven by [`AuthzError::is_policy_not_defined`]: that variant is
/// governed by strict mode, everything else by the caller's
/// `raise_on_failure` option (or, for scoping, propagates as-is).
#[derive(Debug, Error)]
pub enum AuthzError {
    /// No policy is resolvable for the subject (or no check method is
    /// configured for an action).
    #[error("policy not defined: {0}")]
    PolicyNotDefined(String),

    /// An explicit policy class override names a class that is not registered.
    #[error("unknown policy class '{0}'")]
    UnknownPolicyClass(PolicyClassName),

    /// A policy class was used for scoping but declares no scope.
    #[error("policy class '{0}' has no scope")]
    MissingScope(PolicyClassName),

    /// The resolved policy does not expose the requested check method.
    #[error("undefined check '{method}' for {policy}")]
    UndefinedCheck {
        policy: PolicyClassName,
        method: String,
    },

    /// The check ran and denied the action.
    #[error("not allowed to {method} this subject ({policy})")]
    NotAuthorized {
        policy: PolicyClassName,
        method: String,
    },

    /// Error raised by the policy's own logic, passed through untouched.
    #[error(transparent)]
    Policy(#[from] anyhow::Error),
}

impl AuthzError {
    pub fn policy_not_defined(msg: impl Into<String>) -> Self {
        Self::PolicyNotDefined(msg.into())
    }

    pub fn is_policy_not_defined(&self) -> bool {
        matches!(self, Self::PolicyNotDefined(_))
    }
}
