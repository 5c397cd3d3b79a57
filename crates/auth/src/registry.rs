//! Policy resolution: subject type → policy class → policy instance.
//!
//! Resolution by subject type is explicit: the registry either has a binding
//! for the type or it does not. A missing binding is a typed outcome
//! ([`Resolution::NotDefined`]) rather than an error; the facade decides what
//! that means under the current strictness.

use std::collections::HashMap;
use std::sync::Arc;

use policygate_core::{Subject, SubjectType};

use crate::policy::{Policy, PolicyClassName, PolicyDefinition, PolicyScope};
use crate::{AuthzError, Principal};

/// Outcome of resolving a policy by subject type.
pub enum Resolution {
    Found(Box<dyn Policy>),
    /// No policy class is bound to the subject's type.
    NotDefined,
    /// The subject type is registered as exempt: checks are skipped.
    Exempt,
}

impl core::fmt::Debug for Resolution {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Found(policy) => f
                .debug_tuple("Found")
                .field(policy.class_name())
                .finish(),
            Self::NotDefined => f.write_str("NotDefined"),
            Self::Exempt => f.write_str("Exempt"),
        }
    }
}

/// Outcome of resolving a policy class (not an instance) by subject type.
#[derive(Debug)]
pub enum ClassResolution {
    Found(Arc<PolicyDefinition>),
    NotDefined,
    Exempt,
}

/// Outcome of resolving a scope by subject type.
pub enum ScopeResolution {
    Found(Arc<dyn PolicyScope>),
    NotDefined,
}

#[derive(Debug, Clone)]
enum Binding {
    Class(PolicyClassName),
    Exempt,
}

/// Registry of policy classes and their subject-type bindings.
///
/// Built once at startup, then shared read-only.
#[derive(Debug, Default)]
pub struct PolicyRegistry {
    bindings: HashMap<SubjectType, Binding>,
    classes: HashMap<PolicyClassName, Arc<PolicyDefinition>>,
}

impl PolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a policy class and bind it to `subject_type`.
    pub fn register(mut self, subject_type: SubjectType, definition: PolicyDefinition) -> Self {
        let class_name = definition.class_name().clone();
        self.bindings.insert(subject_type, Binding::Class(class_name));
        self.add_class_mut(definition);
        self
    }

    /// Add a policy class reachable only through an explicit override.
    pub fn add_class(mut self, definition: PolicyDefinition) -> Self {
        self.add_class_mut(definition);
        self
    }

    /// Tolerate `subject_type` without a policy: checks against it are skipped.
    pub fn exempt(mut self, subject_type: SubjectType) -> Self {
        self.bindings.insert(subject_type, Binding::Exempt);
        self
    }

    fn add_class_mut(&mut self, definition: PolicyDefinition) {
        let class_name = definition.class_name().clone();
        if self
            .classes
            .insert(class_name.clone(), Arc::new(definition))
            .is_some()
        {
            tracing::debug!(policy = %class_name, "policy class replaced");
        }
    }

    /// Look up a policy class by name.
    ///
    /// An unknown class is a lookup failure ([`AuthzError::UnknownPolicyClass`]),
    /// deliberately distinct from a missing policy.
    pub fn class(
        &self,
        class_name: &PolicyClassName,
    ) -> Result<&Arc<PolicyDefinition>, AuthzError> {
        self.classes
            .get(class_name)
            .ok_or_else(|| AuthzError::UnknownPolicyClass(class_name.clone()))
    }

    /// Find the policy class bound to the subject's type, without building it.
    pub fn resolve_definition(&self, subject: &Subject) -> ClassResolution {
        let Some(subject_type) = subject.subject_type() else {
            return ClassResolution::NotDefined;
        };

        match self.bindings.get(subject_type) {
            None => ClassResolution::NotDefined,
            Some(Binding::Exempt) => ClassResolution::Exempt,
            Some(Binding::Class(class_name)) => match self.classes.get(class_name) {
                Some(definition) => ClassResolution::Found(Arc::clone(definition)),
                None => ClassResolution::NotDefined,
            },
        }
    }

    /// Resolve a policy by the subject's type.
    ///
    /// Errors only when the bound class fails to construct.
    pub fn resolve(
        &self,
        principal: &Principal,
        subject: &Subject,
    ) -> Result<Resolution, AuthzError> {
        match self.resolve_definition(subject) {
            ClassResolution::Found(definition) => {
                Ok(Resolution::Found(definition.instantiate(principal, subject)?))
            }
            ClassResolution::NotDefined => Ok(Resolution::NotDefined),
            ClassResolution::Exempt => Ok(Resolution::Exempt),
        }
    }

    /// Build an explicitly named policy class.
    pub fn resolve_class(
        &self,
        principal: &Principal,
        subject: &Subject,
        class_name: &PolicyClassName,
    ) -> Result<Box<dyn Policy>, AuthzError> {
        Ok(self.class(class_name)?.instantiate(principal, subject)?)
    }

    /// Resolve the scope bound to `subject_type`.
    pub fn resolve_scope(&self, subject_type: &SubjectType) -> ScopeResolution {
        let scope = match self.bindings.get(subject_type) {
            Some(Binding::Class(class_name)) => self
                .classes
                .get(class_name)
                .and_then(|definition| definition.policy_scope()),
            Some(Binding::Exempt) | None => None,
        };

        match scope {
            Some(scope) => ScopeResolution::Found(scope),
            None => ScopeResolution::NotDefined,
        }
    }

    /// Resolve the scope of an explicitly named policy class.
    pub fn resolve_class_scope(
        &self,
        class_name: &PolicyClassName,
    ) -> Result<Arc<dyn PolicyScope>, AuthzError> {
        self.class(class_name)?
            .policy_scope()
            .ok_or_else(|| AuthzError::MissingScope(class_name.clone()))
    }
}

/// Run `method` on `policy`, turning a denial into an error.
///
/// Success carries no value: the decision is the absence of an error.
pub fn invoke(policy: &dyn Policy, method: &str) -> Result<(), AuthzError> {
    if !policy.methods().contains(method) {
        return Err(AuthzError::UndefinedCheck {
            policy: policy.class_name().clone(),
            method: method.to_string(),
        });
    }

    if policy.check(method)? {
        Ok(())
    } else {
        Err(AuthzError::NotAuthorized {
            policy: policy.class_name().clone(),
            method: method.to_string(),
        })
    }
}

/// Error raised when no policy is resolvable for `subject`.
pub(crate) fn not_defined_for(subject: &Subject) -> AuthzError {
    match subject.subject_type() {
        Some(subject_type) => {
            AuthzError::policy_not_defined(format!("unable to find policy for {subject_type}"))
        }
        None => AuthzError::policy_not_defined("unable to find policy for an absent subject"),
    }
}
