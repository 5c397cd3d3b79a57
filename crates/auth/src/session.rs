use std::collections::{BTreeMap, BTreeSet};

use policygate_core::{Collection, Subject};

use crate::authorize::{AuthorizeOptions, Authorizer};
use crate::policy::PolicyClassName;
use crate::{AuthzError, Principal};

/// A principal, a subject and an optional policy class bound together, so
/// repeated checks (e.g. while iterating records) need not restate them.
///
/// The policy class override is fixed at construction; principal and subject
/// can be swapped with the fluent setters. Single-owner: not meant to be
/// shared across threads while the subject is being replaced.
#[derive(Debug, Clone)]
pub struct AuthorizationSession {
    authorizer: Authorizer,
    principal: Option<Principal>,
    subject: Subject,
    policy_class: Option<PolicyClassName>,
}

impl AuthorizationSession {
    pub fn new(
        authorizer: Authorizer,
        principal: Option<Principal>,
        subject: Subject,
        policy_class: Option<PolicyClassName>,
    ) -> Self {
        Self {
            authorizer,
            principal,
            subject,
            policy_class,
        }
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    pub fn policy_class(&self) -> Option<&PolicyClassName> {
        self.policy_class.as_ref()
    }

    pub fn set_subject(&mut self, subject: impl Into<Subject>) -> &mut Self {
        self.subject = subject.into();
        self
    }

    pub fn set_principal(&mut self, principal: Option<Principal>) -> &mut Self {
        self.principal = principal;
        self
    }

    pub fn authorize(&self, action: &str, options: AuthorizeOptions) -> Result<bool, AuthzError> {
        self.authorizer.authorize(
            self.principal(),
            &self.subject,
            action,
            self.policy_class(),
            options,
        )
    }

    pub fn authorize_action(
        &self,
        alias: &str,
        options: AuthorizeOptions,
    ) -> Result<bool, AuthzError> {
        self.authorizer.authorize_action(
            self.principal(),
            &self.subject,
            alias,
            self.policy_class(),
            options,
        )
    }

    /// Scope `collection` through the override class when one is set,
    /// otherwise through the collection's own subject type.
    pub fn apply_policy(&self, collection: Collection) -> Result<Collection, AuthzError> {
        match &self.policy_class {
            Some(policy_class) => {
                self.authorizer
                    .apply_custom_policy_scope(self.principal(), collection, policy_class)
            }
            None => self.authorizer.apply_policy_scope(self.principal(), collection),
        }
    }

    pub fn defined_methods(
        &self,
        options: AuthorizeOptions,
    ) -> Result<BTreeSet<String>, AuthzError> {
        self.authorizer.defined_methods(
            self.principal(),
            &self.subject,
            self.policy_class(),
            options,
        )
    }

    pub fn has_method(&self, method: &str, options: AuthorizeOptions) -> Result<bool, AuthzError> {
        self.authorizer.has_method(
            self.principal(),
            &self.subject,
            method,
            self.policy_class(),
            options,
        )
    }

    pub fn authorized_methods(&self) -> Result<BTreeMap<&'static str, bool>, AuthzError> {
        self.authorizer
            .authorized_methods(self.principal(), &self.subject)
    }
}
