//! Policy objects: per-subject-type decision objects exposing check methods.
//!
//! A policy *class* ([`PolicyDefinition`]) is instantiated for a
//! `(principal, subject)` pair; the resulting [`Policy`] answers check
//! methods such as `show?` or `update?`. A class may also carry a
//! [`PolicyScope`] that narrows collections down to what a principal sees.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use policygate_core::{Collection, Subject};

use crate::Principal;
use crate::config::to_check_method;

/// Name of a policy class (e.g. "PostPolicy").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyClassName(Cow<'static, str>);

impl PolicyClassName {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for PolicyClassName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for PolicyClassName {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

/// A policy instance bound to one principal and one subject.
pub trait Policy: Send + Sync {
    fn class_name(&self) -> &PolicyClassName;

    /// Check methods this policy exposes.
    fn methods(&self) -> BTreeSet<String>;

    /// Run a check method. Only called for names listed by [`Policy::methods`].
    fn check(&self, method: &str) -> anyhow::Result<bool>;
}

/// Narrows a collection to the records a principal may act upon.
pub trait PolicyScope: Send + Sync {
    fn resolve(&self, principal: &Principal, collection: &Collection) -> anyhow::Result<Collection>;
}

struct FnScope<F>(F);

impl<F> PolicyScope for FnScope<F>
where
    F: Fn(&Principal, &Collection) -> anyhow::Result<Collection> + Send + Sync,
{
    fn resolve(
        &self,
        principal: &Principal,
        collection: &Collection,
    ) -> anyhow::Result<Collection> {
        (self.0)(principal, collection)
    }
}

/// A single check-method implementation.
#[derive(Clone)]
pub struct Rule(Arc<dyn Fn(&Principal, &Subject) -> anyhow::Result<bool> + Send + Sync>);

impl Rule {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Principal, &Subject) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn allow() -> Self {
        Self::new(|_, _| Ok(true))
    }

    pub fn deny() -> Self {
        Self::new(|_, _| Ok(false))
    }

    pub fn requires_role(role: &'static str) -> Self {
        Self::new(move |principal, _| Ok(principal.has_role(role)))
    }

    /// Permit the record's owner; class-level subjects are denied.
    pub fn owner_only() -> Self {
        Self::new(|principal, subject| {
            Ok(subject
                .record()
                .is_some_and(|record| record.is_owned_by(principal.principal_id)))
        })
    }

    pub fn evaluate(&self, principal: &Principal, subject: &Subject) -> anyhow::Result<bool> {
        (self.0)(principal, subject)
    }
}

impl core::fmt::Debug for Rule {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Rule(..)")
    }
}

type Factory =
    Arc<dyn Fn(&Principal, &Subject) -> anyhow::Result<Box<dyn Policy>> + Send + Sync>;

enum Constructor {
    Rules(BTreeMap<String, Rule>),
    Factory(Factory),
}

/// A policy class: how to build policy instances, plus an optional scope.
pub struct PolicyDefinition {
    class_name: PolicyClassName,
    constructor: Constructor,
    scope: Option<Arc<dyn PolicyScope>>,
}

impl PolicyDefinition {
    /// Start a rule-table policy class with no checks.
    pub fn new(class_name: impl Into<PolicyClassName>) -> Self {
        Self {
            class_name: class_name.into(),
            constructor: Constructor::Rules(BTreeMap::new()),
            scope: None,
        }
    }

    /// A policy class backed by a custom constructor. Construction errors
    /// surface as [`crate::AuthzError::Policy`].
    pub fn from_factory<F>(class_name: impl Into<PolicyClassName>, factory: F) -> Self
    where
        F: Fn(&Principal, &Subject) -> anyhow::Result<Box<dyn Policy>> + Send + Sync + 'static,
    {
        Self {
            class_name: class_name.into(),
            constructor: Constructor::Factory(Arc::new(factory)),
            scope: None,
        }
    }

    /// Add a check. `"show"` and `"show?"` name the same method.
    pub fn rule<F>(self, method: &str, f: F) -> Self
    where
        F: Fn(&Principal, &Subject) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        self.with_rule(method, Rule::new(f))
    }

    pub fn with_rule(mut self, method: &str, rule: Rule) -> Self {
        match &mut self.constructor {
            Constructor::Rules(rules) => {
                rules.insert(to_check_method(method), rule);
            }
            Constructor::Factory(_) => {
                tracing::warn!(
                    policy = %self.class_name,
                    method,
                    "rule ignored: policy class is built by a factory"
                );
            }
        }
        self
    }

    pub fn scope<F>(self, f: F) -> Self
    where
        F: Fn(&Principal, &Collection) -> anyhow::Result<Collection> + Send + Sync + 'static,
    {
        self.with_scope(Arc::new(FnScope(f)))
    }

    pub fn with_scope(mut self, scope: Arc<dyn PolicyScope>) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn class_name(&self) -> &PolicyClassName {
        &self.class_name
    }

    /// Check methods known without building an instance.
    ///
    /// Rule-table classes list their rules; factory-built classes only
    /// reveal their methods once instantiated, so this is empty for them.
    pub fn declared_methods(&self) -> BTreeSet<String> {
        match &self.constructor {
            Constructor::Rules(rules) => rules.keys().cloned().collect(),
            Constructor::Factory(_) => BTreeSet::new(),
        }
    }

    pub fn policy_scope(&self) -> Option<Arc<dyn PolicyScope>> {
        self.scope.clone()
    }

    /// Build a policy instance for `(principal, subject)`.
    pub fn instantiate(
        self: &Arc<Self>,
        principal: &Principal,
        subject: &Subject,
    ) -> anyhow::Result<Box<dyn Policy>> {
        match &self.constructor {
            Constructor::Rules(_) => Ok(Box::new(RulePolicy {
                definition: Arc::clone(self),
                principal: principal.clone(),
                subject: subject.clone(),
            })),
            Constructor::Factory(factory) => factory(principal, subject),
        }
    }
}

impl core::fmt::Debug for PolicyDefinition {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let methods: Vec<&str> = match &self.constructor {
            Constructor::Rules(rules) => rules.keys().map(String::as_str).collect(),
            Constructor::Factory(_) => Vec::new(),
        };
        f.debug_struct("PolicyDefinition")
            .field("class_name", &self.class_name)
            .field("methods", &methods)
            .field("has_scope", &self.scope.is_some())
            .finish()
    }
}

/// Instance of a rule-table policy class.
pub struct RulePolicy {
    definition: Arc<PolicyDefinition>,
    principal: Principal,
    subject: Subject,
}

impl RulePolicy {
    fn rules(&self) -> Option<&BTreeMap<String, Rule>> {
        match &self.definition.constructor {
            Constructor::Rules(rules) => Some(rules),
            Constructor::Factory(_) => None,
        }
    }
}

impl Policy for RulePolicy {
    fn class_name(&self) -> &PolicyClassName {
        &self.definition.class_name
    }

    fn methods(&self) -> BTreeSet<String> {
        self.definition.declared_methods()
    }

    fn check(&self, method: &str) -> anyhow::Result<bool> {
        match self.rules().and_then(|rules| rules.get(method)) {
            Some(rule) => rule.evaluate(&self.principal, &self.subject),
            None => anyhow::bail!("{} has no check '{}'", self.definition.class_name, method),
        }
    }
}
