use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use policygate_core::{Collection, Subject};

use crate::config::{AuthorizationConfig, to_check_method};
use crate::gate::{Enforced, FeatureGate};
use crate::policy::PolicyClassName;
use crate::registry::{
    ClassResolution, PolicyRegistry, Resolution, ScopeResolution, invoke, not_defined_for,
};
use crate::session::AuthorizationSession;
use crate::{AuthzError, Principal};

/// Actions pre-computed by [`Authorizer::authorized_methods`].
pub const AUTHORIZED_ACTIONS: [&str; 5] = ["new", "edit", "update", "show", "destroy"];

/// Per-call options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizeOptions {
    /// Propagate errors other than a missing policy. When `false` they
    /// degrade to a denial (or an empty method set).
    pub raise_on_failure: bool,
}

impl Default for AuthorizeOptions {
    fn default() -> Self {
        Self {
            raise_on_failure: true,
        }
    }
}

impl AuthorizeOptions {
    pub fn no_raise() -> Self {
        Self {
            raise_on_failure: false,
        }
    }
}

/// Authorization decision facade.
///
/// Resolves a policy for a subject and runs one of its checks, triaging
/// failures in three tiers:
///
/// - missing policy: `false` (or the input unchanged), unless
///   `raise_on_missing_policy` is set
/// - any other failure: propagated, unless the caller opts out via
///   [`AuthorizeOptions::raise_on_failure`]
/// - anonymous principal or disabled feature gate: always permitted
///
/// Cheap to clone; all state is shared read-only.
#[derive(Clone)]
pub struct Authorizer {
    config: Arc<AuthorizationConfig>,
    gate: Arc<dyn FeatureGate>,
    registry: Arc<PolicyRegistry>,
}

impl Authorizer {
    /// Facade with authorization always enforced.
    pub fn new(config: AuthorizationConfig, registry: PolicyRegistry) -> Self {
        Self::from_parts(Arc::new(config), Arc::new(Enforced), Arc::new(registry))
    }

    pub fn from_parts(
        config: Arc<AuthorizationConfig>,
        gate: Arc<dyn FeatureGate>,
        registry: Arc<PolicyRegistry>,
    ) -> Self {
        Self {
            config,
            gate,
            registry,
        }
    }

    pub fn with_gate(mut self, gate: impl FeatureGate + 'static) -> Self {
        self.gate = Arc::new(gate);
        self
    }

    /// Start a session bound to a principal, a subject and an optional
    /// policy class override.
    pub fn session(
        &self,
        principal: Option<Principal>,
        subject: impl Into<Subject>,
        policy_class: Option<PolicyClassName>,
    ) -> AuthorizationSession {
        AuthorizationSession::new(self.clone(), principal, subject.into(), policy_class)
    }

    /// Decide whether `principal` may run the check method `action` on
    /// `subject`.
    ///
    /// `action` must already be a check-method name (e.g. `"update?"`).
    /// A check that runs without error permits; denial arrives as
    /// [`AuthzError::NotAuthorized`] and goes through the failure tier.
    pub fn authorize(
        &self,
        principal: Option<&Principal>,
        subject: &Subject,
        action: &str,
        policy_class: Option<&PolicyClassName>,
        options: AuthorizeOptions,
    ) -> Result<bool, AuthzError> {
        if self.gate.authorization_disabled() {
            tracing::debug!(action, "authorization disabled by feature gate");
            return Ok(true);
        }
        let Some(principal) = principal else {
            tracing::debug!(action, "anonymous principal permitted");
            return Ok(true);
        };

        let checked = self.check(principal, subject, action, policy_class);
        let allowed = self.triage(checked.map(|()| true), options, || false)?;

        tracing::debug!(
            principal = %principal.principal_id,
            action,
            allowed,
            "authorization decision"
        );
        Ok(allowed)
    }

    /// Like [`Authorizer::authorize`], but `alias` goes through the
    /// configured alias table first and gets the `?` suffix when missing.
    pub fn authorize_action(
        &self,
        principal: Option<&Principal>,
        subject: &Subject,
        alias: &str,
        policy_class: Option<&PolicyClassName>,
        options: AuthorizeOptions,
    ) -> Result<bool, AuthzError> {
        if self.gate.authorization_disabled() {
            tracing::debug!(alias, "authorization disabled by feature gate");
            return Ok(true);
        }

        let Some(action) = self.config.resolve_alias(alias) else {
            if self.config.raise_on_missing_policy {
                return Err(AuthzError::policy_not_defined("Policy method is missing"));
            }
            tracing::debug!(alias, "no check method configured; permitted");
            return Ok(true);
        };

        let method = to_check_method(action);
        self.authorize(principal, subject, &method, policy_class, options)
    }

    /// Narrow `collection` with the scope bound to its subject type.
    ///
    /// Only a missing scope is recovered (per strict mode). Errors raised by
    /// the scope itself always propagate.
    pub fn apply_policy_scope(
        &self,
        principal: Option<&Principal>,
        collection: Collection,
    ) -> Result<Collection, AuthzError> {
        if self.gate.authorization_disabled() {
            return Ok(collection);
        }
        let Some(principal) = principal else {
            return Ok(collection);
        };

        match self.registry.resolve_scope(&collection.subject_type) {
            ScopeResolution::Found(scope) => Ok(scope.resolve(principal, &collection)?),
            ScopeResolution::NotDefined => {
                self.tolerate(AuthzError::policy_not_defined(format!(
                    "unable to find scope for {}",
                    collection.subject_type
                )))?;
                Ok(collection)
            }
        }
    }

    /// Narrow `collection` with the scope of an explicit policy class.
    ///
    /// Every failure (unknown class, class without scope, scope error) falls
    /// back to the input unchanged unless strict mode is on.
    pub fn apply_custom_policy_scope(
        &self,
        principal: Option<&Principal>,
        collection: Collection,
        policy_class: &PolicyClassName,
    ) -> Result<Collection, AuthzError> {
        if self.gate.authorization_disabled() {
            return Ok(collection);
        }
        let Some(principal) = principal else {
            return Ok(collection);
        };

        let scoped = self
            .registry
            .resolve_class_scope(policy_class)
            .and_then(|scope| Ok(scope.resolve(principal, &collection)?));

        match scoped {
            Ok(scoped) => Ok(scoped),
            Err(err) => {
                self.tolerate(err)?;
                Ok(collection)
            }
        }
    }

    /// Decisions for the fixed CRUD actions, keyed by action name.
    ///
    /// Each action is resolved the way [`Authorizer::authorize_action`]
    /// resolves it, not handed to [`Authorizer::authorize`] verbatim: the
    /// mapped name gets the `?` suffix when the table omits it, and an
    /// action mapped to `null` is permitted (or rejected in strict mode)
    /// without a check. Options are the defaults, so a denied action
    /// propagates as an error.
    pub fn authorized_methods(
        &self,
        principal: Option<&Principal>,
        subject: &Subject,
    ) -> Result<BTreeMap<&'static str, bool>, AuthzError> {
        AUTHORIZED_ACTIONS
            .iter()
            .map(|&action| {
                self.authorize_action(principal, subject, action, None, AuthorizeOptions::default())
                    .map(|allowed| (action, allowed))
            })
            .collect()
    }

    /// Check methods exposed by the resolved policy.
    ///
    /// Anonymous principals still go through resolution: a missing policy
    /// follows strict mode, and the methods are read from the policy class
    /// instead of an instance. An unknown `policy_class` is a lookup
    /// failure, not a missing policy: it follows `raise_on_failure`.
    pub fn defined_methods(
        &self,
        principal: Option<&Principal>,
        subject: &Subject,
        policy_class: Option<&PolicyClassName>,
        options: AuthorizeOptions,
    ) -> Result<BTreeSet<String>, AuthzError> {
        let definition = match policy_class {
            Some(class_name) => self.registry.class(class_name).map(|d| Some(Arc::clone(d))),
            None => match self.registry.resolve_definition(subject) {
                ClassResolution::Found(definition) => Ok(Some(definition)),
                ClassResolution::Exempt => Ok(None),
                ClassResolution::NotDefined => Err(not_defined_for(subject)),
            },
        };

        let methods = definition.and_then(|definition| match (definition, principal) {
            (None, _) => Ok(BTreeSet::new()),
            (Some(definition), Some(principal)) => {
                Ok(definition.instantiate(principal, subject)?.methods())
            }
            (Some(definition), None) => Ok(definition.declared_methods()),
        });

        self.triage(methods, options, BTreeSet::new)
    }

    /// Whether `method` is among [`Authorizer::defined_methods`].
    pub fn has_method(
        &self,
        principal: Option<&Principal>,
        subject: &Subject,
        method: &str,
        policy_class: Option<&PolicyClassName>,
        options: AuthorizeOptions,
    ) -> Result<bool, AuthzError> {
        Ok(self
            .defined_methods(principal, subject, policy_class, options)?
            .contains(method))
    }

    fn check(
        &self,
        principal: &Principal,
        subject: &Subject,
        action: &str,
        policy_class: Option<&PolicyClassName>,
    ) -> Result<(), AuthzError> {
        let policy = match policy_class {
            Some(class_name) => self.registry.resolve_class(principal, subject, class_name)?,
            None => match self.registry.resolve(principal, subject)? {
                Resolution::Found(policy) => policy,
                Resolution::Exempt => {
                    tracing::debug!(action, "subject type exempt from policies; check skipped");
                    return Ok(());
                }
                Resolution::NotDefined => return Err(not_defined_for(subject)),
            },
        };

        invoke(policy.as_ref(), action)
    }

    /// Missing policy → strict mode decides; anything else → caller decides.
    fn triage<T>(
        &self,
        result: Result<T, AuthzError>,
        options: AuthorizeOptions,
        fallback: impl FnOnce() -> T,
    ) -> Result<T, AuthzError> {
        match result {
            Ok(value) => Ok(value),
            Err(err) if err.is_policy_not_defined() => {
                self.tolerate(err)?;
                Ok(fallback())
            }
            Err(err) if !options.raise_on_failure => {
                tracing::debug!(error = %err, "authorization failure suppressed");
                Ok(fallback())
            }
            Err(err) => Err(err),
        }
    }

    /// Re-raise `err` in strict mode; otherwise log and swallow it.
    fn tolerate(&self, err: AuthzError) -> Result<(), AuthzError> {
        if self.config.raise_on_missing_policy {
            return Err(err);
        }
        tracing::warn!(error = %err, "policy unavailable; falling back");
        Ok(())
    }
}

impl core::fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Authorizer")
            .field("config", &self.config)
            .field("gate_disabled", &self.gate.authorization_disabled())
            .field("registry", &self.registry)
            .finish()
    }
}
