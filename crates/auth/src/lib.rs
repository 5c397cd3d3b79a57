//! `policygate-auth`: authorization decision facade.
//!
//! Resolves a policy for a subject, runs one of its checks and triages the
//! failures. Policies themselves are pluggable; this crate only defines how
//! decisions are requested, resolved, defaulted and reported.

pub mod authorize;
pub mod config;
pub mod error;
pub mod gate;
pub mod policy;
pub mod principal;
pub mod registry;
pub mod roles;
pub mod session;

pub use authorize::{AUTHORIZED_ACTIONS, AuthorizeOptions, Authorizer};
pub use config::{AuthorizationConfig, CHECK_SUFFIX, to_check_method};
pub use error::AuthzError;
pub use gate::{AUTHORIZATION_FEATURE, Bypassed, Enforced, FeatureGate, License};
pub use policy::{Policy, PolicyClassName, PolicyDefinition, PolicyScope, Rule, RulePolicy};
pub use principal::Principal;
pub use registry::{ClassResolution, PolicyRegistry, Resolution, ScopeResolution, invoke};
pub use roles::Role;
pub use session::AuthorizationSession;

pub use policygate_core::{Collection, PrincipalId, Record, RecordId, Subject, SubjectType};
