//! `policygate-core`: value types shared by the authorization layers.
//!
//! This crate contains **pure** primitives (no policy logic, no IO).

pub mod error;
pub mod id;
pub mod subject;

pub use error::{DomainError, DomainResult};
pub use id::{PrincipalId, RecordId};
pub use subject::{Collection, Record, Subject, SubjectType};
