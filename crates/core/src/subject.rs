//! Subjects of authorization: records, subject types and collections.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DomainError, DomainResult};
use crate::id::{PrincipalId, RecordId};

/// Type identifier of a subject (e.g. "Post", "Invoice").
///
/// Policies are bound to subject types; the type is the lookup key used when
/// no explicit policy class is supplied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectType(Cow<'static, str>);

impl SubjectType {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Validating constructor for names coming from untrusted input.
    pub fn parse(name: impl Into<Cow<'static, str>>) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("subject type must not be empty"));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for SubjectType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A concrete record being authorized.
///
/// Attributes are opaque to this layer; policies interpret them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub subject_type: SubjectType,
    #[serde(default)]
    pub owner_id: Option<PrincipalId>,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl Record {
    pub fn new(subject_type: SubjectType) -> Self {
        Self {
            id: RecordId::new(),
            subject_type,
            owner_id: None,
            attributes: Map::new(),
        }
    }

    pub fn owned_by(mut self, owner_id: PrincipalId) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn is_owned_by(&self, principal_id: PrincipalId) -> bool {
        self.owner_id == Some(principal_id)
    }
}

/// What an authorization check is about.
#[derive(Debug, Clone, PartialEq)]
pub enum Subject {
    /// A single record.
    Record(Record),
    /// A subject type as a whole (class-level checks such as `index?`).
    Type(SubjectType),
    /// No subject; only meaningful together with an explicit policy class.
    Absent,
}

impl Subject {
    /// The subject type used for policy lookup, if any.
    pub fn subject_type(&self) -> Option<&SubjectType> {
        match self {
            Self::Record(record) => Some(&record.subject_type),
            Self::Type(subject_type) => Some(subject_type),
            Self::Absent => None,
        }
    }

    pub fn record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }
}

impl From<Record> for Subject {
    fn from(value: Record) -> Self {
        Self::Record(value)
    }
}

impl From<SubjectType> for Subject {
    fn from(value: SubjectType) -> Self {
        Self::Type(value)
    }
}

/// A collection of records of one subject type, as seen by scoping.
///
/// An empty collection stands in for the subject type itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub subject_type: SubjectType,
    pub records: Vec<Record>,
}

impl Collection {
    pub fn new(subject_type: SubjectType, records: Vec<Record>) -> Self {
        Self {
            subject_type,
            records,
        }
    }

    pub fn of_type(subject_type: SubjectType) -> Self {
        Self::new(subject_type, Vec::new())
    }

    /// Keep only the records matching `predicate`.
    pub fn filtered<F>(&self, mut predicate: F) -> Self
    where
        F: FnMut(&Record) -> bool,
    {
        Self {
            subject_type: self.subject_type.clone(),
            records: self.records.iter().filter(|r| predicate(*r)).cloned().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
