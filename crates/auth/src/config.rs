//! Authorization configuration (action aliases, strictness).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Suffix carried by every check-method name.
pub const CHECK_SUFFIX: &str = "?";

/// Process-wide authorization settings.
///
/// Set once at startup and shared read-only (wrap in `Arc`); the facade
/// receives it explicitly instead of reading ambient state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorizationConfig {
    /// Turn missing-policy conditions into hard errors.
    pub raise_on_missing_policy: bool,

    /// Action alias → check-method name. A `null` value marks an action as
    /// explicitly unmapped.
    pub authorization_methods: BTreeMap<String, Option<String>>,
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        let authorization_methods = [
            ("index", "index?"),
            ("show", "show?"),
            ("edit", "edit?"),
            ("new", "new?"),
            ("update", "update?"),
            ("create", "create?"),
            ("destroy", "destroy?"),
            ("search", "search?"),
        ]
        .into_iter()
        .map(|(alias, method)| (alias.to_string(), Some(method.to_string())))
        .collect();

        Self {
            raise_on_missing_policy: false,
            authorization_methods,
        }
    }
}

impl AuthorizationConfig {
    /// Parse a JSON document; absent fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn strict(mut self, raise_on_missing_policy: bool) -> Self {
        self.raise_on_missing_policy = raise_on_missing_policy;
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>, method: Option<&str>) -> Self {
        self.authorization_methods
            .insert(alias.into(), method.map(str::to_string));
        self
    }

    /// Translate an action alias.
    ///
    /// - alias mapped to a method → `Some(method)`
    /// - alias explicitly mapped to `null` → `None`
    /// - alias absent from the table → `Some(alias)` unchanged
    pub fn resolve_alias<'a>(&'a self, alias: &'a str) -> Option<&'a str> {
        match self.authorization_methods.get(alias) {
            Some(mapped) => mapped.as_deref(),
            None => Some(alias),
        }
    }
}

/// Append the check suffix unless the action already carries it.
pub fn to_check_method(action: &str) -> String {
    if action.ends_with(CHECK_SUFFIX) {
        action.to_string()
    } else {
        format!("{action}{CHECK_SUFFIX}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_table_maps_crud_aliases() {
        let config = AuthorizationConfig::default();
        assert!(!config.raise_on_missing_policy);
        assert_eq!(config.resolve_alias("edit"), Some("edit?"));
        assert_eq!(config.resolve_alias("destroy"), Some("destroy?"));
    }

    #[test]
    fn unknown_alias_passes_through_literally() {
        let config = AuthorizationConfig::default();
        assert_eq!(config.resolve_alias("publish"), Some("publish"));
    }

    #[test]
    fn null_alias_resolves_to_nothing() {
        let config = AuthorizationConfig::default().with_alias("archive", None);
        assert_eq!(config.resolve_alias("archive"), None);
    }

    #[test]
    fn from_json_keeps_defaults_for_missing_fields() {
        let config = AuthorizationConfig::from_json_str(r#"{"raise_on_missing_policy": true}"#)
            .unwrap();
        assert!(config.raise_on_missing_policy);
        assert_eq!(config.resolve_alias("show"), Some("show?"));
    }

    #[test]
    fn from_json_accepts_custom_and_null_aliases() {
        let json = r#"{
            "authorization_methods": {
                "edit": "update?",
                "export": null
            }
        }"#;
        let config = AuthorizationConfig::from_json_str(json).unwrap();

        assert!(!config.raise_on_missing_policy);
        assert_eq!(config.resolve_alias("edit"), Some("update?"));
        assert_eq!(config.resolve_alias("export"), None);
        // Table replaced wholesale: "show" no longer configured.
        assert_eq!(config.resolve_alias("show"), Some("show"));
    }

    #[test]
    fn suffix_is_appended_once() {
        assert_eq!(to_check_method("update"), "update?");
        assert_eq!(to_check_method("update?"), "update?");
    }

    proptest! {
        #[test]
        fn check_method_always_ends_with_a_single_suffix(action in "[a-z_]{1,16}\\??") {
            let method = to_check_method(&action);
            prop_assert!(method.ends_with('?'));
            prop_assert!(!method.ends_with("??"));
            prop_assert_eq!(to_check_method(&method), method.clone());
        }
    }
}
