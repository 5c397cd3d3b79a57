//! Black-box checks of the facade against a realistic policy setup.

use policygate_auth::{
    AUTHORIZATION_FEATURE, AuthorizationConfig, AuthorizeOptions, Authorizer, AuthzError,
    Collection, License, PolicyDefinition, PolicyRegistry, Principal, PrincipalId, Record, Rule,
    Subject, SubjectType,
};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
enum ArticleError {
    #[error("article is embargoed")]
    Embargoed,
}

fn article() -> SubjectType {
    SubjectType::new("Article")
}

fn registry() -> PolicyRegistry {
    PolicyRegistry::new().register(
        article(),
        PolicyDefinition::new("ArticlePolicy")
            .rule("show", |_, subject| {
                let embargoed = subject
                    .record()
                    .and_then(|r| r.attribute("embargoed"))
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);
                if embargoed {
                    return Err(ArticleError::Embargoed.into());
                }
                Ok(true)
            })
            .with_rule("update", Rule::owner_only())
            .with_rule("destroy", Rule::requires_role("admin"))
            .scope(|principal, collection| {
                if principal.has_role("admin") {
                    return Ok(collection.clone());
                }
                Ok(collection.filtered(|r| r.is_owned_by(principal.principal_id)))
            }),
    )
}

fn authorizer() -> Authorizer {
    policygate_observability::init_for_tests();
    let config = AuthorizationConfig::from_json_str(
        r#"{
            "authorization_methods": { "show": "show?", "edit": "update?", "destroy": "destroy?" }
        }"#,
    )
    .unwrap();
    Authorizer::new(config, registry())
        .with_gate(License::new("pro").with_feature(AUTHORIZATION_FEATURE))
}

#[test]
fn visible_article_is_authorized() {
    let user = Principal::new(PrincipalId::new());
    let record = Subject::from(Record::new(article()));

    let allowed = authorizer()
        .authorize(Some(&user), &record, "show?", None, AuthorizeOptions::default())
        .unwrap();
    assert!(allowed);
}

#[test]
fn policy_error_propagates_with_its_identity() {
    let user = Principal::new(PrincipalId::new());
    let record = Subject::from(Record::new(article()).with_attribute("embargoed", true));

    let err = authorizer()
        .authorize(Some(&user), &record, "show?", None, AuthorizeOptions::default())
        .unwrap_err();
    let AuthzError::Policy(inner) = err else {
        panic!("expected the policy's own error");
    };
    assert_eq!(inner.downcast_ref::<ArticleError>(), Some(&ArticleError::Embargoed));

    let allowed = authorizer()
        .authorize(Some(&user), &record, "show?", None, AuthorizeOptions::no_raise())
        .unwrap();
    assert!(!allowed);
}

#[test]
fn edit_alias_maps_to_update_check() {
    let owner = Principal::new(PrincipalId::new());
    let stranger = Principal::new(PrincipalId::new());
    let record = Subject::from(Record::new(article()).owned_by(owner.principal_id));
    let authorizer = authorizer();

    assert!(
        authorizer
            .authorize_action(Some(&owner), &record, "edit", None, AuthorizeOptions::default())
            .unwrap()
    );
    assert!(
        !authorizer
            .authorize_action(Some(&stranger), &record, "edit", None, AuthorizeOptions::no_raise())
            .unwrap()
    );
}

#[test]
fn session_walks_a_collection() {
    let owner = Principal::new(PrincipalId::new());
    let records = vec![
        Record::new(article()).owned_by(owner.principal_id),
        Record::new(article()),
        Record::new(article()).owned_by(owner.principal_id),
    ];
    let authorizer = authorizer();

    let mut session = authorizer.session(Some(owner.clone()), Subject::Type(article()), None);
    let editable: Vec<bool> = records
        .iter()
        .map(|record| {
            session
                .set_subject(record.clone())
                .authorize_action("edit", AuthorizeOptions::no_raise())
                .unwrap()
        })
        .collect();
    assert_eq!(editable, vec![true, false, true]);

    let scoped = session
        .apply_policy(Collection::new(article(), records))
        .unwrap();
    assert_eq!(scoped.len(), 2);
}

#[test]
fn admin_sees_everything_and_may_destroy() {
    let admin = Principal::new(PrincipalId::new()).with_role("admin");
    let authorizer = authorizer();
    let collection =
        Collection::new(article(), vec![Record::new(article()), Record::new(article())]);

    let scoped = authorizer
        .apply_policy_scope(Some(&admin), collection.clone())
        .unwrap();
    assert_eq!(scoped, collection);

    let articles = Subject::Type(article());
    let options = AuthorizeOptions::default();

    let methods = authorizer
        .defined_methods(Some(&admin), &articles, None, options)
        .unwrap();
    assert!(methods.contains("destroy?"));
    assert!(
        authorizer
            .authorize_action(Some(&admin), &articles, "destroy", None, options)
            .unwrap()
    );
}

#[test]
fn unlicensed_deployment_skips_authorization() {
    let user = Principal::new(PrincipalId::new());
    let authorizer = Authorizer::new(AuthorizationConfig::default().strict(true), registry())
        .with_gate(License::new("community"));
    let unknown = Subject::from(Record::new(SubjectType::new("Invoice")));

    assert!(
        authorizer
            .authorize(Some(&user), &unknown, "destroy?", None, AuthorizeOptions::default())
            .unwrap()
    );
}

#[test]
fn anonymous_visitor_can_list_article_checks() {
    let authorizer = authorizer();
    let record = Subject::from(Record::new(article()));

    assert!(
        authorizer
            .has_method(None, &record, "show?", None, AuthorizeOptions::default())
            .unwrap()
    );

    let strict = Authorizer::new(AuthorizationConfig::default().strict(true), registry());
    let unknown = Subject::from(Record::new(SubjectType::new("Invoice")));
    let err = strict
        .defined_methods(None, &unknown, None, AuthorizeOptions::default())
        .unwrap_err();
    assert!(err.is_policy_not_defined());
}
