//! Scenario tests across service, guards and seeder.
//!
//! Verifies:
//! - Grants and revocations are visible to the very next check
//! - Cascading deletes leave no reachable permissions behind
//! - The superuser bypass holds for arbitrary pairs

use std::sync::Arc;

use proptest::prelude::*;

use warden_core::UserId;

use crate::{
    AuthorizationService, AuthzError, CallContext, Enforcer, InMemoryAuthorizationStore,
    InMemoryIdentityStore, NewPermission, NewRole, Principal, Requirement,
};

struct Fixture {
    service: Arc<AuthorizationService>,
    identity: Arc<InMemoryIdentityStore>,
    enforcer: Enforcer,
}

fn fixture() -> Fixture {
    let identity = Arc::new(InMemoryIdentityStore::new());
    let service = Arc::new(AuthorizationService::new(
        Arc::new(InMemoryAuthorizationStore::new()),
        identity.clone(),
    ));
    let enforcer = Enforcer::new(service.clone());
    Fixture {
        service,
        identity,
        enforcer,
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("failed to build test runtime")
}

#[tokio::test]
async fn editor_grant_and_revoke_end_to_end() {
    let f = fixture();
    let user = UserId::new();
    f.identity.insert(Principal::user(user)).unwrap();

    let editor = f.service.create_role(NewRole::new("editor")).await.unwrap();
    let write = f
        .service
        .create_permission(NewPermission::api("item.write", "items", "write"))
        .await
        .unwrap();
    assert!(f.service.assign_permission_to_role(editor.id, write.id).await.unwrap());
    assert!(f.service.assign_role_to_user(user, editor.id).await.unwrap());

    assert!(f.service.has_permission(user, "items", "write").await.unwrap());
    assert!(!f.service.has_permission(user, "items", "delete").await.unwrap());

    assert!(f.service.remove_role_from_user(user, editor.id).await.unwrap());
    assert!(!f.service.has_permission(user, "items", "write").await.unwrap());
}

#[tokio::test]
async fn deleting_the_only_role_empties_user_permissions() {
    let f = fixture();
    let user = UserId::new();
    f.identity.insert(Principal::user(user)).unwrap();
    f.service.apply_default_policy().await.unwrap();

    let viewer = f.service.find_role_by_name("viewer").await.unwrap().unwrap();
    f.service.assign_role_to_user(user, viewer.id).await.unwrap();
    assert_eq!(f.service.get_user_permissions(user).await.unwrap().len(), 1);

    assert!(f.service.delete_role(viewer.id).await.unwrap());
    assert!(f.service.get_user_permissions(user).await.unwrap().is_empty());
    assert!(f.service.get_user_roles(user).await.unwrap().is_empty());
    assert!(!f.service.delete_role(viewer.id).await.unwrap());
}

#[tokio::test]
async fn guards_see_edits_immediately() {
    let f = fixture();
    let user = UserId::new();
    f.identity.insert(Principal::user(user)).unwrap();
    f.service.apply_default_policy().await.unwrap();

    let ctx = f.service.context_for(user).await.unwrap();
    let delete_item = f.enforcer.require_permission("items", "delete", |id: u64| async move {
        Ok::<_, AuthzError>(format!("deleted {id}"))
    });

    assert!(matches!(delete_item.call(&ctx, 7).await, Err(AuthzError::Forbidden(_))));

    let admin = f.service.find_role_by_name("admin").await.unwrap().unwrap();
    f.service.assign_role_to_user(user, admin.id).await.unwrap();
    assert_eq!(delete_item.call(&ctx, 7).await.unwrap(), "deleted 7");
}

#[tokio::test]
async fn unknown_user_context_is_unauthenticated() {
    let f = fixture();
    let ctx = f.service.context_for(UserId::new()).await.unwrap();
    assert_eq!(ctx, CallContext::anonymous());
    let err = f
        .enforcer
        .authorize(&ctx, &Requirement::Superuser)
        .await
        .unwrap_err();
    assert_eq!(err, AuthzError::Unauthenticated);
}

#[tokio::test]
async fn seeded_roles_gate_as_declared() {
    let f = fixture();
    f.service.apply_default_policy().await.unwrap();

    let user = UserId::new();
    f.identity.insert(Principal::user(user)).unwrap();
    let role = f.service.find_role_by_name("user").await.unwrap().unwrap();
    f.service.assign_role_to_user(user, role.id).await.unwrap();
    let ctx = f.service.context_for(user).await.unwrap();

    let read_write = Requirement::AllOf(vec![("items", "read").into(), ("items", "write").into()]);
    let admin_or_delete = Requirement::AnyOf(vec![("admin", "access").into(), ("items", "delete").into()]);
    assert!(f.enforcer.authorize(&ctx, &read_write).await.is_ok());
    assert_eq!(
        f.enforcer.authorize(&ctx, &admin_or_delete).await,
        Err(AuthzError::Forbidden(admin_or_delete.clone()))
    );
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        ..ProptestConfig::default()
    })]

    /// Property: a superuser holds every `(resource, action)` pair, with or
    /// without any graph state.
    #[test]
    fn superuser_holds_every_pair(resource in "[a-z]{1,12}", action in "[a-z]{1,12}", seeded in any::<bool>()) {
        let rt = runtime();
        let f = fixture();
        let root = UserId::new();
        f.identity.insert(Principal::superuser(root)).unwrap();

        let granted = rt.block_on(async {
            if seeded {
                f.service.apply_default_policy().await.unwrap();
            }
            f.service.has_permission(root, &resource, &action).await.unwrap()
        });
        prop_assert!(granted);
    }

    /// Property: user permissions never repeat, however many roles share them.
    #[test]
    fn user_permissions_never_repeat(grants in prop::collection::vec((0usize..4, 0usize..5), 0..20)) {
        let rt = runtime();
        let f = fixture();
        let user = UserId::new();
        f.identity.insert(Principal::user(user)).unwrap();

        let (permissions, expected) = rt.block_on(async {
            let mut roles = Vec::new();
            for i in 0..4 {
                let role = f.service.create_role(NewRole::new(format!("role-{i}"))).await.unwrap();
                f.service.assign_role_to_user(user, role.id).await.unwrap();
                roles.push(role);
            }
            let mut perms = Vec::new();
            for i in 0..5 {
                perms.push(
                    f.service
                        .create_permission(NewPermission::api(format!("perm.{i}"), "res", format!("act{i}")))
                        .await
                        .unwrap(),
                );
            }
            let mut expected = std::collections::BTreeSet::new();
            for (r, p) in &grants {
                f.service.assign_permission_to_role(roles[*r].id, perms[*p].id).await.unwrap();
                expected.insert(perms[*p].name.clone());
            }
            (f.service.get_user_permissions(user).await.unwrap(), expected)
        });

        let names: Vec<String> = permissions.into_iter().map(|p| p.name).collect();
        let unique: std::collections::BTreeSet<String> = names.iter().cloned().collect();
        prop_assert_eq!(names.len(), unique.len());
        prop_assert_eq!(unique, expected);
    }
}
