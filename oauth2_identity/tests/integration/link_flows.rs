use oauth2_identity::{CoordinationError, IdentityStore, User, UserStore};

use crate::common::{
    PROVIDER, TestEnv, browser_headers, headers_with_session, query_param, verified_profile,
};

async fn signed_in(env: &TestEnv, user: &User) -> http::HeaderMap {
    let redirect = env.controller.login_user(user, "/").await.unwrap();
    headers_with_session(&redirect)
}

async fn start_link(env: &TestEnv, user: &User, headers: &http::HeaderMap) -> String {
    let redirect = env
        .controller
        .link(PROVIDER, &user.id, headers)
        .await
        .expect("link should start");
    query_param(&redirect.location, "state").unwrap()
}

#[tokio::test]
async fn test_link_binds_identity_to_current_user() {
    let env = TestEnv::new(verified_profile("2002", "ada@work.example", "Ada"));
    let user = env.create_user("ada@example.com", "Ada").await;
    let headers = signed_in(&env, &user).await;

    let state_token = start_link(&env, &user, &headers).await;
    let redirect = env
        .callback_with_headers(&state_token, "code-link", &headers)
        .await;

    assert_eq!(redirect.location, "/settings?linked=github");
    assert!(redirect.headers.is_empty());
    let identity = env
        .identities
        .get_for_user(&user.id, PROVIDER)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(identity.provider_user_id, "2002");
    assert_eq!(env.users.count().await, 1);
}

#[tokio::test]
async fn test_link_state_targets_settings_and_carries_user() {
    let env = TestEnv::new(verified_profile("2002", "ada@work.example", "Ada"));
    let user = env.create_user("ada@example.com", "Ada").await;
    let headers = signed_in(&env, &user).await;

    let state_token = start_link(&env, &user, &headers).await;
    let state = env.states.take(&state_token).await.unwrap().unwrap();
    assert_eq!(state.link_user_id.as_deref(), Some(user.id.as_str()));
    assert_eq!(state.redirect_uri, "/settings");
}

#[tokio::test]
async fn test_link_refused_when_already_linked() {
    let env = TestEnv::new(verified_profile("2002", "ada@work.example", "Ada"));
    let user = env.create_user("ada@example.com", "Ada").await;
    let headers = signed_in(&env, &user).await;
    let state_token = start_link(&env, &user, &headers).await;
    env.callback_with_headers(&state_token, "code-link", &headers)
        .await;

    let result = env.controller.link(PROVIDER, &user.id, &headers).await;
    assert!(matches!(result, Err(CoordinationError::Conflict(_))));
}

#[tokio::test]
async fn test_link_requires_existing_user() {
    let env = TestEnv::new(verified_profile("2002", "ada@work.example", "Ada"));
    let result = env
        .controller
        .link(PROVIDER, "no-such-user", &browser_headers())
        .await;
    assert!(matches!(result, Err(CoordinationError::Unauthorized)));
}

/// A provider account bound to someone else is never moved by a link.
#[tokio::test]
async fn test_link_conflict_with_other_users_identity() {
    let env = TestEnv::new(verified_profile("2002", "bob@example.com", "Bob"));
    let bob_login = env.login().await;
    let bob = env
        .controller
        .session_claims(&headers_with_session(&bob_login))
        .await
        .unwrap()
        .unwrap()
        .sub;

    let alice = env.create_user("alice@example.com", "Alice").await;
    let headers = signed_in(&env, &alice).await;
    let state_token = start_link(&env, &alice, &headers).await;
    let redirect = env
        .callback_with_headers(&state_token, "code-link", &headers)
        .await;

    assert_eq!(redirect.location, "/settings?error=already_linked");
    let identity = env
        .identities
        .get_by_provider(PROVIDER, "2002")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(identity.user_id, bob);
    assert!(
        env.identities
            .get_for_user(&alice.id, PROVIDER)
            .await
            .unwrap()
            .is_none()
    );
}

/// The link callback must come back in the session that started it.
#[tokio::test]
async fn test_link_callback_requires_initiating_session() {
    let env = TestEnv::new(verified_profile("2002", "ada@work.example", "Ada"));
    let alice = env.create_user("alice@example.com", "Alice").await;
    let mallory = env.create_user("mallory@example.com", "Mallory").await;
    let alice_headers = signed_in(&env, &alice).await;
    let mallory_headers = signed_in(&env, &mallory).await;

    let state_token = start_link(&env, &alice, &alice_headers).await;
    let redirect = env.callback(&state_token, "code-link").await;
    assert_eq!(redirect.location, "/settings?error=invalid_state");

    let state_token = start_link(&env, &alice, &alice_headers).await;
    let redirect = env
        .callback_with_headers(&state_token, "code-link", &mallory_headers)
        .await;
    assert_eq!(redirect.location, "/settings?error=invalid_state");

    assert_eq!(env.identities.count().await, 0);
}

#[tokio::test]
async fn test_link_target_deleted_before_callback() {
    let env = TestEnv::new(verified_profile("2002", "ada@work.example", "Ada"));
    let user = env.create_user("ada@example.com", "Ada").await;
    let headers = signed_in(&env, &user).await;
    let state_token = start_link(&env, &user, &headers).await;

    env.users.delete_user(&user.id).await.unwrap();

    let redirect = env
        .callback_with_headers(&state_token, "code-link", &headers)
        .await;
    assert_eq!(redirect.location, "/settings?error=user_not_found");
    assert_eq!(env.identities.count().await, 0);
}

#[tokio::test]
async fn test_list_identities_omits_tokens() {
    let env = TestEnv::new(verified_profile("2002", "ada@work.example", "Ada"));
    let user = env.create_user("ada@example.com", "Ada").await;
    let headers = signed_in(&env, &user).await;
    let state_token = start_link(&env, &user, &headers).await;
    env.callback_with_headers(&state_token, "code-link", &headers)
        .await;

    let summaries = env.controller.list_identities(&user.id).await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].provider, PROVIDER);
    assert_eq!(summaries[0].provider_user_id, "2002");

    let json = serde_json::to_string(&summaries).unwrap();
    assert!(!json.contains("access-code-link"));
    assert!(!json.contains("refresh-code-link"));
}
