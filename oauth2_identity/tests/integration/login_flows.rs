use std::sync::Arc;

use oauth2_identity::{
    FlowConfig, IdTokenClaims, IdentityStore, OAuthFlowController, SessionClaims, User,
    UserStatus, UserStore, code_challenge_s256,
};

use crate::common::{
    MockFailure, PROVIDER, TestEnv, headers_with_session, query_param, session_cookie_pair,
    unverified_profile, verified_profile,
};

async fn claims_of(
    controller: &OAuthFlowController,
    redirect: &oauth2_identity::FlowRedirect,
) -> SessionClaims {
    controller
        .session_claims(&headers_with_session(redirect))
        .await
        .unwrap()
        .expect("session cookie should verify")
}

/// Start persists a ten-minute state and sends the user to the provider
/// with the state token and S256 challenge.
#[tokio::test]
async fn test_start_redirects_to_provider_with_state_and_challenge() {
    let env = TestEnv::new(verified_profile("1001", "ada@example.com", "Ada"));

    let redirect = env
        .controller
        .start(PROVIDER, Some("/dash"), &crate::common::browser_headers())
        .await
        .unwrap();

    assert!(redirect.location.starts_with(crate::common::mock_provider::MOCK_AUTH_URL));
    let state_token = query_param(&redirect.location, "state").unwrap();
    let challenge = query_param(&redirect.location, "code_challenge").unwrap();
    assert_eq!(state_token.len(), 64);
    assert_eq!(
        query_param(&redirect.location, "code_challenge_method").as_deref(),
        Some("S256")
    );
    assert_eq!(
        query_param(&redirect.location, "redirect_uri").as_deref(),
        Some("https://app.example.com/auth/oauth/github/callback")
    );

    let state = env.states.take(&state_token).await.unwrap().unwrap();
    assert_eq!(state.provider, PROVIDER);
    assert_eq!(state.redirect_uri, "/dash");
    assert_eq!((state.expires_at - state.created_at).num_seconds(), 600);
    assert!(state.link_user_id.is_none());
    assert_eq!(challenge, code_challenge_s256(&state.code_verifier));
}

#[tokio::test]
async fn test_start_rejects_unknown_provider_and_foreign_redirect() {
    let env = TestEnv::new(verified_profile("1001", "ada@example.com", "Ada"));
    let headers = crate::common::browser_headers();

    let result = env.controller.start("gitlab", None, &headers).await;
    assert!(matches!(
        result,
        Err(oauth2_identity::CoordinationError::ProviderNotConfigured(_))
    ));

    let result = env
        .controller
        .start(PROVIDER, Some("https://evil.example/"), &headers)
        .await;
    assert!(matches!(
        result,
        Err(oauth2_identity::CoordinationError::InvalidRedirect(_))
    ));
}

/// The verifier presented at exchange is the one whose hash was sent at Start,
/// and the exchange uses the callback URL Start advertised.
#[tokio::test]
async fn test_pkce_verifier_matches_start_challenge() {
    let env = TestEnv::new(verified_profile("1001", "ada@example.com", "Ada"));

    let state = env.start_login(None).await;
    env.callback(&state, "code-1").await;

    let challenges = env.provider.challenges();
    let verifiers = env.provider.verifiers();
    assert_eq!(challenges.len(), 1);
    assert_eq!(verifiers.len(), 1);
    assert_eq!(code_challenge_s256(&verifiers[0]), challenges[0]);
    assert_eq!(
        env.provider.redirect_uris(),
        vec!["https://app.example.com/auth/oauth/github/callback".to_string()]
    );
}

/// A brand-new verified profile creates exactly one user and one identity
/// and signs that user in.
#[tokio::test]
async fn test_first_login_creates_user_and_identity() {
    let env = TestEnv::new(verified_profile("1001", "ada@example.com", "Ada"));

    let state = env.start_login(Some("/dash")).await;
    let redirect = env.callback(&state, "code-1").await;

    assert_eq!(redirect.location, "/dash");
    assert!(session_cookie_pair(&redirect).unwrap().starts_with("__Host-SessionId="));
    assert_eq!(env.users.count().await, 1);
    assert_eq!(env.identities.count().await, 1);

    let identity = env
        .identities
        .get_by_provider(PROVIDER, "1001")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(identity.access_token, "access-code-1");

    let claims = claims_of(&env.controller, &redirect).await;
    assert_eq!(claims.sub, identity.user_id);
    assert_eq!(claims.email, "ada@example.com");
    assert_eq!(claims.name, "Ada");
    assert_eq!(claims.role, "user");
}

/// A returning subject signs in as the bound user and only refreshes tokens.
#[tokio::test]
async fn test_returning_login_refreshes_tokens_only() {
    let env = TestEnv::new(verified_profile("1001", "ada@example.com", "Ada"));
    let first = env.login().await;
    let first_claims = claims_of(&env.controller, &first).await;

    let state = env.start_login(None).await;
    let second = env.callback(&state, "code-2").await;

    assert_eq!(second.location, "/");
    assert_eq!(env.users.count().await, 1);
    assert_eq!(env.identities.count().await, 1);

    let identity = env
        .identities
        .get_by_provider(PROVIDER, "1001")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(identity.access_token, "access-code-2");
    assert_eq!(identity.refresh_token.as_deref(), Some("refresh-code-2"));
    assert!(identity.updated_at >= identity.created_at);

    let second_claims = claims_of(&env.controller, &second).await;
    assert_eq!(second_claims.sub, first_claims.sub);
}

/// Subject match wins over a verified-email match with another user.
#[tokio::test]
async fn test_identity_match_takes_priority_over_email() {
    let env = TestEnv::new(verified_profile("1001", "ada@example.com", "Ada"));
    let first = env.login().await;
    let owner = claims_of(&env.controller, &first).await.sub;

    env.create_user("new-address@example.com", "Other").await;
    env.provider
        .set_profile(verified_profile("1001", "new-address@example.com", "Ada"));

    let redirect = env.login().await;
    assert_eq!(claims_of(&env.controller, &redirect).await.sub, owner);
    assert_eq!(env.identities.count().await, 1);
}

#[tokio::test]
async fn test_verified_email_attaches_to_existing_user() {
    let env = TestEnv::new(verified_profile("1001", "Ada@Example.com", "Ada"));
    let existing = env.create_user("ada@example.com", "Ada Lovelace").await;

    let redirect = env.login().await;

    assert_eq!(claims_of(&env.controller, &redirect).await.sub, existing.id);
    assert_eq!(env.users.count().await, 1);
    let identity = env
        .identities
        .get_for_user(&existing.id, PROVIDER)
        .await
        .unwrap();
    assert!(identity.is_some());
}

/// An unverified email claim never reaches an existing account.
#[tokio::test]
async fn test_unverified_email_creates_new_user() {
    let env = TestEnv::new(unverified_profile("1001", "ada@example.com", "Mallory"));
    let existing = env.create_user("ada@example.com", "Ada").await;

    let redirect = env.login().await;

    let claims = claims_of(&env.controller, &redirect).await;
    assert_ne!(claims.sub, existing.id);
    assert_eq!(env.users.count().await, 2);
    assert!(
        env.identities
            .get_for_user(&existing.id, PROVIDER)
            .await
            .unwrap()
            .is_none()
    );
}

/// An account registered from an unverified claim does not keep the email,
/// so a later verified login with that email gets its own account.
#[tokio::test]
async fn test_unverified_signup_does_not_capture_later_verified_login() {
    // Given a user registered through an unverified email claim
    let env = TestEnv::new(unverified_profile("666", "victim@example.com", "Mallory"));
    let first = env.login().await;
    let squatter = claims_of(&env.controller, &first).await.sub;
    let stored = env.users.get_user(&squatter).await.unwrap().unwrap();
    assert_eq!(stored.email, "");

    // When the real owner signs in with the same email, verified
    env.provider
        .set_profile(verified_profile("1001", "victim@example.com", "Victim"));
    let second = env.login().await;

    // Then a separate account is created and bound
    let owner = claims_of(&env.controller, &second).await.sub;
    assert_ne!(owner, squatter);
    assert_eq!(env.users.count().await, 2);
    let identity = env
        .identities
        .get_by_provider(PROVIDER, "1001")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(identity.user_id, owner);
    assert!(
        env.identities
            .get_for_user(&squatter, PROVIDER)
            .await
            .unwrap()
            .is_some_and(|i| i.provider_user_id == "666")
    );
}

#[tokio::test]
async fn test_registration_disabled() {
    let config = FlowConfig {
        allow_registration: false,
        ..FlowConfig::default()
    };
    let env = TestEnv::with_config(verified_profile("1001", "ada@example.com", "Ada"), config);

    let redirect = env.login().await;

    assert_eq!(redirect.location, "/login?error=registration_disabled");
    assert!(redirect.headers.is_empty());
    assert_eq!(env.users.count().await, 0);
    assert_eq!(env.identities.count().await, 0);
}

#[tokio::test]
async fn test_registration_disabled_still_allows_email_match() {
    let config = FlowConfig {
        allow_registration: false,
        ..FlowConfig::default()
    };
    let env = TestEnv::with_config(verified_profile("1001", "ada@example.com", "Ada"), config);
    let existing = env.create_user("ada@example.com", "Ada").await;

    let redirect = env.login().await;
    assert_eq!(claims_of(&env.controller, &redirect).await.sub, existing.id);
}

#[tokio::test]
async fn test_display_name_falls_back_to_email_local_part() {
    let mut profile = verified_profile("1001", "grace@example.com", "");
    profile.name = None;
    let env = TestEnv::new(profile);

    let redirect = env.login().await;
    let user = env
        .users
        .get_user(&claims_of(&env.controller, &redirect).await.sub)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.name, "grace");
    assert_eq!(user.email, "grace@example.com");
}

#[tokio::test]
async fn test_disabled_user_is_refused() {
    let env = TestEnv::new(verified_profile("1001", "ada@example.com", "Ada"));
    let mut user = env.create_user("ada@example.com", "Ada").await;
    user.status = UserStatus::Disabled;
    env.users.update_user(user).await.unwrap();

    let redirect = env.login().await;
    assert_eq!(redirect.location, "/login?error=account_disabled");
    assert_eq!(env.identities.count().await, 0);
}

/// An identity whose user row is gone is an error, not a silent re-registration.
#[tokio::test]
async fn test_dangling_identity_reports_user_not_found() {
    let env = TestEnv::new(verified_profile("1001", "ada@example.com", "Ada"));
    let first = env.login().await;
    let owner = claims_of(&env.controller, &first).await.sub;
    env.users.delete_user(&owner).await.unwrap();

    let redirect = env.login().await;
    assert_eq!(redirect.location, "/login?error=user_not_found");
    assert_eq!(env.users.count().await, 0);
}

#[tokio::test]
async fn test_unsafe_stored_redirect_falls_back_to_default() {
    let env = TestEnv::new(verified_profile("1001", "ada@example.com", "Ada"));
    let user = User::new("x@example.com".to_string(), "X".to_string());

    let redirect = env.controller.login_user(&user, "//evil.example").await.unwrap();
    assert_eq!(redirect.location, "/");
    let redirect = env.controller.login_user(&user, "").await.unwrap();
    assert_eq!(redirect.location, "/");
    let redirect = env.controller.login_user(&user, "/dash?tab=1").await.unwrap();
    assert_eq!(redirect.location, "/dash?tab=1");
}

#[tokio::test]
async fn test_provider_failures_map_to_error_codes() {
    let cases = [
        (MockFailure::Transport, "exchange_failed"),
        (MockFailure::TokenResponse, "token_error"),
        (MockFailure::Profile, "profile_failed"),
    ];

    for (failure, code) in cases {
        let env = TestEnv::new(verified_profile("1001", "ada@example.com", "Ada"));
        env.provider.fail_with(failure);

        let redirect = env.login().await;
        assert_eq!(redirect.location, format!("/login?error={code}"));
        assert_eq!(env.users.count().await, 0);
    }
}

#[tokio::test]
async fn test_provider_reported_error_short_circuits() {
    let env = TestEnv::new(verified_profile("1001", "ada@example.com", "Ada"));
    let state = env.start_login(None).await;

    let params = oauth2_identity::CallbackParams {
        state: Some(state.clone()),
        error: Some("access_denied".to_string()),
        error_description: Some("The user denied the request".to_string()),
        ..Default::default()
    };
    let redirect = env
        .controller
        .callback(PROVIDER, &params, &crate::common::browser_headers())
        .await
        .unwrap();

    assert_eq!(redirect.location, "/login?error=access_denied");
    assert!(env.provider.verifiers().is_empty());
    // The state was not touched and remains usable.
    assert!(env.states.take(&state).await.unwrap().is_some());
}

#[tokio::test]
async fn test_id_token_nonce_must_match() {
    let env = TestEnv::new(verified_profile("1001", "ada@example.com", "Ada"));
    env.provider.issue_id_token(IdTokenClaims {
        sub: "1001".to_string(),
        iss: Some("https://idp.example.com".to_string()),
        nonce: Some("not-the-nonce".to_string()),
        email: None,
        email_verified: None,
        exp: 0,
    });

    let redirect = env.login().await;
    assert_eq!(redirect.location, "/login?error=token_error");
    assert_eq!(env.users.count().await, 0);
}

#[tokio::test]
async fn test_id_token_with_matching_nonce_signs_in() {
    let env = TestEnv::new(verified_profile("1001", "ada@example.com", "Ada"));
    let start = env
        .controller
        .start(PROVIDER, None, &crate::common::browser_headers())
        .await
        .unwrap();
    let state = query_param(&start.location, "state").unwrap();
    let nonce = query_param(&start.location, "nonce").unwrap();
    env.provider.issue_id_token(IdTokenClaims {
        sub: "1001".to_string(),
        iss: None,
        nonce: Some(nonce),
        email: None,
        email_verified: None,
        exp: 0,
    });

    let redirect = env.callback(&state, "code-1").await;
    assert_eq!(redirect.location, "/");
    assert!(session_cookie_pair(&redirect).is_some());
}

#[tokio::test]
async fn test_id_token_verification_failure() {
    let env = TestEnv::new(verified_profile("1001", "ada@example.com", "Ada"));
    env.provider.issue_id_token(IdTokenClaims {
        sub: "1001".to_string(),
        iss: None,
        nonce: None,
        email: None,
        email_verified: None,
        exp: 0,
    });
    env.provider.fail_with(MockFailure::IdToken);

    let redirect = env.login().await;
    assert_eq!(redirect.location, "/login?error=token_error");
}

/// Lenient mode signs the user in even when the identity row cannot be written.
#[tokio::test]
async fn test_identity_persistence_failure_lenient() {
    let env = TestEnv::with_failing_identity_inserts(
        verified_profile("1001", "ada@example.com", "Ada"),
        FlowConfig::default(),
    );

    let redirect = env.login().await;
    assert_eq!(redirect.location, "/");
    assert!(session_cookie_pair(&redirect).is_some());
    assert_eq!(env.users.count().await, 1);
    assert_eq!(env.identities.count().await, 0);
}

/// Strict mode fails the login and removes the user it just created.
#[tokio::test]
async fn test_identity_persistence_failure_strict() {
    let config = FlowConfig {
        strict_identity_persistence: true,
        ..FlowConfig::default()
    };
    let env = TestEnv::with_failing_identity_inserts(
        verified_profile("1001", "ada@example.com", "Ada"),
        config,
    );

    let redirect = env.login().await;
    assert_eq!(redirect.location, "/login?error=identity_creation_failed");
    assert!(redirect.headers.is_empty());
    assert_eq!(env.users.count().await, 0);
}

/// Concurrent first logins of one external account converge on one user.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_logins_create_one_user() {
    let env = Arc::new(TestEnv::new(verified_profile(
        "1001",
        "ada@example.com",
        "Ada",
    )));

    let mut states = Vec::new();
    for _ in 0..8 {
        states.push(env.start_login(None).await);
    }

    let mut handles = Vec::new();
    for (i, state) in states.into_iter().enumerate() {
        let env = env.clone();
        handles.push(tokio::spawn(async move {
            env.callback(&state, &format!("code-{i}")).await
        }));
    }

    let mut subjects = Vec::new();
    for handle in handles {
        let redirect = handle.await.unwrap();
        assert_eq!(redirect.location, "/");
        subjects.push(claims_of(&env.controller, &redirect).await.sub);
    }

    assert_eq!(env.users.count().await, 1);
    assert_eq!(env.identities.count().await, 1);
    subjects.dedup();
    assert_eq!(subjects.len(), 1);
}
