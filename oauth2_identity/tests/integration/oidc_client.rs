use std::sync::Arc;

use oauth2_identity::{
    AuthorizationRequest, CacheStateStore, CallbackParams, FlowConfig, InMemoryCacheStore,
    InMemoryIdentityStore, InMemoryUserStore, JwtSessionIssuer, OAuthFlowController,
    OidcProviderClient, ProviderClient, ProviderError, SessionConfig, StaticProviderRegistry,
};

use crate::common::{MockOAuthServer, TEST_SECRET, browser_headers, query_param};

#[tokio::test]
async fn test_exchange_sends_verifier_and_callback_url() {
    let server = MockOAuthServer::start().await;
    let client = OidcProviderClient::new(server.provider_config()).unwrap();

    let tokens = client
        .exchange_code("abc", "verifier-xyz", "https://app.example.com/cb")
        .await
        .unwrap();
    assert_eq!(tokens.access_token, "gho_abc");
    assert!(tokens.id_token.is_none());

    let requests = server.token_requests();
    assert_eq!(requests.len(), 1);
    let form = &requests[0];
    assert_eq!(form["grant_type"], "authorization_code");
    assert_eq!(form["code_verifier"], "verifier-xyz");
    assert_eq!(form["redirect_uri"], "https://app.example.com/cb");
    assert_eq!(form["client_id"], "client-123");
}

#[tokio::test]
async fn test_token_error_with_ok_status() {
    let server = MockOAuthServer::start().await;
    let client = OidcProviderClient::new(server.provider_config()).unwrap();

    let result = client.exchange_code("revoked", "v", "https://app.example.com/cb").await;
    assert!(matches!(result, Err(ProviderError::TokenResponse(e)) if e == "bad_verification_code"));

    let result = client
        .exchange_code("server-error", "v", "https://app.example.com/cb")
        .await;
    assert!(matches!(result, Err(ProviderError::TokenResponse(_))));
}

#[tokio::test]
async fn test_unreachable_token_endpoint_is_transport_error() {
    let server = MockOAuthServer::start().await;
    let mut config = server.provider_config();
    config.token_url = "http://127.0.0.1:1/token".to_string();
    let client = OidcProviderClient::new(config).unwrap();

    let result = client.exchange_code("abc", "v", "https://app.example.com/cb").await;
    assert!(matches!(result, Err(ProviderError::Transport(_))));
}

#[tokio::test]
async fn test_fetch_profile_maps_numeric_subject() {
    let server = MockOAuthServer::start().await;
    let client = OidcProviderClient::new(server.provider_config()).unwrap();

    let tokens = client.exchange_code("abc", "v", "https://app.example.com/cb").await.unwrap();
    let profile = client.fetch_profile(&tokens).await.unwrap();

    assert_eq!(profile.provider_user_id, "583231");
    assert_eq!(profile.email.as_deref(), Some("octocat@github.example"));
    assert!(!profile.email_verified);
    assert_eq!(profile.name.as_deref(), Some("The Octocat"));
    assert_eq!(
        profile.avatar_url.as_deref(),
        Some("https://avatars.example/u/583231")
    );
    assert_eq!(profile.raw["login"], "octocat");
}

#[tokio::test]
async fn test_authorization_url_points_at_provider() {
    let server = MockOAuthServer::start().await;
    let client = OidcProviderClient::new(server.provider_config()).unwrap();

    let url = client
        .authorization_url(&AuthorizationRequest {
            redirect_uri: "https://app.example.com/auth/oauth/github/callback",
            state: "s",
            code_challenge: "c",
            nonce: "n",
        })
        .unwrap();
    assert!(url.starts_with(&format!("{}/authorize?", server.base_url)));
    assert_eq!(query_param(&url, "client_id").as_deref(), Some("client-123"));
    assert_eq!(query_param(&url, "scope").as_deref(), Some("read:user user:email"));
}

/// Full login through the HTTP provider client.
#[tokio::test]
async fn test_login_through_http_provider() {
    let server = MockOAuthServer::start().await;
    let client = OidcProviderClient::new(server.provider_config()).unwrap();
    let users = Arc::new(InMemoryUserStore::new());
    let identities = Arc::new(InMemoryIdentityStore::new());
    let controller = OAuthFlowController::new(
        FlowConfig::default(),
        Arc::new(StaticProviderRegistry::new().with_provider(Arc::new(client))),
        Arc::new(CacheStateStore::new(Arc::new(InMemoryCacheStore::new()))),
        identities.clone(),
        users.clone(),
        Arc::new(JwtSessionIssuer::new(SessionConfig::new(TEST_SECRET).unwrap())),
    );

    let headers = browser_headers();
    let start = controller.start("github", Some("/home"), &headers).await.unwrap();
    let state = query_param(&start.location, "state").unwrap();

    let params = CallbackParams {
        code: Some("live".to_string()),
        state: Some(state),
        ..Default::default()
    };
    let redirect = controller.callback("github", &params, &headers).await.unwrap();

    assert_eq!(redirect.location, "/home");
    assert_eq!(users.count().await, 1);
    assert_eq!(identities.count().await, 1);

    let form = &server.token_requests()[0];
    assert_eq!(
        form["redirect_uri"],
        "https://app.example.com/auth/oauth/github/callback"
    );
    assert_eq!(
        oauth2_identity::code_challenge_s256(&form["code_verifier"]),
        query_param(&start.location, "code_challenge").unwrap()
    );
}
