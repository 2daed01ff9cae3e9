//! OIDC discovery caching

use super::*;
use oauth2_credentials::{DiscoveryCache, ReqwestHttpTransport};
use wiremock::matchers::{method, path};
use wiremock::Mock;

#[tokio::test]
async fn test_concurrent_lookups_fetch_once() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(success_response(json!({
            "issuer": mock_server.uri(),
            "authorization_endpoint": format!("{}/authorize", mock_server.uri()),
            "token_endpoint": format!("{}/token", mock_server.uri())
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let cache = Arc::new(DiscoveryCache::new());
    let transport = Arc::new(ReqwestHttpTransport::new().unwrap());
    let issuer = mock_server.uri();
    let discovery_url = format!("{issuer}/.well-known/openid-configuration");

    let mut lookups = Vec::new();
    for i in 0..8 {
        let cache = cache.clone();
        let transport = transport.clone();
        // Issuer and full discovery URL normalize to the same key
        let url = if i % 2 == 0 {
            format!("{issuer}/")
        } else {
            discovery_url.clone()
        };
        lookups.push(tokio::spawn(async move {
            cache.discover(transport.as_ref(), &url).await
        }));
    }

    for lookup in lookups {
        let document = lookup.await.unwrap().unwrap();
        assert_eq!(document.token_endpoint, format!("{issuer}/token"));
    }
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn test_failed_fetch_is_not_cached() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(success_response(json!({
            "token_endpoint": format!("{}/token", mock_server.uri())
        })))
        .mount(&mock_server)
        .await;

    let cache = DiscoveryCache::new();
    let transport = ReqwestHttpTransport::new().unwrap();

    assert!(cache.discover(&transport, &mock_server.uri()).await.is_err());
    let document = cache.discover(&transport, &mock_server.uri()).await.unwrap();
    assert!(document.token_endpoint.ends_with("/token"));
}
