//! Identity provider backed by the hosted auth service.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use folio_core::{Error, Identity, IdentityProvider, Result};

use crate::hosted::{error_message, HostedClient, HostedConfig};

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

/// Resolves the current user with `GET /auth/v1/user`.
///
/// Without an access token there is no session and the provider reports
/// "not authenticated" without calling the service.
#[derive(Debug, Clone)]
pub struct HttpIdentityProvider {
    client: HostedClient,
    has_session: bool,
}

impl HttpIdentityProvider {
    pub fn new(config: HostedConfig) -> Result<Self> {
        let has_session = config.access_token.is_some();
        Ok(Self {
            client: HostedClient::new(config)?,
            has_session,
        })
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn current_identity(&self) -> Result<Option<Identity>> {
        if !self.has_session {
            return Ok(None);
        }

        let request = self.client.http().get(self.client.url(["auth", "v1", "user"])?);
        let response = self.client.authorize(request).send().await?;

        match response.status() {
            s if s.is_success() => {
                let user: UserResponse = response.json().await?;
                debug!(subsystem = "auth", user_id = %user.id, "Resolved identity");
                Ok(Some(Identity {
                    user_id: user.id,
                    email: user.email,
                }))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            _ => Err(Error::Request(format!(
                "identity lookup failed: {}",
                error_message(response).await
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_resolves_user() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .and(header("apikey", "anon"))
            .and(header("authorization", "Bearer jwt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": id,
                "email": "reader@example.com",
                "aud": "authenticated"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider =
            HttpIdentityProvider::new(HostedConfig::new(server.uri(), "anon").with_access_token("jwt"))
                .unwrap();
        let identity = provider.current_identity().await.unwrap().unwrap();
        assert_eq!(identity.user_id, id);
        assert_eq!(identity.email.as_deref(), Some("reader@example.com"));
    }

    #[tokio::test]
    async fn test_expired_session_is_anonymous() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"msg": "JWT expired"})))
            .mount(&server)
            .await;

        let provider =
            HttpIdentityProvider::new(HostedConfig::new(server.uri(), "anon").with_access_token("old"))
                .unwrap();
        assert!(provider.current_identity().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_no_token_skips_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let provider = HttpIdentityProvider::new(HostedConfig::new(server.uri(), "anon")).unwrap();
        assert!(provider.current_identity().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_server_error_is_propagated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let provider =
            HttpIdentityProvider::new(HostedConfig::new(server.uri(), "anon").with_access_token("jwt"))
                .unwrap();
        let err = provider.current_identity().await.unwrap_err();
        assert!(matches!(err, Error::Request(_)));
        assert!(err.to_string().contains("upstream down"));
    }
}
