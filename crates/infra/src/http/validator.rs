//! Token validation against the "who am I" endpoint

use async_trait::async_trait;
use handoff_core::TokenValidator;
use handoff_domain::constants::TOKEN_VALIDATION_PATH;
use handoff_domain::{AuthError, Environment, Result};
use reqwest::Method;
use tracing::debug;

use super::client::HttpClient;

/// Validates a token with one authenticated `GET`. Any 2xx is valid.
#[derive(Clone)]
pub struct HttpTokenValidator {
    client: HttpClient,
    endpoint: String,
}

impl HttpTokenValidator {
    /// Validator calling `<api_base>/api/v2/tokens/me`.
    pub fn new(api_base: &str) -> Result<Self> {
        Ok(Self::with_client(HttpClient::new()?, api_base))
    }

    pub fn for_environment(environment: &Environment) -> Result<Self> {
        Self::new(&environment.api_base)
    }

    pub fn with_client(client: HttpClient, api_base: &str) -> Self {
        let endpoint = format!("{}{TOKEN_VALIDATION_PATH}", api_base.trim_end_matches('/'));
        Self { client, endpoint }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TokenValidator for HttpTokenValidator {
    async fn validate(&self, token: &str) -> Result<()> {
        let request = self.client.request(Method::GET, &self.endpoint).bearer_auth(token);
        let response = self.client.send(request).await?;
        let status = response.status();

        if status.is_success() {
            debug!(%status, "Token accepted");
            return Ok(());
        }

        debug!(%status, "Token rejected");
        Err(AuthError::Validation(format!(
            "HTTP {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("unknown status")
        )))
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn success_status_means_valid() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/tokens/me"))
            .and(header("authorization", "Bearer good-token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&server)
            .await;

        let validator = HttpTokenValidator::new(&server.uri()).unwrap();
        assert!(validator.validate("good-token").await.is_ok());
    }

    #[tokio::test]
    async fn rejected_token_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/tokens/me"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let validator = HttpTokenValidator::new(&server.uri()).unwrap();
        let err = validator.validate("bad-token").await.unwrap_err();

        assert_eq!(err, AuthError::Validation("HTTP 401 Unauthorized".into()));
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn server_error_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let validator = HttpTokenValidator::new(&server.uri()).unwrap();
        assert!(validator.validate("any").await.is_err());
    }

    #[test]
    fn endpoint_is_built_from_environment() {
        let env = handoff_domain::parse_env("api.mypurecloud.ie");
        let validator = HttpTokenValidator::for_environment(&env).unwrap();
        assert_eq!(validator.endpoint(), "https://api.mypurecloud.ie/api/v2/tokens/me");
    }
}
