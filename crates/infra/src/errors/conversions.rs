//! Conversions from external infrastructure errors into domain errors.

use std::io::{Error as IoError, ErrorKind};

use handoff_domain::AuthError;
use reqwest::Error as HttpError;
use serde_json::Error as JsonError;
use toml::de::Error as TomlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub AuthError);

impl From<InfraError> for AuthError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<AuthError> for InfraError {
    fn from(value: AuthError) -> Self {
        InfraError(value)
    }
}

trait IntoAuthError {
    fn into_auth(self) -> AuthError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → AuthError */
/* -------------------------------------------------------------------------- */

impl IntoAuthError for HttpError {
    fn into_auth(self) -> AuthError {
        if self.is_timeout() {
            return AuthError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return AuthError::Network("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            let message = format!(
                "HTTP {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("unknown status")
            );
            return if status.is_client_error() {
                AuthError::Validation(message)
            } else {
                AuthError::Network(message)
            };
        }

        if self.is_builder() {
            return AuthError::Config(format!("invalid HTTP request: {self}"));
        }

        AuthError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_auth())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json / toml → AuthError */
/* -------------------------------------------------------------------------- */

impl IntoAuthError for JsonError {
    fn into_auth(self) -> AuthError {
        AuthError::Config(format!("Invalid JSON format: {self}"))
    }
}

impl From<JsonError> for InfraError {
    fn from(value: JsonError) -> Self {
        InfraError(value.into_auth())
    }
}

impl IntoAuthError for TomlError {
    fn into_auth(self) -> AuthError {
        AuthError::Config(format!("Invalid TOML format: {self}"))
    }
}

impl From<TomlError> for InfraError {
    fn from(value: TomlError) -> Self {
        InfraError(value.into_auth())
    }
}

/* -------------------------------------------------------------------------- */
/* std::io::Error → AuthError */
/* -------------------------------------------------------------------------- */

impl IntoAuthError for IoError {
    fn into_auth(self) -> AuthError {
        match self.kind() {
            ErrorKind::NotFound => AuthError::Config(format!("file not found: {self}")),
            ErrorKind::PermissionDenied => AuthError::Config(format!("permission denied: {self}")),
            _ => AuthError::Internal(format!("I/O error: {self}")),
        }
    }
}

impl From<IoError> for InfraError {
    fn from(value: IoError) -> Self {
        InfraError(value.into_auth())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use reqwest::Client;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn http_status_errors_split_by_class() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = Client::new()
            .get(server.uri())
            .send()
            .await
            .unwrap()
            .error_for_status()
            .unwrap_err();

        let mapped: AuthError = InfraError::from(err).into();
        assert_eq!(mapped, AuthError::Validation("HTTP 401 Unauthorized".into()));
    }

    #[tokio::test]
    async fn connection_failure_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = Client::new().get(format!("http://{addr}")).send().await.unwrap_err();

        let mapped: AuthError = InfraError::from(err).into();
        assert_eq!(mapped.label(), "network");
    }

    #[test]
    fn parse_errors_are_config_errors() {
        let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let mapped: AuthError = InfraError::from(json).into();
        assert!(matches!(mapped, AuthError::Config(ref m) if m.starts_with("Invalid JSON format")));

        let toml = toml::from_str::<toml::Table>("= nope").unwrap_err();
        let mapped: AuthError = InfraError::from(toml).into();
        assert!(matches!(mapped, AuthError::Config(ref m) if m.starts_with("Invalid TOML format")));
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = IoError::new(ErrorKind::NotFound, "handoff.toml");
        let mapped: AuthError = InfraError::from(err).into();
        assert_eq!(mapped.label(), "config");

        let err = IoError::new(ErrorKind::Interrupted, "try again");
        let mapped: AuthError = InfraError::from(err).into();
        assert_eq!(mapped.label(), "internal");
    }
}
