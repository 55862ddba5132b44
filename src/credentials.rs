//! Cluster credential bundle and its validation rules.
//!
//! A deployment needs an API server address plus exactly one usable way to
//! authenticate: a bearer token, or a client certificate paired with its key.
//! The pipeline environment hands values over as plain strings where an empty
//! string means "unset"; [`ClusterCredentials::validated`] folds that away,
//! checks the bundle, and fills in defaults.

use secrecy::{ExposeSecret, SecretString};

/// Service account used when the pipeline does not name one.
pub const DEFAULT_SERVICE_ACCOUNT: &str = "helm";

/// Why a credential bundle cannot be used to deploy.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CredentialsError {
    /// No cluster API server address was supplied.
    #[error("an API server address is required to deploy")]
    MissingApiServer,

    /// Neither a token nor any client certificate material was supplied.
    #[error("a token or a client certificate pair is required to deploy")]
    MissingCredentials,

    /// A client certificate without its key, or a key without its
    /// certificate, is unusable.
    #[error("both a client certificate and a client key are required to deploy")]
    IncompleteClientCertPair,
}

/// Everything needed to authenticate against a cluster.
///
/// Built raw from the pipeline environment, then passed through
/// [`validated`](Self::validated) before anything renders it. The token and
/// the client key are secret material; their `Debug` output is redacted and
/// they are only exposed at render time.
#[derive(Debug)]
pub struct ClusterCredentials {
    /// Cluster API server address, e.g. `https://k8s.example:6443`.
    pub api_server: String,

    /// Namespace the deployment targets.
    pub namespace: Option<String>,

    /// Service account to authenticate as. Defaults to
    /// [`DEFAULT_SERVICE_ACCOUNT`] during validation.
    pub service_account: Option<String>,

    /// Bearer token.
    pub token: Option<SecretString>,

    /// Client certificate data. Only usable together with `client_key`.
    pub client_certificate: Option<String>,

    /// Client key data. Only usable together with `client_certificate`.
    pub client_key: Option<SecretString>,

    /// Certificate authority data for verifying the API server.
    pub certificate_authority: Option<String>,

    /// Skip TLS verification when talking to the API server.
    pub skip_tls_verify: bool,
}

impl ClusterCredentials {
    /// Create a bundle for the given API server with nothing else set.
    pub fn new(api_server: impl Into<String>) -> Self {
        Self {
            api_server: api_server.into(),
            namespace: None,
            service_account: None,
            token: None,
            client_certificate: None,
            client_key: None,
            certificate_authority: None,
            skip_tls_verify: false,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_service_account(mut self, service_account: impl Into<String>) -> Self {
        self.service_account = Some(service_account.into());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(SecretString::from(token.into()));
        self
    }

    pub fn with_client_certificate(mut self, certificate: impl Into<String>) -> Self {
        self.client_certificate = Some(certificate.into());
        self
    }

    pub fn with_client_key(mut self, key: impl Into<String>) -> Self {
        self.client_key = Some(SecretString::from(key.into()));
        self
    }

    pub fn with_certificate_authority(mut self, authority: impl Into<String>) -> Self {
        self.certificate_authority = Some(authority.into());
        self
    }

    pub fn with_skip_tls_verify(mut self, skip: bool) -> Self {
        self.skip_tls_verify = skip;
        self
    }

    /// Fold empty strings to unset. The pipeline environment cannot
    /// distinguish an unset variable from an empty one, so neither do we.
    fn normalized(mut self) -> Self {
        fn drop_empty(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.is_empty())
        }
        fn drop_empty_secret(value: Option<SecretString>) -> Option<SecretString> {
            value.filter(|v| !v.expose_secret().is_empty())
        }

        self.namespace = drop_empty(self.namespace);
        self.service_account = drop_empty(self.service_account);
        self.token = drop_empty_secret(self.token);
        self.client_certificate = drop_empty(self.client_certificate);
        self.client_key = drop_empty_secret(self.client_key);
        self.certificate_authority = drop_empty(self.certificate_authority);
        self
    }

    /// Check the bundle and fill in defaults, returning the bundle a step
    /// may render from.
    ///
    /// The client certificate pair must be complete whenever either half is
    /// present, including when a token is also supplied; a token alone, with
    /// neither pair field set, is valid.
    pub fn validated(self) -> Result<Self, CredentialsError> {
        let mut credentials = self.normalized();

        if credentials.api_server.is_empty() {
            return Err(CredentialsError::MissingApiServer);
        }

        let has_token = credentials.token.is_some();
        let has_certificate = credentials.client_certificate.is_some();
        let has_key = credentials.client_key.is_some();

        if !has_token && !has_certificate && !has_key {
            return Err(CredentialsError::MissingCredentials);
        }
        // Checked even when a token is present.
        if has_certificate != has_key {
            return Err(CredentialsError::IncompleteClientCertPair);
        }

        if credentials.service_account.is_none() {
            credentials.service_account = Some(DEFAULT_SERVICE_ACCOUNT.to_string());
        }

        Ok(credentials)
    }
}
