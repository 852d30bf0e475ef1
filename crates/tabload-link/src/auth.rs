//! Authentication for the tabular store client.
//!
//! The store expects its service credential on every request, both as
//! an `apikey` header and as a bearer token.

/// Credential attached to outgoing requests.
#[derive(Debug, Clone)]
pub enum StoreAuth {
    /// Service-role key, applied as `apikey` + bearer headers.
    ServiceKey(String),

    /// No authentication (local development stores).
    None,
}

impl StoreAuth {
    pub fn service_key(key: impl Into<String>) -> Self {
        Self::ServiceKey(key.into())
    }

    pub fn none() -> Self {
        Self::None
    }

    /// Attach authentication headers to a request builder.
    pub fn apply_to_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Self::ServiceKey(key) => request.header("apikey", key).bearer_auth(key),
            Self::None => request,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Self::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_key_is_authenticated() {
        assert!(StoreAuth::service_key("svc_123").is_authenticated());
        assert!(!StoreAuth::none().is_authenticated());
    }

    #[test]
    fn test_apply_sets_both_headers() {
        let client = reqwest::Client::new();
        let request = StoreAuth::service_key("svc_123")
            .apply_to_request(client.get("http://localhost/rest/v1/t"))
            .build()
            .expect("build request");
        assert_eq!(request.headers().get("apikey").unwrap(), "svc_123");
        assert_eq!(
            request.headers().get("authorization").unwrap(),
            "Bearer svc_123"
        );
    }
}
