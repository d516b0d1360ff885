use std::fmt;
use url::form_urlencoded;

/// Canonical identity of a remote call, used as the cache key
///
/// Two logical requests share an identity exactly when they share the method,
/// the endpoint and the same parameter set. Parameters are sorted and
/// form-encoded, so insertion order and encoding quirks never split the cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestIdentity(String);

impl RequestIdentity {
    /// Starts building an identity for `method` on `endpoint`
    pub fn builder(method: &str, endpoint: &str) -> RequestIdentityBuilder {
        RequestIdentityBuilder {
            method: method.to_uppercase(),
            endpoint: endpoint.trim().to_string(),
            params: Vec::new(),
        }
    }

    /// Identity of a parameterless GET
    pub fn get(url: &str) -> Self {
        Self::builder("GET", url).build()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builder for [`RequestIdentity`]
#[derive(Debug, Clone)]
pub struct RequestIdentityBuilder {
    method: String,
    endpoint: String,
    params: Vec<(String, String)>,
}

impl RequestIdentityBuilder {
    pub fn param(mut self, key: &str, value: &str) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    pub fn build(mut self) -> RequestIdentity {
        self.params.sort();

        let mut identity = format!("{} {}", self.method, self.endpoint);
        if !self.params.is_empty() {
            let encoded = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(&self.params)
                .finish();
            identity.push(' ');
            identity.push_str(&encoded);
        }

        RequestIdentity(identity)
    }
}
