//! Per-call authorization tokens signed with the account key pair.
//!
//! Upload tokens carry a put policy scoped to `bucket:key`; management
//! tokens sign the request path (and form body) of batch and refresh calls.
//! Both use HMAC-SHA1 with URL-safe base64, as the object store expects.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Lifetime of a freshly minted upload token.
pub const UPLOAD_TOKEN_TTL: Duration = Duration::from_secs(3600);

#[derive(Serialize)]
struct PutPolicy<'a> {
    scope: &'a str,
    deadline: u64,
}

/// Account key pair used to mint tokens.
#[derive(Clone)]
pub struct Credentials {
    access_key: String,
    secret_key: String,
}

impl Credentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }

    /// `URL_SAFE(HMAC-SHA1(secret, data))`.
    pub fn sign(&self, data: &[u8]) -> String {
        let mut mac = HmacSha1::new_from_slice(self.secret_key.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(data);
        URL_SAFE.encode(mac.finalize().into_bytes())
    }

    /// Single-use upload token for `scope` (`bucket:key`), valid for
    /// [`UPLOAD_TOKEN_TTL`].
    pub fn upload_token(&self, scope: &str) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        self.upload_token_with_deadline(scope, (now + UPLOAD_TOKEN_TTL).as_secs())
    }

    /// Upload token with an explicit unix-seconds deadline.
    pub fn upload_token_with_deadline(&self, scope: &str, deadline: u64) -> String {
        let policy = serde_json::to_vec(&PutPolicy { scope, deadline })
            .expect("put policy serializes");
        let encoded = URL_SAFE.encode(policy);
        let sign = self.sign(encoded.as_bytes());
        format!("{}:{sign}:{encoded}", self.access_key)
    }

    /// `Authorization` header value for a management call.
    ///
    /// `path_and_query` is the request target (e.g. `/batch`); `form_body`
    /// is included in the signature only for form-encoded requests.
    pub fn management_token(&self, path_and_query: &str, form_body: Option<&[u8]>) -> String {
        let mut data = Vec::with_capacity(path_and_query.len() + 1);
        data.extend_from_slice(path_and_query.as_bytes());
        data.push(b'\n');
        if let Some(body) = form_body {
            data.extend_from_slice(body);
        }
        format!("QBox {}:{}", self.access_key, self.sign(&data))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// `URL_SAFE("bucket:key")`, the entry form used in batch operations.
pub fn encoded_entry(bucket: &str, key: &str) -> String {
    URL_SAFE.encode(format!("{bucket}:{key}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> Credentials {
        Credentials::new("ak", "sk")
    }

    #[test]
    fn upload_token_layout() {
        let token = creds().upload_token_with_deadline("assets:js/app.js", 1_700_000_000);
        let parts: Vec<&str> = token.splitn(3, ':').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ak");
        assert_eq!(parts[1], creds().sign(parts[2].as_bytes()));

        let policy = URL_SAFE.decode(parts[2]).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&policy).unwrap();
        assert_eq!(value["scope"], "assets:js/app.js");
        assert_eq!(value["deadline"], 1_700_000_000u64);
    }

    #[test]
    fn sign_is_deterministic_and_key_dependent() {
        assert_eq!(creds().sign(b"data"), creds().sign(b"data"));
        assert_ne!(
            creds().sign(b"data"),
            Credentials::new("ak", "other").sign(b"data")
        );
    }

    #[test]
    fn management_token_includes_form_body_only_when_given() {
        let c = creds();
        let with_body = c.management_token("/batch", Some(b"op=/delete/abc"));
        let without = c.management_token("/batch", None);
        assert!(with_body.starts_with("QBox ak:"));
        assert_ne!(with_body, without);
        assert_eq!(without, format!("QBox ak:{}", c.sign(b"/batch\n")));
    }

    #[test]
    fn entry_encoding_is_url_safe() {
        let entry = encoded_entry("assets", "a/b?c.js");
        assert!(!entry.contains('/') && !entry.contains('+'));
        assert_eq!(URL_SAFE.decode(entry).unwrap(), b"assets:a/b?c.js");
    }

    #[test]
    fn debug_redacts_secret() {
        assert!(!format!("{:?}", creds()).contains("\"sk\""));
    }
}
