//! This crate implements client-side Digest Auth as specified by IETF RFCs 2617 and 7616.
//!
//! There are two layers:
//!
//! - [`Challenge`], [`Credentials`] and [`digest()`] parse the `WWW-Authenticate` header,
//!   compute the answer and format the `Authorization` header. This works with any HTTP
//!   client.
//! - [`DigestTransport`] wraps an [`HttpExecutor`] and does the whole dance on its own:
//!   it caches one challenge per host, counts nonce reuse, and retries a request once
//!   when the server answers `401`.
//!
//! # Examples
//!
//! Basic usage:
//!
//! ```
//! use digest_auth::AuthContext;
//!
//! // Value from the WWW-Authenticate HTTP header (usually in a HTTP 401 response)
//! let www_authenticate = r#"Digest realm="http-auth@example.org", qop="auth, auth-int", algorithm=MD5, nonce="7ypf/xlj9XXwfDPEoM4URrv/xwf94BcCAzFZH4GiTo0v", opaque="FQhe/qaU925kfnzjCev0ciny7QMkPqMAFRtzCUYo5tdS""#;
//!
//! // Prepare an authorization context. Note that this is a GET request. There are different
//! // constructors available for other request types. It's cheap to create a fresh one each
//! // time, as the struct uses references only.
//! let mut context = AuthContext::new("Mufasa", "Circle of Life", "/dir/index.html");
//! // For this test, we inject a custom cnonce. It's generated for you otherwise.
//! context.set_custom_cnonce("f2/wE4q74E6zIJEtWaHKaf5wv/H5QzzpXusqGemxURZJ");
//!
//! // Parse the prompt header. You can inspect the parsed object, its fields are public.
//! let prompt = digest_auth::parse_challenge(www_authenticate).unwrap();
//!
//! // Compute a value for the Authorization header that we'll send back to the server
//! let answer = prompt.respond(&context).unwrap().to_string();
//! assert_eq!(answer, r#"Digest username="Mufasa", realm="http-auth@example.org", nonce="7ypf/xlj9XXwfDPEoM4URrv/xwf94BcCAzFZH4GiTo0v", uri="/dir/index.html", response="8ca523f5e9506fed4657c9700eebdbec", algorithm=MD5, cnonce="f2/wE4q74E6zIJEtWaHKaf5wv/H5QzzpXusqGemxURZJ", opaque="FQhe/qaU925kfnzjCev0ciny7QMkPqMAFRtzCUYo5tdS", qop=auth, nc=00000001"#);
//!
//! // You can re-use the prompt for subsequent requests, assuming the server allows nonce
//! // re-use. The nonce count must go up every time.
//! context.set_nonce_count(2);
//! let answer2 = prompt.respond(&context).unwrap();
//! // notice how the 'response' field changed - the 'nc' counter is included in the hash
//! assert_eq!(answer2.response, "4b5d595ecf2db9df612ea5b45cd97101");
//! ```

mod body;
mod challenge;
mod credentials;
mod digest;
mod enums;
mod error;
mod param;
mod transport;

pub use error::{BoxError, Error, ParseError, Result};

pub use crate::body::Body;
pub use crate::challenge::{find_challenge, Challenge};
pub use crate::credentials::Credentials;
pub use crate::digest::{
    can_digest, digest, generate_cnonce, generate_cnonce_with, AuthContext, BodyProvider,
};
pub use crate::enums::*;
pub use crate::param::{format as format_params, parse as parse_params, Param};
pub use crate::transport::{
    ChallengeFinder, DigestTransport, HttpExecutor, MonotonicCounter, NonceCounter,
};

/// Scheme prefix of both Digest headers
pub const PREFIX: &str = "Digest ";

/// True if the header value starts with `Digest ` (case-insensitive)
pub fn is_digest(header: &str) -> bool {
    strip_digest_prefix(header).is_some()
}

/// The header value after the `Digest ` prefix, if it has one
pub fn strip_digest_prefix(header: &str) -> Option<&str> {
    let prefix = header.get(..PREFIX.len())?;
    if prefix.eq_ignore_ascii_case(PREFIX) {
        Some(&header[PREFIX.len()..])
    } else {
        None
    }
}

/// Parse the WWW-Authenticate header value.
/// It's just a convenience method to call [`Challenge::parse()`](struct.Challenge.html#method.parse).
pub fn parse_challenge(www_authenticate: &str) -> Result<Challenge> {
    Challenge::parse(www_authenticate)
}

/// Parse the Authorization header value.
/// It's just a convenience method to call [`Credentials::parse()`](struct.Credentials.html#method.parse).
pub fn parse_credentials(authorization: &str) -> Result<Credentials> {
    Credentials::parse(authorization)
}

#[test]
fn test_prefix() {
    assert!(is_digest("Digest realm=\"a\""));
    assert!(is_digest("DIGEST realm=\"a\""));
    assert!(!is_digest("Digest"));
    assert!(!is_digest("Basic realm=\"a\""));
    assert!(!is_digest("Dig\u{e9}st realm"));
    assert_eq!(strip_digest_prefix("digest a=b"), Some("a=b"));
}

#[test]
fn test_parse_respond() {
    let src = r#"Digest realm="http-auth@example.org", qop="auth, auth-int", algorithm=MD5, nonce="7ypf/xlj9XXwfDPEoM4URrv/xwf94BcCAzFZH4GiTo0v", opaque="FQhe/qaU925kfnzjCev0ciny7QMkPqMAFRtzCUYo5tdS""#;

    let mut context = AuthContext::new("Mufasa", "Circle of Life", "/dir/index.html");
    context.set_custom_cnonce("f2/wE4q74E6zIJEtWaHKaf5wv/H5QzzpXusqGemxURZJ");

    let prompt = crate::parse_challenge(src).unwrap();
    let answer = prompt.respond(&context).unwrap();

    let str = answer.to_string().replace(", ", ",\n  ");

    assert_eq!(
        str,
        r#"
Digest username="Mufasa",
  realm="http-auth@example.org",
  nonce="7ypf/xlj9XXwfDPEoM4URrv/xwf94BcCAzFZH4GiTo0v",
  uri="/dir/index.html",
  response="8ca523f5e9506fed4657c9700eebdbec",
  algorithm=MD5,
  cnonce="f2/wE4q74E6zIJEtWaHKaf5wv/H5QzzpXusqGemxURZJ",
  opaque="FQhe/qaU925kfnzjCev0ciny7QMkPqMAFRtzCUYo5tdS",
  qop=auth,
  nc=00000001
"#
        .trim()
    );

    let parsed = crate::parse_credentials(&answer.to_string()).unwrap();
    assert_eq!(parsed, answer);
}
