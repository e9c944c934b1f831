use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use http::header::{HeaderMap, WWW_AUTHENTICATE};
use tracing::trace;

use crate::digest::{can_digest, digest, AuthContext};
use crate::param::{self, Param};
use crate::{strip_digest_prefix, Credentials, Error, Result, PREFIX};

/// Challenge sent by the server in the `WWW-Authenticate` header
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Challenge {
    /// Authorization realm (i.e. hostname, serial number...)
    pub realm: String,
    /// URIs sharing the same protection space; empty if not given
    pub domain: Vec<String>,
    /// Server nonce
    pub nonce: String,
    /// Server opaque string, echoed back verbatim
    pub opaque: String,
    /// True if the server nonce expired.
    /// This is sent in response to an auth attempt with an older digest.
    pub stale: bool,
    /// Hashing algorithm name as received, empty meaning MD5
    pub algorithm: String,
    /// Offered quality of protection options, in header order
    pub qop: Vec<String>,
    /// Server-supported charset
    pub charset: String,
    /// Flag that the server supports user-hashes
    pub userhash: bool,
}

impl Challenge {
    /// Construct from the `WWW-Authenticate` header string
    ///
    /// # Errors
    /// If the `Digest ` prefix is missing or the parameter list is malformed.
    /// Unknown parameters are ignored.
    pub fn parse(input: &str) -> Result<Self> {
        let params = strip_digest_prefix(input).ok_or(Error::InvalidPrefix("challenge"))?;

        let mut challenge = Challenge::default();
        for p in param::parse(params)? {
            match p.key.as_str() {
                "realm" => challenge.realm = p.value,
                "domain" => {
                    challenge.domain = p.value.split_whitespace().map(str::to_string).collect()
                }
                "nonce" => challenge.nonce = p.value,
                "opaque" => challenge.opaque = p.value,
                "stale" => challenge.stale = p.value.eq_ignore_ascii_case("true"),
                "algorithm" => challenge.algorithm = p.value,
                "qop" => {
                    challenge.qop = p
                        .value
                        .split(',')
                        .map(str::trim)
                        .filter(|q| !q.is_empty())
                        .map(str::to_string)
                        .collect()
                }
                "charset" => challenge.charset = p.value,
                "userhash" => challenge.userhash = p.value.eq_ignore_ascii_case("true"),
                _ => {}
            }
        }

        Ok(challenge)
    }

    /// True if the server offers the given qop value (exact match)
    pub fn supports_qop(&self, qop: &str) -> bool {
        self.qop.iter().any(|q| q == qop)
    }

    /// True if [`respond`](#method.respond) can satisfy this challenge
    pub fn can_digest(&self) -> bool {
        can_digest(self)
    }

    /// Compute the credentials for one request. See [`digest()`](fn.digest.html).
    pub fn respond(&self, context: &AuthContext<'_>) -> Result<Credentials> {
        digest(self, context)
    }

    /// Produce a header string (also accessible through the Display trait)
    pub fn to_header_string(&self) -> String {
        self.to_string()
    }
}

impl Display for Challenge {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut params = vec![Param::quoted("realm", self.realm.as_str())];
        if !self.domain.is_empty() {
            params.push(Param::quoted("domain", self.domain.join(" ")));
        }
        params.push(Param::quoted("nonce", self.nonce.as_str()));
        if !self.opaque.is_empty() {
            params.push(Param::quoted("opaque", self.opaque.as_str()));
        }
        if self.stale {
            params.push(Param::bare("stale", "true"));
        }
        if !self.algorithm.is_empty() {
            params.push(Param::bare("algorithm", self.algorithm.as_str()));
        }
        if !self.qop.is_empty() {
            params.push(Param::quoted("qop", self.qop.join(",")));
        }
        if !self.charset.is_empty() {
            params.push(Param::bare("charset", self.charset.as_str()));
        }
        if self.userhash {
            params.push(Param::bare("userhash", "true"));
        }

        f.write_str(PREFIX)?;
        f.write_str(&param::format(&params))
    }
}

impl FromStr for Challenge {
    type Err = Error;

    /// Parse HTTP header
    fn from_str(input: &str) -> Result<Self> {
        Self::parse(input)
    }
}

/// Pick the first usable Digest challenge among the response's
/// `WWW-Authenticate` headers.
///
/// Other schemes and challenges failing [`can_digest`](fn.can_digest.html)
/// are skipped. Malformed Digest challenges are skipped too, but if nothing
/// usable remains the first parse error is returned rather than
/// [`Error::NoUsableChallenge`].
pub fn find_challenge(headers: &HeaderMap) -> Result<Challenge> {
    let mut parse_error = None;

    for value in headers.get_all(WWW_AUTHENTICATE) {
        // to_str() rejects obs-text, which is how UTF-8 realms arrive
        let value = match std::str::from_utf8(value.as_bytes()) {
            Ok(v) => v,
            Err(e) => {
                trace!(error = %e, "skipping undecodable challenge");
                continue;
            }
        };
        if strip_digest_prefix(value).is_none() {
            trace!(header = value, "skipping non-digest challenge");
            continue;
        }
        match Challenge::parse(value) {
            Ok(challenge) if challenge.can_digest() => return Ok(challenge),
            Ok(_) => trace!(header = value, "skipping unsupported digest challenge"),
            Err(e) => {
                trace!(header = value, error = %e, "skipping malformed digest challenge");
                parse_error.get_or_insert(e);
            }
        }
    }

    Err(parse_error.unwrap_or(Error::NoUsableChallenge))
}
