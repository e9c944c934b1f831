use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::param::{self, Param};
use crate::{strip_digest_prefix, Error, Result, PREFIX};

/// Header sent back to the server, including password hashes.
///
/// Usually obtained from [`digest()`](fn.digest.html) or
/// [`Challenge::respond()`](struct.Challenge.html#method.respond).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Username, or its hash when the challenge asked for `userhash`
    pub username: String,
    pub realm: String,
    pub nonce: String,
    /// Requested URI (path and query)
    pub uri: String,
    /// Computed digest, lowercase hex
    pub response: String,
    pub algorithm: String,
    /// Client nonce; only sent when `qop` is set
    pub cnonce: String,
    pub opaque: String,
    /// QOP chosen from the list offered by server.
    /// Empty in legacy compat mode (RFC 2069)
    pub qop: String,
    /// How many requests have been signed with this server nonce
    pub nc: u32,
    /// True if `username` is hashed
    pub userhash: bool,
}

impl Credentials {
    /// Construct from the `Authorization` header string
    ///
    /// # Errors
    /// If the `Digest ` prefix is missing, the parameter list is malformed or
    /// `nc` is not a hex number.
    pub fn parse(input: &str) -> Result<Self> {
        let params = strip_digest_prefix(input).ok_or(Error::InvalidPrefix("credentials"))?;

        let mut credentials = Credentials::default();
        for p in param::parse(params)? {
            match p.key.as_str() {
                "username" => credentials.username = p.value,
                "realm" => credentials.realm = p.value,
                "nonce" => credentials.nonce = p.value,
                "uri" => credentials.uri = p.value,
                "response" => credentials.response = p.value,
                "algorithm" => credentials.algorithm = p.value,
                "cnonce" => credentials.cnonce = p.value,
                "opaque" => credentials.opaque = p.value,
                "qop" => credentials.qop = p.value,
                "nc" => {
                    credentials.nc = u32::from_str_radix(&p.value, 16).map_err(|source| {
                        Error::InvalidNonceCount {
                            value: p.value.clone(),
                            source,
                        }
                    })?
                }
                "userhash" => credentials.userhash = p.value.eq_ignore_ascii_case("true"),
                _ => {}
            }
        }

        Ok(credentials)
    }

    /// Produce a header string (also accessible through the Display trait)
    pub fn to_header_string(&self) -> String {
        self.to_string()
    }
}

impl Display for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut params = vec![
            Param::quoted("username", self.username.as_str()),
            Param::quoted("realm", self.realm.as_str()),
            Param::quoted("nonce", self.nonce.as_str()),
            Param::quoted("uri", self.uri.as_str()),
            Param::quoted("response", self.response.as_str()),
        ];
        if !self.algorithm.is_empty() {
            params.push(Param::bare("algorithm", self.algorithm.as_str()));
        }
        if !self.qop.is_empty() {
            params.push(Param::quoted("cnonce", self.cnonce.as_str()));
        }
        if !self.opaque.is_empty() {
            params.push(Param::quoted("opaque", self.opaque.as_str()));
        }
        if !self.qop.is_empty() {
            params.push(Param::bare("qop", self.qop.as_str()));
            params.push(Param::bare("nc", format!("{:08x}", self.nc)));
        }
        if self.userhash {
            params.push(Param::bare("userhash", "true"));
        }

        f.write_str(PREFIX)?;
        f.write_str(&param::format(&params))
    }
}

impl FromStr for Credentials {
    type Err = Error;

    /// Parse HTTP header
    fn from_str(input: &str) -> Result<Self> {
        Self::parse(input)
    }
}
