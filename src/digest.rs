use std::fmt::{self, Debug, Formatter};
use std::io::{self, Read};

use bytes::Bytes;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::{Algorithm, Challenge, Credentials, Error, Qop, Result};

/// Source of a request body that can be read more than once.
///
/// Needed to hash the body for `qop=auth-int`.
pub trait BodyProvider: Send + Sync {
    /// Open a fresh reader positioned at the start of the body
    fn open(&self) -> io::Result<Box<dyn Read + '_>>;
}

impl BodyProvider for &[u8] {
    fn open(&self) -> io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(*self))
    }
}

impl BodyProvider for Vec<u8> {
    fn open(&self) -> io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(self.as_slice()))
    }
}

impl BodyProvider for Bytes {
    fn open(&self) -> io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(&self[..]))
    }
}

impl BodyProvider for String {
    fn open(&self) -> io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(self.as_bytes()))
    }
}

/// Login attempt context
///
/// All fields are borrowed to reduce runtime overhead; this struct should not be stored anywhere,
/// it is normally meaningful only for the one request.
pub struct AuthContext<'a> {
    /// Login username
    pub username: &'a str,
    /// Login password (plain)
    pub password: &'a str,
    /// Requested URI (not a domain! should start with a slash)
    pub uri: &'a str,
    /// HTTP method used (defaults to GET)
    pub method: &'a str,
    /// Request payload body - used for auth-int (auth with integrity check).
    /// A missing body hashes as empty.
    pub body: Option<&'a dyn BodyProvider>,
    /// Nonce count; 0 means the first use of the challenge
    pub nc: u32,
    /// Spoofed client nonce (use only for tests; a random nonce is generated automatically)
    pub cnonce: Option<&'a str>,
    /// Pre-computed `H(username:realm:password)`, used instead of hashing the password
    pub ha1: Option<&'a str>,
}

impl<'a> AuthContext<'a> {
    /// Construct a new context with the GET verb and no payload body.
    /// See the other constructors if this does not fit your situation.
    pub fn new(username: &'a str, password: &'a str, uri: &'a str) -> Self {
        Self::new_with_method(username, password, uri, None, "GET")
    }

    /// Construct a new context with arbitrary verb and, optionally, a payload body
    pub fn new_with_method(
        username: &'a str,
        password: &'a str,
        uri: &'a str,
        body: Option<&'a dyn BodyProvider>,
        method: &'a str,
    ) -> Self {
        Self {
            username,
            password,
            uri,
            method,
            body,
            nc: 0,
            cnonce: None,
            ha1: None,
        }
    }

    pub fn set_custom_cnonce(&mut self, cnonce: &'a str) {
        self.cnonce = Some(cnonce);
    }

    pub fn set_nonce_count(&mut self, nc: u32) {
        self.nc = nc;
    }

    pub fn set_body(&mut self, body: &'a dyn BodyProvider) {
        self.body = Some(body);
    }

    pub fn set_ha1(&mut self, ha1: &'a str) {
        self.ha1 = Some(ha1);
    }
}

impl Debug for AuthContext<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthContext")
            .field("username", &self.username)
            .field("uri", &self.uri)
            .field("method", &self.method)
            .field("body", &self.body.is_some())
            .field("nc", &self.nc)
            .field("cnonce", &self.cnonce)
            .finish_non_exhaustive()
    }
}

/// Pick the QOP to answer with: none for RFC 2069 servers, else `auth`
/// over `auth-int`.
fn select_qop(challenge: &Challenge) -> Result<Option<Qop>> {
    if challenge.qop.is_empty() {
        Ok(None)
    } else if challenge.supports_qop(Qop::Auth.as_str()) {
        Ok(Some(Qop::Auth))
    } else if challenge.supports_qop(Qop::AuthInt.as_str()) {
        Ok(Some(Qop::AuthInt))
    } else {
        Err(Error::UnsupportedQop(challenge.qop.join(",")))
    }
}

/// True if [`digest()`](fn.digest.html) can answer the challenge: known
/// algorithm, and no qop or one of `auth` / `auth-int`.
pub fn can_digest(challenge: &Challenge) -> bool {
    challenge.algorithm.parse::<Algorithm>().is_ok() && select_qop(challenge).is_ok()
}

/// Compute the credentials answering `challenge` for one request.
///
/// Reusing a challenge requires a higher [`nc`](struct.AuthContext.html#structfield.nc)
/// on every call.
///
/// # Errors
///
/// Unsupported algorithm or qop, an unreadable body for `auth-int`, or no
/// entropy for the client nonce.
pub fn digest(challenge: &Challenge, context: &AuthContext<'_>) -> Result<Credentials> {
    let algo: Algorithm = challenge.algorithm.parse()?;
    let qop = select_qop(challenge)?;

    // hashed or unhashed username - always hash if server wants it
    let username = if challenge.userhash {
        algo.hash_join(&[context.username, &challenge.realm])
    } else {
        context.username.to_string()
    };

    let ha1 = match context.ha1 {
        Some(ha1) => ha1.to_string(),
        None => algo.hash_join(&[context.username, &challenge.realm, context.password]),
    };

    let mut credentials = Credentials {
        username,
        realm: challenge.realm.clone(),
        nonce: challenge.nonce.clone(),
        uri: context.uri.to_string(),
        algorithm: if challenge.algorithm.is_empty() {
            algo.to_string()
        } else {
            challenge.algorithm.clone()
        },
        opaque: challenge.opaque.clone(),
        nc: context.nc,
        userhash: challenge.userhash,
        ..Default::default()
    };

    let qop = match qop {
        None => {
            let ha2 = algo.hash_join(&[context.method, context.uri]);
            credentials.response = algo.hash_join(&[&ha1, &challenge.nonce, &ha2]);
            return Ok(credentials);
        }
        Some(qop) => qop,
    };

    let ha2 = match qop {
        Qop::Auth => algo.hash_join(&[context.method, context.uri]),
        Qop::AuthInt => {
            let body_hash = hash_body(algo, context.body)?;
            algo.hash_join(&[context.method, context.uri, &body_hash])
        }
    };

    credentials.cnonce = match context.cnonce {
        Some(cnonce) => cnonce.to_string(),
        None => generate_cnonce()?,
    };
    credentials.nc = context.nc.max(1);
    credentials.qop = qop.to_string();
    credentials.response = algo.hash_join(&[
        &ha1,
        &challenge.nonce,
        &format!("{:08x}", credentials.nc),
        &credentials.cnonce,
        qop.as_str(),
        &ha2,
    ]);

    Ok(credentials)
}

fn hash_body(algo: Algorithm, body: Option<&dyn BodyProvider>) -> Result<String> {
    match body {
        None => Ok(algo.hash(b"")),
        Some(provider) => {
            let mut reader = provider.open().map_err(Error::BodyRead)?;
            algo.hash_reader(&mut reader).map_err(Error::BodyRead)
        }
    }
}

/// 8 random bytes from the OS, hex encoded
pub fn generate_cnonce() -> Result<String> {
    generate_cnonce_with(&mut OsRng)
}

/// 8 random bytes from `rng`, hex encoded. A failing generator is an error,
/// never a fixed fallback value.
pub fn generate_cnonce_with<R: RngCore + ?Sized>(rng: &mut R) -> Result<String> {
    let mut bytes = [0u8; 8];
    rng.try_fill_bytes(&mut bytes).map_err(Error::Entropy)?;
    Ok(hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::{can_digest, digest, generate_cnonce, generate_cnonce_with, AuthContext, BodyProvider};
    use crate::{Challenge, Credentials, Error};
    use std::io::{self, Read};

    fn rfc7616_challenge(algorithm: &str) -> Challenge {
        Challenge {
            realm: "http-auth@example.org".into(),
            nonce: "7ypf/xlj9XXwfDPEoM4URrv/xwf94BcCAzFZH4GiTo0v".into(),
            opaque: "FQhe/qaU925kfnzjCev0ciny7QMkPqMAFRtzCUYo5tdS".into(),
            algorithm: algorithm.into(),
            qop: vec!["auth".into(), "auth-int".into()],
            ..Default::default()
        }
    }

    fn rfc7616_context() -> AuthContext<'static> {
        let mut context = AuthContext::new("Mufasa", "Circle of Life", "/dir/index.html");
        context.set_custom_cnonce("f2/wE4q74E6zIJEtWaHKaf5wv/H5QzzpXusqGemxURZJ");
        context
    }

    #[test]
    fn test_rfc7616_md5() {
        let expected = Credentials {
            username: "Mufasa".into(),
            realm: "http-auth@example.org".into(),
            nonce: "7ypf/xlj9XXwfDPEoM4URrv/xwf94BcCAzFZH4GiTo0v".into(),
            uri: "/dir/index.html".into(),
            response: "8ca523f5e9506fed4657c9700eebdbec".into(),
            algorithm: "MD5".into(),
            cnonce: "f2/wE4q74E6zIJEtWaHKaf5wv/H5QzzpXusqGemxURZJ".into(),
            opaque: "FQhe/qaU925kfnzjCev0ciny7QMkPqMAFRtzCUYo5tdS".into(),
            qop: "auth".into(),
            nc: 1,
            userhash: false,
        };

        let context = rfc7616_context();
        assert_eq!(digest(&rfc7616_challenge("MD5"), &context).unwrap(), expected);
        // an absent algorithm means MD5
        assert_eq!(digest(&rfc7616_challenge(""), &context).unwrap(), expected);
    }

    #[test]
    fn test_rfc7616_md5_second_use() {
        let mut context = rfc7616_context();
        context.set_nonce_count(2);

        let answer = rfc7616_challenge("MD5").respond(&context).unwrap();
        assert_eq!(answer.nc, 2);
        assert_eq!(answer.response, "4b5d595ecf2db9df612ea5b45cd97101");
        assert!(answer.to_string().ends_with("qop=auth, nc=00000002"));
    }

    #[test]
    fn test_rfc7616_sha256() {
        let answer = digest(&rfc7616_challenge("SHA-256"), &rfc7616_context()).unwrap();
        assert_eq!(
            answer.response,
            "753927fa0e85d155564e2e272a28d1802ca10daf4496794697cf8db5856cb6c1"
        );
        assert_eq!(answer.algorithm, "SHA-256");
        assert_eq!(
            answer.to_string(),
            r#"Digest username="Mufasa", realm="http-auth@example.org", nonce="7ypf/xlj9XXwfDPEoM4URrv/xwf94BcCAzFZH4GiTo0v", uri="/dir/index.html", response="753927fa0e85d155564e2e272a28d1802ca10daf4496794697cf8db5856cb6c1", algorithm=SHA-256, cnonce="f2/wE4q74E6zIJEtWaHKaf5wv/H5QzzpXusqGemxURZJ", opaque="FQhe/qaU925kfnzjCev0ciny7QMkPqMAFRtzCUYo5tdS", qop=auth, nc=00000001"#
        );
    }

    #[test]
    fn test_rfc7616_userhash() {
        let challenge = Challenge {
            realm: "api@example.org".into(),
            nonce: "5TsQWLVdgBdmrQ0XsxbDODV+57QdFR34I9HAbC/RVvkK".into(),
            opaque: "HRPCssKJSGjCrkzDg8OhwpzCiGPChXYjwrI2QmXDnsOS".into(),
            algorithm: "SHA-512-256".into(),
            qop: vec!["auth".into()],
            charset: "UTF-8".into(),
            userhash: true,
            ..Default::default()
        };
        let mut context = AuthContext::new("J\u{e4}s\u{f8}n Doe", "Secret, or not?", "/doe.json");
        context.set_custom_cnonce("NTg6RKcb9boFIAS3KrFK9BGeh+iDa/sm6jUMp2wds69v");

        let answer = digest(&challenge, &context).unwrap();
        assert_eq!(
            answer,
            Credentials {
                username: "793263caabb707a56211940d90411ea4a575adeccb7e360aeb624ed06ece9b0b"
                    .into(),
                realm: "api@example.org".into(),
                nonce: "5TsQWLVdgBdmrQ0XsxbDODV+57QdFR34I9HAbC/RVvkK".into(),
                uri: "/doe.json".into(),
                response: "3798d4131c277846293534c3edc11bd8a5e4cdcbff78b05db9d95eeb1cec68a5"
                    .into(),
                algorithm: "SHA-512-256".into(),
                cnonce: "NTg6RKcb9boFIAS3KrFK9BGeh+iDa/sm6jUMp2wds69v".into(),
                opaque: "HRPCssKJSGjCrkzDg8OhwpzCiGPChXYjwrI2QmXDnsOS".into(),
                qop: "auth".into(),
                nc: 1,
                userhash: true,
            }
        );
        assert!(answer.to_string().ends_with(", userhash=true"));
    }

    #[test]
    fn test_auth_int() {
        let challenge = Challenge {
            realm: "me@kennethreitz.com".into(),
            nonce: "7a5462bc2121c2e609e6f71c64d341c1".into(),
            opaque: "5498295c3383fbb467b160f1143e51d4".into(),
            algorithm: "MD5".into(),
            qop: vec!["auth-int".into()],
            ..Default::default()
        };
        let mut context = AuthContext::new("foo", "bar", "/digest-auth/auth-int/foo/bar");
        context.set_custom_cnonce("MjhjOWI2ZDRmNmVkNjlmYzRmMTdjZjAxYmU4ZTNkM2U=");

        let answer = digest(&challenge, &context).unwrap();
        assert_eq!(answer.qop, "auth-int");
        assert_eq!(answer.nc, 1);
        assert_eq!(answer.response, "a86955ec413135f7902c0bae37d75469");

        // an explicitly empty body hashes the same as no body
        let empty: &[u8] = b"";
        context.set_body(&empty);
        assert_eq!(
            digest(&challenge, &context).unwrap().response,
            "a86955ec413135f7902c0bae37d75469"
        );

        let body = b"The Body".to_vec();
        context.set_body(&body);
        assert_ne!(
            digest(&challenge, &context).unwrap().response,
            "a86955ec413135f7902c0bae37d75469"
        );
    }

    #[test]
    fn test_auth_int_body_failure() {
        struct Broken;

        impl BodyProvider for Broken {
            fn open(&self) -> io::Result<Box<dyn Read + '_>> {
                Err(io::Error::new(io::ErrorKind::Other, "gone"))
            }
        }

        let challenge = Challenge {
            realm: "test".into(),
            nonce: "abc".into(),
            qop: vec!["auth-int".into()],
            ..Default::default()
        };
        let mut context = AuthContext::new("foo", "bar", "/");
        context.set_body(&Broken);

        assert!(matches!(
            digest(&challenge, &context),
            Err(Error::BodyRead(_))
        ));
    }

    #[test]
    fn test_rfc2069() {
        let challenge: Challenge = r#"Digest realm="testrealm@host.com", nonce="dcd98b7102dd2f0e8b11d0f600bfb0c093", opaque="5ccc069c403ebaf9f0171e9517f40e41""#.parse().unwrap();
        let context = AuthContext::new("Mufasa", "CircleOfLife", "/dir/index.html");

        let answer = digest(&challenge, &context).unwrap();

        // RFC 2069 prints a wrong hash for this example, see errata
        assert_eq!(
            answer.to_string(),
            r#"Digest username="Mufasa", realm="testrealm@host.com", nonce="dcd98b7102dd2f0e8b11d0f600bfb0c093", uri="/dir/index.html", response="1949323746fe6a43ef61f9606e7febea", algorithm=MD5, opaque="5ccc069c403ebaf9f0171e9517f40e41""#
        );
    }

    #[test]
    fn test_rfc2617() {
        let challenge: Challenge = r#"Digest realm="testrealm@host.com", nonce="dcd98b7102dd2f0e8b11d0f600bfb0c093", opaque="5ccc069c403ebaf9f0171e9517f40e41", qop="auth,auth-int""#.parse().unwrap();
        let mut context = AuthContext::new("Mufasa", "Circle Of Life", "/dir/index.html");
        context.set_custom_cnonce("0a4f113b");

        let answer = digest(&challenge, &context).unwrap();
        assert_eq!(answer.qop, "auth");
        assert_eq!(answer.response, "6629fae49393a05397450978507c4ef1");
    }

    #[test]
    fn test_precomputed_ha1() {
        let challenge = rfc7616_challenge("MD5");
        let ha1 = crate::Algorithm::Md5.hash(b"Mufasa:http-auth@example.org:Circle of Life");

        let mut context = AuthContext::new("Mufasa", "", "/dir/index.html");
        context.set_custom_cnonce("f2/wE4q74E6zIJEtWaHKaf5wv/H5QzzpXusqGemxURZJ");
        context.set_ha1(&ha1);

        assert_eq!(
            digest(&challenge, &context).unwrap().response,
            "8ca523f5e9506fed4657c9700eebdbec"
        );
    }

    #[test]
    fn test_unsupported() {
        let context = rfc7616_context();

        let err = digest(&rfc7616_challenge("MD5-sess"), &context).unwrap_err();
        assert!(matches!(err, Error::UnsupportedAlgorithm(a) if a == "MD5-sess"));

        let mut challenge = rfc7616_challenge("MD5");
        challenge.qop = vec!["auth-conf".into(), "token".into()];
        let err = digest(&challenge, &context).unwrap_err();
        assert!(matches!(err, Error::UnsupportedQop(q) if q == "auth-conf,token"));
    }

    #[test]
    fn test_can_digest() {
        assert!(can_digest(&rfc7616_challenge("")));
        assert!(can_digest(&rfc7616_challenge("sha-512")));
        assert!(!can_digest(&rfc7616_challenge("SHA-256-sess")));

        let mut challenge = rfc7616_challenge("MD5");
        challenge.qop.clear();
        assert!(can_digest(&challenge));
        challenge.qop = vec!["auth-int".into()];
        assert!(can_digest(&challenge));
        challenge.qop = vec!["auth-conf".into()];
        assert!(!can_digest(&challenge));
    }

    #[test]
    fn test_generated_cnonce() {
        let answer = digest(&rfc7616_challenge("SHA-512"), &AuthContext::new("a", "b", "/"))
            .unwrap();
        assert_eq!(answer.cnonce.len(), 16);
        assert!(answer.cnonce.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(answer.response.len(), 128);

        assert_ne!(generate_cnonce().unwrap(), generate_cnonce().unwrap());
    }

    #[test]
    fn test_entropy_failure() {
        struct NoEntropy;

        impl rand::RngCore for NoEntropy {
            fn next_u32(&mut self) -> u32 {
                unimplemented!()
            }

            fn next_u64(&mut self) -> u64 {
                unimplemented!()
            }

            fn fill_bytes(&mut self, _: &mut [u8]) {
                unimplemented!()
            }

            fn try_fill_bytes(&mut self, _: &mut [u8]) -> std::result::Result<(), rand::Error> {
                Err(rand::Error::new(io::Error::new(
                    io::ErrorKind::Other,
                    "no entropy",
                )))
            }
        }

        assert!(matches!(
            generate_cnonce_with(&mut NoEntropy),
            Err(Error::Entropy(_))
        ));
    }
}
