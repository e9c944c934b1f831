use crate::{Error, Result};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use digest::DynDigest;
use md5::Md5;
use sha2::{Sha256, Sha512, Sha512_256};

/// Hash function named by the challenge's `algorithm` parameter.
///
/// The `-sess` variants are not computed and fail to parse.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub enum Algorithm {
    #[default]
    Md5,
    Sha256,
    Sha512,
    Sha512_256,
}

impl Algorithm {
    fn hasher(self) -> Box<dyn DynDigest> {
        match self {
            Algorithm::Md5 => Box::new(Md5::default()),
            Algorithm::Sha256 => Box::new(Sha256::default()),
            Algorithm::Sha512 => Box::new(Sha512::default()),
            Algorithm::Sha512_256 => Box::new(Sha512_256::default()),
        }
    }

    /// Digest size in bytes; the hex form is twice as long
    pub fn output_len(self) -> usize {
        match self {
            Algorithm::Md5 => 16,
            Algorithm::Sha256 | Algorithm::Sha512_256 => 32,
            Algorithm::Sha512 => 64,
        }
    }

    /// Calculate a hash of bytes using the selected algorithm
    pub fn hash(self, bytes: &[u8]) -> String {
        let mut hash = self.hasher();
        hash.update(bytes);
        hex::encode(hash.finalize())
    }

    /// Hash the parts joined by `:`
    pub fn hash_join(self, parts: &[&str]) -> String {
        let mut hash = self.hasher();
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                hash.update(b":");
            }
            hash.update(part.as_bytes());
        }
        hex::encode(hash.finalize())
    }

    /// Hash everything `reader` yields
    pub fn hash_reader(self, reader: &mut dyn std::io::Read) -> std::io::Result<String> {
        let mut hash = self.hasher();
        let mut buf = [0u8; 8192];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => hash.update(&buf[..n]),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(hex::encode(hash.finalize()))
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    /// Parse from the format used in WWW-Authenticate. An empty value means MD5.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "" | "MD5" => Ok(Algorithm::Md5),
            "SHA-256" => Ok(Algorithm::Sha256),
            "SHA-512" => Ok(Algorithm::Sha512),
            "SHA-512-256" => Ok(Algorithm::Sha512_256),
            _ => Err(Error::UnsupportedAlgorithm(s.into())),
        }
    }
}

impl Display for Algorithm {
    /// Format to the form used in HTTP headers
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Algorithm::Md5 => "MD5",
            Algorithm::Sha256 => "SHA-256",
            Algorithm::Sha512 => "SHA-512",
            Algorithm::Sha512_256 => "SHA-512-256",
        })
    }
}

/// QOP field values
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Qop {
    Auth,
    AuthInt,
}

impl Qop {
    pub fn as_str(self) -> &'static str {
        match self {
            Qop::Auth => "auth",
            Qop::AuthInt => "auth-int",
        }
    }
}

impl FromStr for Qop {
    type Err = Error;

    /// Parse from "auth" or "auth-int" as used in HTTP headers
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auth" => Ok(Qop::Auth),
            "auth-int" => Ok(Qop::AuthInt),
            _ => Err(Error::UnsupportedQop(s.into())),
        }
    }
}

impl Display for Qop {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
