//! HTTP Digest authentication (RFC 2617 / RFC 7616).
//!
//! Every request authenticates from scratch: the first attempt is sent
//! without credentials, the device answers 401 with one or more challenges,
//! and the request is repeated once with the computed `Authorization`
//! header for the first challenge the client supports.

use reqwest::header::{HeaderMap, WWW_AUTHENTICATE};
use reqwest::Method;
use sha2::{Digest, Sha256, Sha512, Sha512_256};

use crate::{IsapiError, IsapiResult};

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Hash function named by the challenge's `algorithm` parameter. The
/// `-sess` suffix is kept separately on [`DigestChallenge::session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Algorithm {
    Md5,
    Sha256,
    Sha512,
    Sha512Trunc256,
}

impl Algorithm {
    fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Md5 => "MD5",
            Algorithm::Sha256 => "SHA-256",
            Algorithm::Sha512 => "SHA-512",
            Algorithm::Sha512Trunc256 => "SHA-512-256",
        }
    }

    /// Parses an `algorithm` value into the hash and the session flag.
    fn from_name(name: &str) -> Option<(Self, bool)> {
        let upper = name.to_ascii_uppercase();
        let (base, session) = match upper.strip_suffix("-SESS") {
            Some(base) => (base, true),
            None => (upper.as_str(), false),
        };
        let algorithm = match base {
            "MD5" => Algorithm::Md5,
            "SHA-256" => Algorithm::Sha256,
            "SHA-512" => Algorithm::Sha512,
            "SHA-512-256" => Algorithm::Sha512Trunc256,
            _ => return None,
        };
        Some((algorithm, session))
    }

    fn hex_digest(&self, data: impl AsRef<[u8]>) -> String {
        match self {
            Algorithm::Md5 => hex(&md5::compute(data).0),
            Algorithm::Sha256 => hex(&Sha256::digest(data)),
            Algorithm::Sha512 => hex(&Sha512::digest(data)),
            Algorithm::Sha512Trunc256 => hex(&Sha512_256::digest(data)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Qop {
    Auth,
    AuthInt,
}

impl Qop {
    fn as_str(&self) -> &'static str {
        match self {
            Qop::Auth => "auth",
            Qop::AuthInt => "auth-int",
        }
    }
}

/// A parsed `WWW-Authenticate: Digest ...` challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    pub opaque: Option<String>,
    pub algorithm: Algorithm,
    /// True for the `-sess` variants.
    pub session: bool,
    /// `None` for legacy RFC 2069 servers that send no `qop`.
    pub qop: Option<Qop>,
}

impl DigestChallenge {
    /// Picks the first supported Digest challenge among the response
    /// headers.
    ///
    /// Challenges are tried in the order the device sent them, across
    /// header lines and within a comma separated line. Returns `Ok(None)` if
    /// the response carries no Digest challenge at all, and the first parse
    /// error if none of them is usable.
    pub fn from_headers(headers: &HeaderMap) -> IsapiResult<Option<Self>> {
        let mut first_error = None;
        for value in headers.get_all(WWW_AUTHENTICATE) {
            let Ok(value) = value.to_str() else {
                log::debug!("skipping non-ASCII WWW-Authenticate header");
                continue;
            };
            for challenge in split_challenges(value) {
                let Some(params) = strip_scheme(challenge) else {
                    continue;
                };
                match Self::parse_params(params) {
                    Ok(parsed) => return Ok(Some(parsed)),
                    Err(e) => {
                        log::debug!("skipping digest challenge: {e}");
                        first_error.get_or_insert(e);
                    }
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }

    /// Parses a single challenge, including the `Digest` scheme.
    pub fn parse(header: &str) -> IsapiResult<Self> {
        let params = strip_scheme(header)
            .ok_or_else(|| IsapiError::InvalidChallenge(format!("not a Digest challenge: {header}")))?;
        Self::parse_params(params)
    }

    fn parse_params(params: &str) -> IsapiResult<Self> {
        let mut realm = None;
        let mut nonce = None;
        let mut opaque = None;
        let mut algorithm = (Algorithm::Md5, false);
        let mut qop_options: Option<String> = None;

        for (key, value) in split_params(params) {
            match key.to_ascii_lowercase().as_str() {
                "realm" => realm = Some(value),
                "nonce" => nonce = Some(value),
                "opaque" => opaque = Some(value),
                "qop" => qop_options = Some(value),
                "algorithm" => {
                    algorithm = Algorithm::from_name(&value).ok_or_else(|| {
                        IsapiError::InvalidChallenge(format!("unsupported algorithm {value}"))
                    })?;
                }
                _ => {}
            }
        }

        let qop = match qop_options {
            None => None,
            Some(options) => {
                let offered: Vec<&str> = options.split(',').map(str::trim).collect();
                if offered.contains(&"auth") {
                    Some(Qop::Auth)
                } else if offered.contains(&"auth-int") {
                    Some(Qop::AuthInt)
                } else {
                    return Err(IsapiError::InvalidChallenge(format!(
                        "unsupported qop {options}"
                    )));
                }
            }
        };

        let (algorithm, session) = algorithm;
        Ok(Self {
            realm: realm.ok_or_else(|| IsapiError::InvalidChallenge("missing realm".into()))?,
            nonce: nonce.ok_or_else(|| IsapiError::InvalidChallenge("missing nonce".into()))?,
            opaque,
            algorithm,
            session,
            qop,
        })
    }

    /// Builds the `Authorization` header value for one request.
    ///
    /// `uri` is the request target exactly as sent (path plus query).
    #[allow(clippy::too_many_arguments)]
    pub fn authorization(
        &self,
        username: &str,
        password: &str,
        method: &Method,
        uri: &str,
        body: &[u8],
        cnonce: &str,
        nc: u32,
    ) -> String {
        let h = |data: String| self.algorithm.hex_digest(data);
        let nc = format!("{nc:08x}");

        let mut ha1 = h(format!("{username}:{}:{password}", self.realm));
        if self.session {
            ha1 = h(format!("{ha1}:{}:{cnonce}", self.nonce));
        }

        let ha2 = match self.qop {
            Some(Qop::AuthInt) => h(format!(
                "{}:{uri}:{}",
                method.as_str(),
                self.algorithm.hex_digest(body)
            )),
            _ => h(format!("{}:{uri}", method.as_str())),
        };

        let response = match self.qop {
            Some(qop) => h(format!("{ha1}:{}:{nc}:{cnonce}:{}:{ha2}", self.nonce, qop.as_str())),
            None => h(format!("{ha1}:{}:{ha2}", self.nonce)),
        };

        let mut header = format!(
            r#"Digest username="{}", realm="{}", nonce="{}", uri="{}", algorithm={}{}, response="{}""#,
            quote(username),
            quote(&self.realm),
            quote(&self.nonce),
            quote(uri),
            self.algorithm.as_str(),
            if self.session { "-sess" } else { "" },
            response
        );
        if let Some(opaque) = &self.opaque {
            header.push_str(&format!(r#", opaque="{}""#, quote(opaque)));
        }
        if let Some(qop) = self.qop {
            header.push_str(&format!(r#", qop={}, nc={nc}, cnonce="{cnonce}""#, qop.as_str()));
        }
        header
    }
}

/// A fresh client nonce.
pub(crate) fn new_cnonce() -> String {
    let bytes: [u8; 8] = rand::random();
    hex(&bytes)
}

fn strip_scheme(header: &str) -> Option<&str> {
    let header = header.trim_start();
    let (scheme, rest) = header.split_once(char::is_whitespace)?;
    scheme.eq_ignore_ascii_case("digest").then_some(rest)
}

/// Splits a header value that lists several challenges, e.g.
/// `Digest realm="a", algorithm=SHA-256, Digest realm="a"`, at the commas
/// that start a new auth scheme.
fn split_challenges(value: &str) -> Vec<&str> {
    let mut challenges = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, c) in value.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes && starts_new_challenge(&value[i + 1..]) => {
                challenges.push(value[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    challenges.push(value[start..].trim());
    challenges.retain(|c| !c.is_empty());
    challenges
}

/// True if `rest` begins with a scheme token rather than `key=value`.
fn starts_new_challenge(rest: &str) -> bool {
    let rest = rest.trim_start();
    let token_end = rest
        .find(|c: char| c.is_whitespace() || c == '=' || c == ',')
        .unwrap_or(rest.len());
    token_end > 0 && !rest[token_end..].trim_start().starts_with('=')
}

fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Splits `k1=v1, k2="v,2"` into pairs, unquoting quoted values.
fn split_params(params: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut chars = params.chars().peekable();

    loop {
        while matches!(chars.peek(), Some(c) if c.is_whitespace() || *c == ',') {
            chars.next();
        }
        let mut key = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' || c == ',' {
                break;
            }
            key.push(c);
            chars.next();
        }
        if key.trim().is_empty() {
            break;
        }
        if chars.peek() != Some(&'=') {
            continue;
        }
        chars.next();
        while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
            chars.next();
        }

        let mut value = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    '"' => break,
                    c => value.push(c),
                }
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c == ',' {
                    break;
                }
                value.push(c);
                chars.next();
            }
        }
        pairs.push((key.trim().to_string(), value.trim().to_string()));
    }
    pairs
}
