//! Session handle and public key extraction

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::common::{Error, Result};
use crate::transport::SessionId;

/// `/pk` output line carrying the hex key
static PUBLIC_KEY_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Hex: ([a-f0-9]{64})").expect("public key pattern is valid")
});

static PUBLIC_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-f0-9]{64}$").expect("public key pattern is valid"));

/// A public key as 64 lowercase hex characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct PublicKey(String);

impl PublicKey {
    /// Validate a hex public key
    pub fn parse(s: &str) -> Result<Self> {
        if PUBLIC_KEY.is_match(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(Error::InvalidPublicKey(s.to_string()))
        }
    }

    /// Find the first `Hex: <64 lowercase hex>` occurrence in a snapshot
    pub fn extract(snapshot: &str) -> Option<Self> {
        let captures = PUBLIC_KEY_LINE.captures(snapshot)?;
        captures.get(1).map(|key| Self(key.as_str().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PublicKey {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<PublicKey> for String {
    fn from(key: PublicKey) -> Self {
        key.0
    }
}

impl std::str::FromStr for PublicKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// One remote-controlled terminal session
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    public_key: Option<PublicKey>,
}

impl Session {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            public_key: None,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Public key discovered through `/pk`, if any
    pub fn public_key(&self) -> Option<&PublicKey> {
        self.public_key.as_ref()
    }

    pub(crate) fn set_public_key(&mut self, key: PublicKey) {
        self.public_key = Some(key);
    }
}
