//! Recoverable action source and content fingerprints.

use serde::{Deserialize, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

/// What an author wrote for one rule: argument names and body text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSource {
    pub args: Vec<String>,
    pub body: String,
}

impl ActionSource {
    pub fn new(args: Vec<String>, body: impl Into<String>) -> Self {
        Self {
            args,
            body: body.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty() && self.body.trim().is_empty()
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.args, &self.body)
    }
}

/// SHA-256 over an argument list and body text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn of(args: &[String], body: &str) -> Self {
        let mut hasher = Sha256::new();
        for arg in args {
            hasher.update(arg.as_bytes());
            hasher.update([0u8]);
        }
        hasher.update([1u8]);
        hasher.update(body.as_bytes());
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hasher.finalize());
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_hex_and_stability() {
        let a = Fingerprint::of(&["num".into()], "num * 2");
        let b = Fingerprint::of(&["num".into()], "num * 2");
        assert_eq!(a, b);
        assert_eq!(a.to_string().len(), 64);
        assert!(a.to_string().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_fingerprint_separates_args_from_body() {
        let joined = Fingerprint::of(&["ab".into()], "c");
        let split = Fingerprint::of(&["a".into()], "bc");
        assert_ne!(joined, split);
        let renamed = Fingerprint::of(&["x".into()], "c");
        assert_ne!(joined, renamed);
    }

    #[test]
    fn test_empty_source() {
        assert!(ActionSource::new(vec![], "  \n").is_empty());
        assert!(!ActionSource::new(vec!["$1".into()], "").is_empty());
    }
}
