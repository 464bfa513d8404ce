//! ICE username fragment and password.

use crate::errors::IceError;
use rand::Rng;
use rand::distributions::Alphanumeric;

/// The `ice-ufrag` / `ice-pwd` pair one side advertises in its description.
///
/// A connectivity check is accepted only when it presents the username
/// `"<local ufrag>:<remote ufrag>"` and the local password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IceCredentials {
    pub ufrag: String,
    pub pwd: String,
}

impl IceCredentials {
    const UFRAG_LEN: usize = 8;
    const PWD_LEN: usize = 24;

    /// Generates random credentials.
    pub fn generate() -> Self {
        Self {
            ufrag: random_token(Self::UFRAG_LEN),
            pwd: random_token(Self::PWD_LEN),
        }
    }

    /// Validates credentials received from a peer (RFC 5245 15.4 lengths).
    pub fn new(ufrag: impl Into<String>, pwd: impl Into<String>) -> Result<Self, IceError> {
        let ufrag = ufrag.into();
        let pwd = pwd.into();
        if !(4..=256).contains(&ufrag.len()) {
            return Err(IceError::InvalidCredentials(format!(
                "ufrag length {}",
                ufrag.len()
            )));
        }
        if !(22..=256).contains(&pwd.len()) {
            return Err(IceError::InvalidCredentials(format!(
                "pwd length {}",
                pwd.len()
            )));
        }
        Ok(Self { ufrag, pwd })
    }

    /// Username a check sent *to* the owner of `remote` carries.
    pub fn check_username(&self, remote: &IceCredentials) -> String {
        format!("{}:{}", remote.ufrag, self.ufrag)
    }
}

fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_lengths() {
        let creds = IceCredentials::generate();
        assert_eq!(creds.ufrag.len(), 8);
        assert_eq!(creds.pwd.len(), 24);
        assert!(creds.ufrag.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generate_is_random() {
        assert_ne!(IceCredentials::generate(), IceCredentials::generate());
    }

    #[test]
    fn test_new_validates_lengths() {
        assert!(IceCredentials::new("abcd", "a".repeat(22)).is_ok());
        assert!(IceCredentials::new("abc", "a".repeat(22)).is_err());
        assert!(IceCredentials::new("abcd", "short").is_err());
    }

    #[test]
    fn test_check_username() {
        let local = IceCredentials::new("local1", "p".repeat(22)).unwrap();
        let remote = IceCredentials::new("remote1", "q".repeat(22)).unwrap();
        assert_eq!(local.check_username(&remote), "remote1:local1");
    }
}
