use serde::{Deserialize, Serialize};
use std::fmt;

/// Login credentials. The password never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    uid: String,
    passwd: String,
}

impl Credentials {
    pub fn new(uid: impl Into<String>, passwd: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            passwd: passwd.into(),
        }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub(crate) fn passwd(&self) -> &str {
        &self.passwd
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("uid", &self.uid)
            .field("passwd", &"<redacted>")
            .finish()
    }
}

/// Login lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AuthState {
    #[default]
    Unauthenticated,
    Authenticating,
    Authenticated,
    Failed,
}

impl AuthState {
    /// Whether a login attempt may start from this state
    pub fn can_authenticate(&self) -> bool {
        matches!(self, Self::Unauthenticated | Self::Failed)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated)
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Authenticating => "authenticating",
            Self::Authenticated => "authenticated",
            Self::Failed => "failed",
        };
        write!(f, "{name}")
    }
}
