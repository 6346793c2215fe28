// Payload carried by the "Join CTF" button: `join_ctf:<event id>:<role id>`.

use std::fmt;
use std::str::FromStr;

pub const JOIN_ACTION_TAG: &str = "join_ctf";

/// A parsed join-button payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinAction {
    /// Discord scheduled event id.
    pub event_id: u64,
    pub role_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JoinActionError {
    #[error("not a join_ctf payload")]
    WrongTag,
    #[error("malformed join_ctf payload: {0}")]
    Malformed(String),
}

impl JoinAction {
    pub fn new(event_id: u64, role_id: u64) -> Self {
        Self { event_id, role_id }
    }

    /// Cheap check the router uses before trying to parse.
    pub fn is_join_payload(custom_id: &str) -> bool {
        custom_id
            .strip_prefix(JOIN_ACTION_TAG)
            .is_some_and(|rest| rest.starts_with(':'))
    }
}

impl fmt::Display for JoinAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", JOIN_ACTION_TAG, self.event_id, self.role_id)
    }
}

impl FromStr for JoinAction {
    type Err = JoinActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = s.split(':');
        if fields.next() != Some(JOIN_ACTION_TAG) {
            return Err(JoinActionError::WrongTag);
        }

        let malformed = || JoinActionError::Malformed(s.to_string());
        let event_id = fields
            .next()
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(malformed)?;
        let role_id = fields
            .next()
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(malformed)?;

        if fields.next().is_some() {
            return Err(malformed());
        }

        Ok(Self { event_id, role_id })
    }
}
