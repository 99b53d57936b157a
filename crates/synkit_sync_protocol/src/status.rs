//! Server-declared sync outcomes.

use crate::error::ProtocolError;
use std::fmt;

/// Outcome of one `syncEntity` or `syncDeletedEntity` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SyncStatus {
    /// Server content matches the client digest.
    NotChanged = 1,
    /// Server holds a newer entity; the reply carries it.
    Updated = 2,
    /// Server accepted the client's content.
    Stored = 3,
    /// The deleted key was unknown to the server.
    NotFound = 4,
    /// The server removed the key.
    Deleted = 5,
}

impl SyncStatus {
    /// Returns the wire code.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Returns true for outcomes of `syncEntity`.
    #[must_use]
    pub const fn is_entity_outcome(self) -> bool {
        matches!(self, Self::NotChanged | Self::Updated | Self::Stored)
    }

    /// Returns true for outcomes of `syncDeletedEntity`.
    #[must_use]
    pub const fn is_delete_outcome(self) -> bool {
        matches!(self, Self::NotFound | Self::Deleted)
    }
}

impl TryFrom<u8> for SyncStatus {
    type Error = ProtocolError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::NotChanged),
            2 => Ok(Self::Updated),
            3 => Ok(Self::Stored),
            4 => Ok(Self::NotFound),
            5 => Ok(Self::Deleted),
            other => Err(ProtocolError::UnknownStatus(other)),
        }
    }
}

impl From<SyncStatus> for u8 {
    fn from(status: SyncStatus) -> Self {
        status.code()
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotChanged => "not changed",
            Self::Updated => "updated",
            Self::Stored => "stored",
            Self::NotFound => "not found",
            Self::Deleted => "deleted",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes() {
        for code in 1..=5u8 {
            let status = SyncStatus::try_from(code).unwrap();
            assert_eq!(status.code(), code);
        }
        assert!(matches!(
            SyncStatus::try_from(0),
            Err(ProtocolError::UnknownStatus(0))
        ));
        assert!(matches!(
            SyncStatus::try_from(6),
            Err(ProtocolError::UnknownStatus(6))
        ));
    }

    #[test]
    fn outcome_families() {
        assert!(SyncStatus::Stored.is_entity_outcome());
        assert!(!SyncStatus::Stored.is_delete_outcome());
        assert!(SyncStatus::NotFound.is_delete_outcome());
        assert!(!SyncStatus::Deleted.is_entity_outcome());
    }
}
