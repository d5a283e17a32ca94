// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline-run ticket identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Opaque identifier naming a pipeline run for its entire lifetime.
///
/// Tickets are 128-bit UUIDs stored in lowercase hex without hyphens.
/// They are generated once at record creation and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ticket(String);

/// Error for strings that do not name a ticket.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("not a valid ticket id: {0}")]
pub struct TicketParseError(pub String);

impl Ticket {
    /// Generate a fresh random ticket.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Parse a ticket from client input. Accepts hyphenated and plain hex
    /// UUID spellings; the stored form is always plain lowercase hex.
    pub fn parse(s: &str) -> Result<Self, TicketParseError> {
        let uuid = Uuid::try_parse(s).map_err(|_| TicketParseError(s.to_string()))?;
        Ok(Self(uuid.simple().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a string slice truncated to at most `n` characters.
    pub fn short(&self, n: usize) -> &str {
        if self.0.len() <= n {
            &self.0
        } else {
            &self.0[..n]
        }
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq<str> for Ticket {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Ticket {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl std::borrow::Borrow<str> for Ticket {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[path = "ticket_tests.rs"]
mod tests;
