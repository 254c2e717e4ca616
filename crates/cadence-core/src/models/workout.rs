// ABOUTME: Workout identifier newtype shared by the backend and analysis engine
// ABOUTME: Validates identifiers before they are interpolated into REST filters
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a workout row
///
/// Supabase assigns UUIDs, but integer keys from older imports also exist,
/// so any non-empty token of ASCII alphanumerics, `-` and `_` is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkoutId(String);

impl WorkoutId {
    /// Create a workout id, rejecting values that would break a REST filter
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the id is empty or contains other characters
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(AppError::invalid_input("workout id must not be empty"));
        }
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(AppError::invalid_input(format!(
                "workout id '{trimmed}' contains unsupported characters"
            )));
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the raw id
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for WorkoutId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for WorkoutId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
