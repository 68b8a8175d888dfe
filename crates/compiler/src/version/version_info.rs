/*!
 * Copyright 2025 Release Workshop Ltd
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 */
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::VersionError;

/// A module, tool or tier version such as `1.2`, `0.7.1-rc2` or `2.0-DEV`.
///
/// `0.x` lines are stored with an encoded major of `i32::MIN + x - 1`, so
/// `0.7.1` has the same shape (`major`, `minor`, `patch`) as `1.2.3` and
/// sorts below every `1.x`. Versions intentionally do not implement
/// `PartialOrd`; use [`VersionInfo::compare_to_version`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionInfo {
    major: i32,
    minor: Option<i32>,
    patch: Option<i32>,
    suffix: String,
}

impl VersionInfo {
    pub fn parse(text: &str) -> Result<Self, VersionError> {
        Self::try_parse(text).ok_or_else(|| VersionError::InvalidVersion(text.to_string()))
    }

    pub fn try_parse(text: &str) -> Option<Self> {
        let (numeric, suffix) = match text.find('-') {
            Some(index) => (&text[..index], text[index..].trim_end_matches('*')),
            None => (text, ""),
        };

        let parts = numeric
            .split('.')
            .map(|part| {
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    None
                } else {
                    part.parse::<i32>().ok()
                }
            })
            .collect::<Option<Vec<i32>>>()?;

        let (major, minor, patch) = match parts.as_slice() {
            [major] => (*major, None, None),
            [0, minor, rest @ ..] if *minor != 0 && rest.len() <= 2 => {
                (encode_zero_major(*minor), rest.first().copied(), rest.get(1).copied())
            }
            [major, minor] => (*major, Some(*minor), None),
            [major, minor, build] => (*major, Some(*minor), Some(*build)),
            _ => return None,
        };

        Some(Self {
            major,
            minor,
            patch,
            suffix: suffix.to_string(),
        })
    }

    /// Encoded major; negative for `0.x` lines.
    pub fn major(&self) -> i32 {
        self.major
    }

    pub fn minor(&self) -> Option<i32> {
        self.minor
    }

    pub fn patch(&self) -> Option<i32> {
        self.patch
    }

    /// Pre-release suffix including the leading `-`, or empty.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn is_pre_release(&self) -> bool {
        !self.suffix.is_empty()
    }

    pub fn without_suffix(&self) -> Self {
        Self {
            suffix: String::new(),
            ..self.clone()
        }
    }

    /// Only the (encoded) major, e.g. `1` for `1.4.2` or `0.7` for `0.7.1`.
    pub fn major_version(&self) -> Self {
        Self {
            major: self.major,
            minor: None,
            patch: None,
            suffix: String::new(),
        }
    }

    /// Compares numerically, then by suffix.
    ///
    /// A release sorts after any pre-release of the same numbers. Two
    /// pre-release suffixes compare by their numeric tails when their
    /// alphabetic prefixes match; otherwise the versions are incomparable
    /// and `None` is returned. In strict mode differing suffixes are always
    /// incomparable.
    pub fn compare_to_version(&self, other: &VersionInfo, strict: bool) -> Option<Ordering> {
        if strict && self.suffix != other.suffix {
            return None;
        }
        let numeric = self
            .major
            .cmp(&other.major)
            .then(self.minor.unwrap_or(0).cmp(&other.minor.unwrap_or(0)))
            .then(self.patch.unwrap_or(0).cmp(&other.patch.unwrap_or(0)));
        if numeric != Ordering::Equal {
            return Some(numeric);
        }
        compare_suffixes(&self.suffix, &other.suffix)
    }

    pub fn is_greater_than(&self, other: &VersionInfo) -> bool {
        self.compare_to_version(other, false) == Some(Ordering::Greater)
    }

    pub fn is_greater_or_equal_than(&self, other: &VersionInfo) -> bool {
        matches!(
            self.compare_to_version(other, false),
            Some(Ordering::Greater | Ordering::Equal)
        )
    }

    pub fn is_less_than(&self, other: &VersionInfo) -> bool {
        self.compare_to_version(other, false) == Some(Ordering::Less)
    }

    /// Same encoded major.
    pub fn is_compatible_with(&self, other: &VersionInfo) -> bool {
        self.major == other.major
    }
}

fn encode_zero_major(minor: i32) -> i32 {
    i32::MIN + (minor - 1)
}

fn compare_suffixes(left: &str, right: &str) -> Option<Ordering> {
    if left == right {
        return Some(Ordering::Equal);
    }
    if left.is_empty() {
        return Some(Ordering::Greater);
    }
    if right.is_empty() {
        return Some(Ordering::Less);
    }
    let (left_prefix, left_number) = split_numeric_tail(left);
    let (right_prefix, right_number) = split_numeric_tail(right);
    if left_prefix != right_prefix {
        return None;
    }
    let left_number = parse_tail(left_number)?;
    let right_number = parse_tail(right_number)?;
    Some(left_number.cmp(&right_number))
}

fn split_numeric_tail(suffix: &str) -> (&str, &str) {
    let index = suffix
        .rfind(|c: char| !c.is_ascii_digit())
        .map_or(0, |i| i + 1);
    suffix.split_at(index)
}

fn parse_tail(digits: &str) -> Option<u64> {
    if digits.is_empty() {
        Some(0)
    } else {
        digits.parse().ok()
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.major < 0 {
            let minor = i64::from(self.major) - i64::from(i32::MIN) + 1;
            write!(f, "0.{minor}")?;
        } else {
            write!(f, "{}", self.major)?;
        }
        if let Some(minor) = self.minor {
            write!(f, ".{minor}")?;
            if let Some(patch) = self.patch {
                write!(f, ".{patch}")?;
            }
        }
        f.write_str(&self.suffix)
    }
}

impl FromStr for VersionInfo {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
