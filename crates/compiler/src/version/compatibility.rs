/*!
 * Copyright 2025 Release Workshop Ltd
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 */
//! Compatibility rules between tool, deployment tier and module core versions.

use std::cmp::Ordering;

use crate::version::VersionInfo;

/// Whether a deployment tier bootstrapped at `tier` can be used by `tool`.
pub fn is_tier_version_compatible_with_tool_version(tier: &VersionInfo, tool: &VersionInfo) -> bool {
    is_compatible_with_reference(tier, tool)
}

/// Whether a module built against `core` can be compiled by `tool`.
pub fn is_module_core_version_compatible_with_tool_version(
    core: &VersionInfo,
    tool: &VersionInfo,
) -> bool {
    is_compatible_with_reference(core, tool)
}

/// Whether a module built against `core` can be deployed to `tier`.
pub fn is_module_core_version_compatible_with_tier_version(
    core: &VersionInfo,
    tier: &VersionInfo,
) -> bool {
    is_compatible_with_reference(core, tier)
}

// A pre-release reference accepts versions of its major line that are not
// newer than itself; a stable reference accepts its whole major line.
fn is_compatible_with_reference(version: &VersionInfo, reference: &VersionInfo) -> bool {
    if !version.is_compatible_with(reference) {
        return false;
    }
    if reference.is_pre_release() {
        matches!(
            version
                .without_suffix()
                .compare_to_version(&reference.without_suffix(), false),
            Some(Ordering::Less | Ordering::Equal)
        )
    } else {
        true
    }
}

/// Picks the newest candidate that satisfies `required`.
///
/// A candidate qualifies when it shares the required major line and is not
/// older than the requirement. Pre-releases qualify only when
/// `allow_pre_release` is set or the requirement is itself a pre-release.
pub fn select_best_version<'a>(
    required: Option<&VersionInfo>,
    candidates: &'a [VersionInfo],
    allow_pre_release: bool,
) -> Option<&'a VersionInfo> {
    let allow_pre_release = allow_pre_release || required.is_some_and(VersionInfo::is_pre_release);
    candidates
        .iter()
        .filter(|candidate| allow_pre_release || !candidate.is_pre_release())
        .filter(|candidate| match required {
            None => true,
            Some(required) => {
                candidate.is_compatible_with(required) && candidate.is_greater_or_equal_than(required)
            }
        })
        .fold(None::<&VersionInfo>, |best, candidate| match best {
            Some(best) if !candidate.is_greater_than(best) => Some(best),
            _ => Some(candidate),
        })
}
