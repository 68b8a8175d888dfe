/*!
 * Copyright 2025 Release Workshop Ltd
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 */
//! Versions, module references and the compatibility rules between them.

mod compatibility;
mod module_info;
mod version_info;

pub use compatibility::{
    is_module_core_version_compatible_with_tier_version,
    is_module_core_version_compatible_with_tool_version,
    is_tier_version_compatible_with_tool_version, select_best_version,
};
pub use module_info::ModuleInfo;
pub use version_info::VersionInfo;
