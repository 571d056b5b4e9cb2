//! Constants used throughout the formsync library.
//!
//! This module provides central definitions for reserved type names,
//! expression targets and timing defaults.

/// Render type used for a field that has a `fieldGroup` but no `type`.
pub const GROUP_TYPE: &str = "formly-group";

/// Render type used for a field that has a `fieldArray` template but no `type`.
pub const ARRAY_TYPE: &str = "array";

/// Expression target that controls field visibility.
pub const HIDE: &str = "hide";

/// Expression target for the field's CSS class.
pub const CLASS_NAME: &str = "className";

/// Prefix of expression targets written into `templateOptions`.
pub const TEMPLATE_OPTIONS_PREFIX: &str = "templateOptions.";

/// `templateOptions` entry that mirrors the control's disabled state.
pub const DISABLED: &str = "disabled";

/// Window in which model-change samples requested while an emission is
/// running are coalesced.
pub const MODEL_CHANGE_DEBOUNCE_MS: u64 = 100;

/// Largest array index a key may name. Writing through a key pads the array
/// up to its index.
pub const MAX_KEY_INDEX: usize = 100_000;
