//! Bundled insurance-campaign tools
//!
//! Static rule and template lookups registered behind the `ToolRegistry` boundary.

pub mod analysis;
pub mod audience;
pub mod content;
pub mod inspector;
pub mod tools;
pub mod utils;
