//! awscmd
//!
//! Maps one command invocation onto one AWS JSON API operation, paging
//! through list operations transparently.
//!
//! - [`operation`] - registry, request building, pagination, projection
//! - [`remote`] - client seam, HTTP implementation, errors
//! - [`config`] - persisted defaults
//! - [`output`] - rendering of emitted values

pub mod config;
pub mod operation;
pub mod output;
pub mod remote;

/// Version injected at compile time via AWSCMD_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("AWSCMD_VERSION") {
    Some(v) => v,
    None => "dev",
};
