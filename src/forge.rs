//! Hosting platform interface used to open and deduplicate update pull
//! requests and to read upstream release notes and commit comparisons.

/// Configuration and authentication for the hosting platform.
pub mod config;

/// GitHub API client implementation.
pub mod github;

/// Request and response types shared by forge implementations.
pub mod request;

/// Common traits for forge platform abstraction.
pub mod traits;
