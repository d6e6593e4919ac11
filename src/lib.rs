//! reqtrace: requirements traceability graph builder
//!
//! Scans markdown specifications, issue exports and source comments for
//! artifact identifiers (`StR-001`, `REQ-F-AUTH-002`, `TEST-LOGIN-001`, ...),
//! recovers the typed links between them and reports coverage, orphans,
//! duplicate definitions and numbering gaps.

pub mod cli;
pub mod core;
pub mod yaml;
