//! Batch CLI commands that invoke the core directly: export, import, and
//! re-embed. Each command bootstraps the same stack as the server and exits
//! non-zero on the first fatal error.

pub mod export;
pub mod import;
pub mod re_embed;
