//! Batch re-encoding of the videos in a folder, skipping files that were
//! already handled under the same encoding profile.

pub mod batch;
pub mod config;
pub mod error;
pub mod fmt;
pub mod ledger;
pub mod probe;
pub mod scan;
pub mod transcode;
pub mod types;
