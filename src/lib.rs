// PhotoBox connector — ingests capture artifacts pushed by the rig and drives
// a photogrammetric reconstruction backend.

pub mod backend;
pub mod config;
pub mod connector;
pub mod device;
pub mod download;
pub mod error;
pub mod log;
pub mod model;
pub mod store;
