// Download/unpack service — fetches device-advertised artifacts into the
// artifact store.

pub mod fetch;
pub mod unpack;

pub use fetch::Downloader;
