// Device session protocol — socket client and line-protocol parsing.

pub mod client;
pub mod protocol;
