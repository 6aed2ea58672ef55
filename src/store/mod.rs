// Artifact store and readiness detection — shared filesystem namespace keyed
// by session id.

pub mod artifacts;
pub mod readiness;
