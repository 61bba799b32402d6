// Nexus Mods: the mod source polled by the sync pipeline.
//
// The ModSource trait is what the pipeline depends on; NexusClient is the
// live reqwest implementation against the public v1 REST API.

pub mod client;
pub mod models;
pub mod traits;
