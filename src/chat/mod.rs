// Chat platform: where feed notifications are delivered.
//
// The ChatPlatform trait is the capability the orchestrator needs (resolve a
// channel, send a message). StoatClient implements it over the platform's
// REST API with a bot token.

pub mod models;
pub mod stoat;
pub mod traits;
