// NimbusFeed: Nexus Mods update feeds for chat channels
//
// This is the library root. Each module corresponds to a stage or a seam
// of the sync pipeline.

pub mod chat;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod nexus;
pub mod output;
pub mod pipeline;
pub mod status;

#[cfg(test)]
mod test_http;
