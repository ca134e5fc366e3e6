// The infra module contains implementations of core traits.
// Each external service gets its own submodule.

#[path = "twitch/mod.rs"]
pub mod twitch;

#[path = "sheets/mod.rs"]
pub mod sheets;
