// Twitch infra layer.
// - `helix_client.rs` talks to the Helix API with a cached app access token.

#[path = "helix_client.rs"]
pub mod helix_client;
