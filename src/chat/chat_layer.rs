// Chat layer - the Twitch IRC adapter that feeds events into the core.

#[path = "irc_transport.rs"]
pub mod irc_transport;
