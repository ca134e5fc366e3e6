// =============================================================================
// TWITCH IRC TRANSPORT
// =============================================================================
//
// Twitch chat is plain IRC carried over a WebSocket. We join one channel with
// an anonymous justinfanN login (read-only, no OAuth needed), request the
// IRCv3 tags capability so PRIVMSG lines carry user-type, display-name and
// tmi-sent-ts, and hand each parsed message to the link service.
//
// Events are handled strictly one at a time: the next frame is not read
// until `process()` for the previous message has finished, including its
// network calls.

use std::collections::HashMap;

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message;

use crate::core::links::{ChatEvent, LinkService, LinkSink, StreamInfoSource, UserRole};

const TWITCH_WS_URL: &str = "wss://irc-ws.chat.twitch.tv:443";

/// The WebSocket connection failed or was torn down. Fatal: the caller logs
/// it and exits non-zero.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("chat connection error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

fn anonymous_nick() -> String {
    format!("justinfan{}", rand::random::<u32>() % 100_000)
}

/// Connects to Twitch chat and processes messages until the connection ends.
pub async fn listen<S, W>(channel: &str, service: &LinkService<S, W>) -> Result<(), TransportError>
where
    S: StreamInfoSource,
    W: LinkSink,
{
    let (ws, _) = connect_async(TWITCH_WS_URL).await?;
    let (mut writer, mut reader) = ws.split();

    let nick = anonymous_nick();
    let channel = channel.trim_start_matches('#').to_lowercase();

    writer
        .send(Message::Text(
            "CAP REQ :twitch.tv/tags twitch.tv/commands".to_string(),
        ))
        .await?;
    writer.send(Message::Text("PASS oauth:".to_string())).await?;
    writer.send(Message::Text(format!("NICK {nick}"))).await?;
    writer.send(Message::Text(format!("JOIN #{channel}"))).await?;

    tracing::info!(%channel, %nick, "joined twitch chat");

    while let Some(frame) = reader.next().await {
        let text = match frame? {
            Message::Text(text) => text,
            // Twitch IRC is text, but tolerate UTF-8 binary frames.
            Message::Binary(data) => match String::from_utf8(data) {
                Ok(text) => text,
                Err(_) => continue,
            },
            Message::Ping(data) => {
                writer.send(Message::Pong(data)).await?;
                continue;
            }
            Message::Close(_) => break,
            _ => continue,
        };

        // One frame may carry several IRC lines.
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            // IRC-level keepalive: Twitch PINGs us roughly every 5 minutes.
            if let Some(rest) = line.strip_prefix("PING") {
                writer.send(Message::Text(format!("PONG{rest}"))).await?;
                continue;
            }

            if let Some(event) = parse_privmsg(line) {
                if let Err(err) = service.process(&event).await {
                    tracing::error!(error = %err, user = %event.display_name, "dropping malformed chat event");
                }
            }
        }
    }

    tracing::warn!("twitch chat connection closed");
    Ok(())
}

/// Parses one tagged IRC line into a ChatEvent. Returns None for anything
/// that is not a PRIVMSG.
///
/// Shape: `@k=v;k2=v2 :user!user@user.tmi.twitch.tv PRIVMSG #channel :text`
fn parse_privmsg(line: &str) -> Option<ChatEvent> {
    if !line.contains("PRIVMSG") {
        return None;
    }

    let mut tags: HashMap<&str, &str> = HashMap::new();
    let mut remaining = line;

    if let Some(rest) = line.strip_prefix('@') {
        let space = rest.find(' ')?;
        for tag in rest[..space].split(';') {
            if let Some((key, value)) = tag.split_once('=') {
                tags.insert(key, value);
            }
        }
        remaining = &rest[space + 1..];
    }

    let parts: Vec<&str> = remaining.splitn(4, ' ').collect();
    if parts.len() < 4 || parts[1] != "PRIVMSG" {
        return None;
    }

    let body = parts[3].strip_prefix(':').unwrap_or(parts[3]);
    let login = parts[0]
        .strip_prefix(':')
        .and_then(|s| s.split('!').next())
        .unwrap_or("");
    let display_name = tags
        .get("display-name")
        .copied()
        .filter(|v| !v.is_empty())
        .unwrap_or(login);

    Some(ChatEvent {
        role: UserRole::from_user_type(tags.get("user-type").copied().unwrap_or("")),
        display_name: display_name.to_string(),
        body: body.trim().to_string(),
        sent_ts_millis: tags.get("tmi-sent-ts").copied().unwrap_or("").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOD_LINE: &str = "@badge-info=;badges=moderator/1;color=#FF0000;display-name=HelpfulMod;emotes=;id=abc123;mod=1;room-id=12345;subscriber=0;tmi-sent-ts=1700000000000;turbo=0;user-id=67890;user-type=mod :helpfulmod!helpfulmod@helpfulmod.tmi.twitch.tv PRIVMSG #channel :slides at https://example.com";

    #[test]
    fn parses_moderator_privmsg() {
        let event = parse_privmsg(MOD_LINE).unwrap();
        assert_eq!(event.role, UserRole::Moderator);
        assert_eq!(event.display_name, "HelpfulMod");
        assert_eq!(event.body, "slides at https://example.com");
        assert_eq!(event.sent_ts_millis, "1700000000000");
    }

    #[test]
    fn plain_viewer_has_viewer_role() {
        let line = "@display-name=Chatter;tmi-sent-ts=1700000000000;user-type= :chatter!chatter@chatter.tmi.twitch.tv PRIVMSG #channel :hello";
        let event = parse_privmsg(line).unwrap();
        assert_eq!(event.role, UserRole::Viewer);
        assert_eq!(event.display_name, "Chatter");
    }

    #[test]
    fn falls_back_to_login_when_display_name_is_empty() {
        let line = "@display-name=;tmi-sent-ts=1700000000000 :someuser!someuser@someuser.tmi.twitch.tv PRIVMSG #channel :hi";
        let event = parse_privmsg(line).unwrap();
        assert_eq!(event.display_name, "someuser");
    }

    #[test]
    fn non_privmsg_lines_are_ignored() {
        assert!(parse_privmsg("PING :tmi.twitch.tv").is_none());
        assert!(parse_privmsg(":tmi.twitch.tv 001 justinfan123 :Welcome, GLHF!").is_none());
        assert!(
            parse_privmsg(":someuser!someuser@someuser.tmi.twitch.tv JOIN #channel").is_none()
        );
    }

    #[test]
    fn untagged_privmsg_still_parses() {
        let line = ":someuser!someuser@someuser.tmi.twitch.tv PRIVMSG #channel :no tags here";
        let event = parse_privmsg(line).unwrap();
        assert_eq!(event.display_name, "someuser");
        assert_eq!(event.body, "no tags here");
        assert!(event.sent_ts_millis.is_empty());
    }

    #[test]
    fn anonymous_nick_is_justinfan() {
        let nick = anonymous_nick();
        assert!(nick.starts_with("justinfan"));
    }
}
