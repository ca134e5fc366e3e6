use std::collections::HashSet;

use chrono::{DateTime, Utc};

/// One parsed chat line, as delivered by the IRC transport. Consumed
/// read-only by the core; the transport owns parsing.
#[derive(Debug, Clone)]
pub struct ChatEvent {
    pub role: UserRole,
    pub display_name: String,
    pub body: String,
    /// Twitch's `tmi-sent-ts` tag: milliseconds since epoch as a decimal
    /// string. Kept raw because the wire format is a compatibility contract.
    pub sent_ts_millis: String,
}

/// What the IRC `user-type` tag says about the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRole {
    Moderator,
    Viewer,
}

impl UserRole {
    /// Twitch sends `mod` for channel moderators and an empty string for
    /// everyone else.
    pub fn from_user_type(tag: &str) -> Self {
        if tag == "mod" {
            Self::Moderator
        } else {
            Self::Viewer
        }
    }
}

/// Who is allowed to have their links logged: any moderator, plus an exact
/// allow-list of display names.
#[derive(Debug, Clone, Default)]
pub struct AuthPolicy {
    privileged_names: HashSet<String>,
}

impl AuthPolicy {
    pub fn new(privileged_names: impl IntoIterator<Item = String>) -> Self {
        Self {
            privileged_names: privileged_names.into_iter().collect(),
        }
    }

    pub fn permits(&self, event: &ChatEvent) -> bool {
        event.role == UserRole::Moderator || self.privileged_names.contains(&event.display_name)
    }
}

/// Everything we know about the stream at the moment one message was
/// processed. Built fresh per event and dropped once its rows are written.
#[derive(Debug, Clone)]
pub struct StreamSnapshot {
    pub title: String,
    /// When the triggering message was sent (UTC, whole seconds).
    pub observed_at: DateTime<Utc>,
    /// Detected links, in order of appearance in the message.
    pub links: Vec<String>,
}

/// One spreadsheet row. Field order matches the existing sheet layout, so
/// it must stay title, date, time, link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpreadsheetRow {
    pub title: String,
    pub date: String,
    pub time: String,
    pub link: String,
}

impl SpreadsheetRow {
    /// Derives the row for one of the snapshot's links. Date and time are
    /// formatted in UTC; these exact formats are what the sheet already
    /// contains.
    pub fn from_snapshot(snapshot: &StreamSnapshot, link: &str) -> Self {
        Self {
            title: snapshot.title.clone(),
            date: snapshot.observed_at.format("%Y-%m-%d").to_string(),
            time: snapshot.observed_at.format("%H:%M:%S").to_string(),
            link: link.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(role: UserRole, name: &str) -> ChatEvent {
        ChatEvent {
            role,
            display_name: name.to_string(),
            body: String::new(),
            sent_ts_millis: "1700000000000".to_string(),
        }
    }

    #[test]
    fn moderators_always_pass() {
        let policy = AuthPolicy::default();
        assert!(policy.permits(&event(UserRole::Moderator, "anyone")));
    }

    #[test]
    fn allow_list_is_exact_match() {
        let policy = AuthPolicy::new(vec!["MLH".to_string()]);
        assert!(policy.permits(&event(UserRole::Viewer, "MLH")));
        assert!(!policy.permits(&event(UserRole::Viewer, "mlh")));
        assert!(!policy.permits(&event(UserRole::Viewer, "SomeoneElse")));
    }

    #[test]
    fn user_type_tag_maps_to_role() {
        assert_eq!(UserRole::from_user_type("mod"), UserRole::Moderator);
        assert_eq!(UserRole::from_user_type(""), UserRole::Viewer);
        assert_eq!(UserRole::from_user_type("staff"), UserRole::Viewer);
    }

    #[test]
    fn row_formats_date_and_time_in_utc() {
        let snapshot = StreamSnapshot {
            title: "Hack Night".to_string(),
            observed_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            links: vec!["https://example.com".to_string()],
        };

        let row = SpreadsheetRow::from_snapshot(&snapshot, &snapshot.links[0]);
        assert_eq!(row.title, "Hack Night");
        assert_eq!(row.date, "2023-11-14");
        assert_eq!(row.time, "22:13:20");
        assert_eq!(row.link, "https://example.com");
    }
}
