use crate::error::{IdentityError, JournalLineError};
use crate::timestamp::{format_journal_timestamp, parse_timestamp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::{self, Write as _};
use std::str::FromStr;

// ============================================================================
// Identity
// ============================================================================

/// The remote party a piece of persisted state belongs to (its source
/// address).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    pub fn new(raw: impl Into<String>) -> Result<Self, IdentityError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(IdentityError::Empty);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File-name stem for this identity's per-identity files.
    ///
    /// `[A-Za-z0-9.-]` is kept and every other byte is written as `%XX`, so
    /// distinct identities never share a stem and the stem can never name a
    /// path outside the storage directory. An all-dot identity is escaped in
    /// full.
    pub fn file_stem(&self) -> String {
        let all_dots = self.0.bytes().all(|b| b == b'.');
        let mut stem = String::with_capacity(self.0.len());
        for b in self.0.bytes() {
            if (b.is_ascii_alphanumeric() || b == b'-' || b == b'.') && !all_dots {
                stem.push(char::from(b));
            } else {
                let _ = write!(stem, "%{:02X}", b);
            }
        }
        stem
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Identity {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Identity {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Identity> for String {
    fn from(value: Identity) -> Self {
        value.0
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Activity log records
// ============================================================================

pub const EVENT_SESSION_CONNECT: &str = "cowrie.session.connect";
pub const EVENT_COMMAND_INPUT: &str = "cowrie.command.input";

const CONNECT_PREFIX: &str = "New connection:";
const COMMAND_PREFIX: &str = "CMD:";

/// One line of the shared, append-only activity log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "src_ip", alias = "source_identity")]
    pub source_identity: String,
    #[serde(deserialize_with = "message_text")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eventid: Option<String>,
}

/// What an activity record means to the journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityEvent<'a> {
    NewConnection,
    Command(&'a str),
    Other,
}

impl ActivityRecord {
    /// Parse one log line.
    pub fn from_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    pub fn belongs_to(&self, identity: &Identity) -> bool {
        self.source_identity.trim() == identity.as_str()
    }

    pub fn classify(&self) -> ActivityEvent<'_> {
        let message = self.message.trim_start();
        match self.eventid.as_deref() {
            Some(EVENT_SESSION_CONNECT) => return ActivityEvent::NewConnection,
            Some(EVENT_COMMAND_INPUT) => {
                let text = message.strip_prefix(COMMAND_PREFIX).unwrap_or(message);
                return ActivityEvent::Command(text.trim());
            }
            _ => {}
        }
        if message.starts_with(CONNECT_PREFIX) {
            ActivityEvent::NewConnection
        } else if let Some(text) = message.strip_prefix(COMMAND_PREFIX) {
            ActivityEvent::Command(text.trim())
        } else {
            ActivityEvent::Other
        }
    }
}

/// The log writer emits `message` either as a string or as a list of
/// fragments.
fn message_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum MessageField {
        Text(String),
        Parts(Vec<String>),
    }

    Ok(match MessageField::deserialize(deserializer)? {
        MessageField::Text(text) => text,
        MessageField::Parts(parts) => parts.join(" "),
    })
}

// ============================================================================
// Journal entries
// ============================================================================

/// A mutating command together with the instant it was originally issued.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JournalEntry {
    pub timestamp: DateTime<Utc>,
    pub command: String,
}

impl JournalEntry {
    pub fn new(timestamp: DateTime<Utc>, command: impl Into<String>) -> Self {
        Self {
            timestamp,
            command: command.into(),
        }
    }

    pub fn verb(&self) -> Option<&str> {
        self.command.split_ascii_whitespace().next()
    }

    pub fn args(&self) -> impl Iterator<Item = &str> {
        self.command.split_ascii_whitespace().skip(1)
    }

    /// Serialize as `timestamp,command` without the trailing newline.
    pub fn to_line(&self) -> String {
        format!(
            "{},{}",
            format_journal_timestamp(&self.timestamp),
            self.command
        )
    }

    /// Parse a journal line. Only the first comma separates the fields, so
    /// commands may themselves contain commas.
    pub fn parse_line(line: &str) -> Result<Self, JournalLineError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let (raw_ts, command) = line
            .split_once(',')
            .ok_or(JournalLineError::MissingSeparator)?;
        let timestamp = parse_timestamp(raw_ts)?;
        let command = command.trim();
        if command.is_empty() {
            return Err(JournalLineError::EmptyCommand);
        }
        Ok(Self::new(timestamp, command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_identity_file_stem() {
        let v4 = Identity::new("203.0.113.5").unwrap();
        assert_eq!(v4.file_stem(), "203.0.113.5");

        let v6 = Identity::new("2001:db8::1").unwrap();
        assert_eq!(v6.file_stem(), "2001%3Adb8%3A%3A1");

        // Would collide with the address above under a plain substitution.
        let lookalike = Identity::new("2001_db8__1").unwrap();
        assert_eq!(lookalike.file_stem(), "2001%5Fdb8%5F%5F1");
        assert_ne!(v6.file_stem(), lookalike.file_stem());

        let escaped = Identity::new("2001%3Adb8%3A%3A1").unwrap();
        assert_ne!(v6.file_stem(), escaped.file_stem());

        let hostile = Identity::new("../../etc/passwd").unwrap();
        assert_eq!(hostile.file_stem(), "..%2F..%2Fetc%2Fpasswd");

        let dots = Identity::new("..").unwrap();
        assert_eq!(dots.file_stem(), "%2E%2E");

        assert_eq!(Identity::new("   "), Err(IdentityError::Empty));
    }

    #[test]
    fn test_activity_record_from_cowrie_json() {
        let line = r#"{"eventid":"cowrie.command.input","input":"touch a","message":"CMD: touch a","sensor":"hp","timestamp":"2021-05-01T12:34:56.789012Z","src_ip":"203.0.113.5","session":"abc"}"#;
        let record = ActivityRecord::from_line(line).unwrap();
        assert_eq!(record.source_identity, "203.0.113.5");
        assert_eq!(record.classify(), ActivityEvent::Command("touch a"));
    }

    #[test]
    fn test_activity_record_message_parts_and_alias() {
        let line = r#"{"timestamp":"2021-05-01T12:00:00Z","source_identity":"10.0.0.1","message":["New connection:","10.0.0.1:5555"]}"#;
        let record = ActivityRecord::from_line(line).unwrap();
        assert_eq!(record.message, "New connection: 10.0.0.1:5555");
        assert_eq!(record.classify(), ActivityEvent::NewConnection);
    }

    #[test]
    fn test_classify_by_message_only() {
        let record = ActivityRecord {
            timestamp: Utc::now(),
            source_identity: "x".into(),
            message: "Command found: ls".into(),
            eventid: None,
        };
        assert_eq!(record.classify(), ActivityEvent::Other);
    }

    #[test]
    fn test_journal_line_round_trip() {
        let ts = Utc.with_ymd_and_hms(2021, 5, 1, 12, 34, 56).unwrap();
        let entry = JournalEntry::new(ts, "cp a,b c");
        let line = entry.to_line();
        assert_eq!(line, "2021-05-01T12:34:56+00:00,cp a,b c");
        assert_eq!(JournalEntry::parse_line(&line).unwrap(), entry);
        assert_eq!(entry.verb(), Some("cp"));
        assert_eq!(entry.args().collect::<Vec<_>>(), vec!["a,b", "c"]);
    }

    #[test]
    fn test_journal_line_errors() {
        assert_eq!(
            JournalEntry::parse_line("2021-05-01T12:34:56Z touch a"),
            Err(JournalLineError::MissingSeparator)
        );
        assert_eq!(
            JournalEntry::parse_line("2021-05-01T12:34:56Z,   "),
            Err(JournalLineError::EmptyCommand)
        );
        assert!(matches!(
            JournalEntry::parse_line("not-a-date,touch a"),
            Err(JournalLineError::Timestamp(_))
        ));
    }
}
