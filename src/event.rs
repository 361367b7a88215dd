//! Parsed event records (spec.md §3).

use std::collections::HashMap;
use std::time::SystemTime;

/// Discriminates the kind of a parsed IRC event.
///
/// `Any` is a wildcard usable only in a [`HandlerDescriptor`](crate::registry::HandlerDescriptor)'s
/// accepted-event-types set; it is never the `kind` of a concrete `Event`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Chan,
    Query,
    Join,
    Part,
    Kick,
    Nick,
    Quit,
    Ping,
    Mode,
    Topic,
    Account,
    Chghost,
    Numeric(u16),
    Ctcp(CtcpKind),
    Platform(PlatformKind),
    Whois(WhoisReply),
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CtcpKind {
    Version,
    Action,
    Ping,
    Time,
    Other,
}

/// Platform-specific event subtype (e.g. Twitch tags-only chat events).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformKind {
    TwitchChat,
    TwitchSub,
    TwitchRaid,
}

/// The WHOIS reply subtypes the privilege filter and awareness layers
/// drain the trigger-request queue on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WhoisReply {
    Account,
    RegNick,
    EndOfWhois,
    User,
    UnknownCommand,
}

/// A parsed event record, mutable only during postprocess and within the
/// matcher's local copy (spec.md §3).
#[derive(Debug, Clone)]
pub struct Event {
    pub kind: EventKind,
    pub sender: Option<String>,
    pub target: Option<String>,
    pub channel: Option<String>,
    pub content: String,
    pub raw: String,
    pub tags: HashMap<String, String>,
    pub aux: Option<String>,
    pub id: u64,
    pub time: SystemTime,
    pub count: u32,
}

impl Event {
    pub fn new(kind: EventKind, content: impl Into<String>) -> Self {
        let content = content.into();
        Event {
            kind,
            sender: None,
            target: None,
            channel: None,
            raw: content.clone(),
            content,
            tags: HashMap::new(),
            aux: None,
            id: 0,
            time: SystemTime::now(),
            count: 0,
        }
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    /// Replaces invalid UTF-8 byte sequences with the replacement
    /// character; used for the single decode-error retry (spec.md §4.1/§7).
    ///
    /// `content` and `raw` are already `String`s in this crate (the parser
    /// collaborator guarantees UTF-8 or signals a decode error before
    /// construction), so sanitisation here targets embedded control
    /// sequences a handler might choke on rather than byte-level repair.
    pub fn sanitised(&self) -> Event {
        let mut copy = self.clone();
        copy.content = copy
            .content
            .chars()
            .map(|c| if c.is_control() && c != '\n' { '\u{FFFD}' } else { c })
            .collect();
        copy
    }
}
