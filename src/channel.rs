//! Channel records and mode tables (spec.md §3).

use std::collections::{HashMap, HashSet};
use std::time::SystemTime;

/// A channel mode's value: scalar modes (e.g. `k`, `l`) replace on update;
/// list-valued modes (bans, excepts, invex, ...) accumulate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeValue {
    Scalar(String),
    List(Vec<String>),
}

impl ModeValue {
    /// Appends to a list mode, creating it if absent-typed, or replaces a
    /// scalar mode (spec.md §4.4 MODE/RPL_CHANNELMODEIS handling).
    pub fn apply(existing: Option<&mut ModeValue>, incoming: ModeValue) -> ModeValue {
        match (existing, incoming) {
            (Some(ModeValue::List(list)), ModeValue::List(mut new_items)) => {
                list.append(&mut new_items);
                ModeValue::List(list.clone())
            }
            (_, incoming) => incoming,
        }
    }
}

/// A tracked channel. Invariant: every nickname in `users` must also have
/// an entry in the owning plugin's users map while the channel is tracked
/// (spec.md §3, §8).
#[derive(Debug, Clone)]
pub struct Channel {
    pub name: String,
    pub topic: String,
    pub created: Option<SystemTime>,
    pub users: HashSet<String>,
    pub modes: HashMap<char, ModeValue>,
}

impl Channel {
    pub fn new(name: impl Into<String>) -> Self {
        Channel {
            name: name.into(),
            topic: String::new(),
            created: None,
            users: HashSet::new(),
            modes: HashMap::new(),
        }
    }

    pub fn add_user(&mut self, nickname: impl Into<String>) {
        self.users.insert(nickname.into());
    }

    pub fn remove_user(&mut self, nickname: &str) {
        self.users.remove(nickname);
    }

    pub fn rekey_user(&mut self, old: &str, new: impl Into<String>) {
        if self.users.remove(old) {
            self.users.insert(new.into());
        }
    }

    /// Applies a mode change, appending to list modes and replacing scalar
    /// modes.
    pub fn set_mode(&mut self, ch: char, value: ModeValue) {
        let applied = ModeValue::apply(self.modes.get_mut(&ch), value);
        self.modes.insert(ch, applied);
    }

    /// Appends to a list-valued mode such as `b`/`e`/`I` from a
    /// RPL_BANLIST-family numeric (spec.md §4.4).
    pub fn append_list_mode(&mut self, ch: char, entry: impl Into<String>) {
        match self.modes.entry(ch).or_insert_with(|| ModeValue::List(Vec::new())) {
            ModeValue::List(list) => list.push(entry.into()),
            other => *other = ModeValue::List(vec![entry.into()]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_mode_accumulates_across_updates() {
        let mut channel = Channel::new("#a");
        channel.append_list_mode('b', "*!*@spammer.example");
        channel.append_list_mode('b', "*!*@other.example");

        match channel.modes.get(&'b').unwrap() {
            ModeValue::List(entries) => assert_eq!(entries.len(), 2),
            ModeValue::Scalar(_) => panic!("expected list mode"),
        }
    }

    #[test]
    fn scalar_mode_replaces_rather_than_accumulates() {
        let mut channel = Channel::new("#a");
        channel.set_mode('k', ModeValue::Scalar("oldkey".to_string()));
        channel.set_mode('k', ModeValue::Scalar("newkey".to_string()));

        assert_eq!(channel.modes.get(&'k'), Some(&ModeValue::Scalar("newkey".to_string())));
    }

    #[test]
    fn rekey_user_preserves_membership_under_new_nick() {
        let mut channel = Channel::new("#a");
        channel.add_user("alice");
        channel.rekey_user("alice", "alice2");

        assert!(!channel.users.contains("alice"));
        assert!(channel.users.contains("alice2"));
    }
}
