//! Per-plugin shared context (spec.md §3 `PluginState`).

use std::collections::HashMap;
use std::time::SystemTime;

use crate::channel::Channel;
use crate::outbound::{OutboundMessage, SendFlags};
use crate::privilege::TriggerRequest;
use crate::scheduler::Scheduler;
use crate::user::User;

/// Identity of the bot's own connection.
#[derive(Debug, Clone, Default)]
pub struct ClientIdentity {
    pub nickname: String,
    pub ident: String,
}

/// Capability/mode metadata about the connected server.
#[derive(Debug, Clone, Default)]
pub struct ServerCapabilities {
    pub daemon: String,
    pub supports_whois: bool,
}

/// Bot-wide configuration a plugin's `home`-policy handlers consult.
#[derive(Debug, Clone, Default)]
pub struct BotConfig {
    pub home_channels: Vec<String>,
    pub guest_channels: Vec<String>,
    pub global_prefix: String,
}

impl BotConfig {
    pub fn is_home(&self, channel: &str) -> bool {
        self.home_channels.iter().any(|c| c == channel)
    }
}

/// One plugin instance's exclusively-owned state. The dispatcher holds a
/// non-owning reference while invoking handlers (spec.md §3 Ownership).
pub struct PluginState {
    pub client: ClientIdentity,
    pub server: ServerCapabilities,
    pub bot: BotConfig,
    pub users: HashMap<String, User>,
    pub channels: HashMap<String, Channel>,
    pub trigger_queue: HashMap<String, Vec<TriggerRequest>>,
    pub scheduler: Scheduler,
    pub next_periodical: Option<SystemTime>,
    /// Outbound messages a handler pushed during this invocation; drained
    /// by the dispatcher into the real [`OutboundSink`](crate::outbound::OutboundSink)
    /// after every handler call (spec.md §5 "handlers never write to the
    /// socket directly").
    pub(crate) outbound: Vec<(OutboundMessage, SendFlags)>,
}

impl PluginState {
    pub fn new(client: ClientIdentity, server: ServerCapabilities, bot: BotConfig) -> Self {
        PluginState {
            client,
            server,
            bot,
            users: HashMap::new(),
            channels: HashMap::new(),
            trigger_queue: HashMap::new(),
            scheduler: Scheduler::new(),
            next_periodical: None,
            outbound: Vec::new(),
        }
    }

    /// Queues an outbound message; picked up by the dispatcher after the
    /// handler returns (spec.md §2 "handlers may enqueue outbound
    /// messages").
    pub fn enqueue_outbound(&mut self, message: OutboundMessage, flags: SendFlags) {
        self.outbound.push((message, flags));
    }

    pub(crate) fn drain_outbound(&mut self) -> Vec<(OutboundMessage, SendFlags)> {
        std::mem::take(&mut self.outbound)
    }

    /// Removes `nickname` from the users map if it's not a member of any
    /// tracked channel, per spec.md §4.4/§8 ("no user appears in `users`
    /// whose membership was only through C").
    pub fn prune_user_if_orphaned(&mut self, nickname: &str) {
        let still_present = self.channels.values().any(|c| c.users.contains(nickname));
        if !still_present {
            self.users.remove(nickname);
        }
    }

    pub fn ensure_user(&mut self, nickname: &str) -> &mut User {
        self.users
            .entry(nickname.to_string())
            .or_insert_with(|| User::new(nickname))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Channel;

    fn fresh_state() -> PluginState {
        PluginState::new(ClientIdentity::default(), ServerCapabilities::default(), BotConfig::default())
    }

    #[test]
    fn prune_removes_user_with_no_remaining_channel_membership() {
        let mut state = fresh_state();
        state.ensure_user("alice");
        let mut channel_a = Channel::new("#a");
        channel_a.add_user("alice");
        state.channels.insert("#a".to_string(), channel_a);

        state.channels.get_mut("#a").unwrap().remove_user("alice");
        state.prune_user_if_orphaned("alice");

        assert!(!state.users.contains_key("alice"));
    }

    #[test]
    fn prune_keeps_user_still_present_in_another_channel() {
        let mut state = fresh_state();
        state.ensure_user("alice");
        let mut channel_a = Channel::new("#a");
        channel_a.add_user("alice");
        let mut channel_b = Channel::new("#b");
        channel_b.add_user("alice");
        state.channels.insert("#a".to_string(), channel_a);
        state.channels.insert("#b".to_string(), channel_b);

        state.channels.get_mut("#a").unwrap().remove_user("alice");
        state.prune_user_if_orphaned("alice");

        assert!(state.users.contains_key("alice"));
    }
}
