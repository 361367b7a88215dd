//! Minimal authentication awareness (spec.md §4.4, first bullet).
//!
//! The dispatcher unconditionally drains `trigger_queue` on every WHOIS
//! reply for every plugin (`Dispatcher::dispatch`'s `drain_whois` call,
//! spec.md §4.3) — that part of this layer is structural, not opt-in.
//! What a plugin actually registers here is the visible half: a place to
//! log the terminal replies, matching the teacher's habit of a thin
//! `tracing::debug!` at protocol boundaries (`net/plugin/error.rs`).

use crate::event::{Event, EventKind, WhoisReply};
use crate::plugin::Plugin;
use crate::registry::{AwarenessStage, Chainability, ChannelPolicy, HandlerDescriptor, HandlerFn, PrefixPolicy, Registry};
use crate::privilege::PrivilegeLevel;

pub fn register_minimal_authentication<P: Plugin>(registry: &mut Registry<P>) {
    registry.push(HandlerDescriptor {
        name: "awareness::minimal_authentication::whois_settled",
        event_types: vec![
            EventKind::Whois(WhoisReply::EndOfWhois),
            EventKind::Whois(WhoisReply::UnknownCommand),
        ],
        channel_policy: ChannelPolicy::Any,
        prefix_policy: PrefixPolicy::Direct,
        command_words: Vec::new(),
        regexes: Vec::new(),
        privilege: PrivilegeLevel::Ignore,
        chainability: Chainability::Chainable,
        stage: AwarenessStage::Setup,
        verbose: false,
        func: HandlerFn::PluginAndEvent(Box::new(|plugin: &mut P, event: &Event| {
            let pending = plugin
                .state()
                .trigger_queue
                .values()
                .map(Vec::len)
                .sum::<usize>();
            tracing::debug!(
                plugin = plugin.name(),
                kind = ?event.kind,
                pending,
                "whois settled"
            );
        })),
    });
}
