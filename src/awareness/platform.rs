//! Platform-specific awareness (spec.md §4.4, fourth bullet), e.g. Twitch.

use crate::channel::Channel;
use crate::event::{Event, EventKind, PlatformKind};
use crate::plugin::Plugin;
use crate::privilege::PrivilegeLevel;
use crate::registry::{AwarenessStage, Chainability, ChannelPolicy, HandlerDescriptor, HandlerFn, PrefixPolicy, Registry};

/// Registers a chat-catching handler active only while the connected
/// server's daemon identifies as `daemon_identifier` (case-insensitive),
/// per spec.md §4.4's "only active when the server's daemon identifies as
/// that platform".
pub fn register_platform_awareness<P: Plugin>(registry: &mut Registry<P>, platform: PlatformKind, daemon_identifier: &'static str) {
    registry.push(HandlerDescriptor {
        name: "awareness::platform::catch_chat_sender",
        event_types: vec![EventKind::Platform(platform)],
        channel_policy: ChannelPolicy::Any,
        prefix_policy: PrefixPolicy::Direct,
        command_words: Vec::new(),
        regexes: Vec::new(),
        privilege: PrivilegeLevel::Ignore,
        chainability: Chainability::Chainable,
        stage: AwarenessStage::Early,
        verbose: false,
        func: HandlerFn::PluginAndEvent(Box::new(move |plugin: &mut P, event: &Event| {
            if !plugin.state().server.daemon.eq_ignore_ascii_case(daemon_identifier) {
                return;
            }
            let Some(nick) = &event.sender else { return };
            plugin.state_mut().ensure_user(nick);
            if let Some(channel_name) = &event.channel {
                let channel = plugin
                    .state_mut()
                    .channels
                    .entry(channel_name.clone())
                    .or_insert_with(|| Channel::new(channel_name.clone()));
                channel.add_user(nick.clone());
            }
        })),
    });
}
