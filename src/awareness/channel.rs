//! Channel awareness (spec.md §4.4, third bullet).

use crate::channel::{Channel, ModeValue};
use crate::event::{Event, EventKind};
use crate::plugin::Plugin;
use crate::privilege::PrivilegeLevel;
use crate::registry::{AwarenessStage, Chainability, ChannelPolicy, HandlerDescriptor, HandlerFn, PrefixPolicy, Registry};

use super::numeric::{RPL_BANLIST, RPL_CHANNELMODEIS, RPL_CREATIONTIME, RPL_EXCEPTLIST, RPL_INVITELIST, RPL_QUIETLIST, RPL_REOPLIST, RPL_TOPIC};

fn push<P: Plugin>(registry: &mut Registry<P>, name: &'static str, event_types: Vec<EventKind>, func: HandlerFn<P>) {
    registry.push(HandlerDescriptor {
        name,
        event_types,
        channel_policy: ChannelPolicy::Any,
        prefix_policy: PrefixPolicy::Direct,
        command_words: Vec::new(),
        regexes: Vec::new(),
        privilege: PrivilegeLevel::Ignore,
        chainability: Chainability::Chainable,
        stage: AwarenessStage::Early,
        verbose: false,
        func,
    });
}

fn drop_if_orphaned<P: Plugin>(plugin: &mut P, nickname: &str) {
    plugin.state_mut().prune_user_if_orphaned(nickname);
}

/// Appends to a list-valued mode parsed from an RPL_*LIST numeric, where
/// `content`'s second whitespace token is the entry (mask/nick).
fn append_list_entry<P: Plugin>(plugin: &mut P, event: &Event, mode_char: char) {
    let Some(channel_name) = &event.channel else { return };
    let Some(entry) = event.content.split_whitespace().nth(1) else {
        return;
    };
    if let Some(channel) = plugin.state_mut().channels.get_mut(channel_name) {
        channel.append_list_mode(mode_char, entry);
    }
}

pub fn register_channel_awareness<P: Plugin>(registry: &mut Registry<P>) {
    push(
        registry,
        "awareness::channel::on_join",
        vec![EventKind::Join],
        HandlerFn::PluginAndEvent(Box::new(|plugin: &mut P, event: &Event| {
            let Some(channel_name) = &event.channel else { return };
            let own_nickname = plugin.state().client.nickname.clone();
            if event.sender.as_deref() == Some(own_nickname.as_str()) {
                plugin
                    .state_mut()
                    .channels
                    .entry(channel_name.clone())
                    .or_insert_with(|| Channel::new(channel_name.clone()));
            } else if let Some(nick) = &event.sender {
                if let Some(channel) = plugin.state_mut().channels.get_mut(channel_name) {
                    channel.add_user(nick.clone());
                }
            }
        })),
    );

    push(
        registry,
        "awareness::channel::on_part",
        vec![EventKind::Part],
        HandlerFn::PluginAndEvent(Box::new(|plugin: &mut P, event: &Event| {
            let Some(channel_name) = &event.channel else { return };
            let own_nickname = plugin.state().client.nickname.clone();
            if event.sender.as_deref() == Some(own_nickname.as_str()) {
                if let Some(channel) = plugin.state_mut().channels.remove(channel_name) {
                    for nick in channel.users {
                        drop_if_orphaned(plugin, &nick);
                    }
                }
            } else if let Some(nick) = event.sender.clone() {
                if let Some(channel) = plugin.state_mut().channels.get_mut(channel_name) {
                    channel.remove_user(&nick);
                }
                drop_if_orphaned(plugin, &nick);
            }
        })),
    );

    push(
        registry,
        "awareness::channel::on_kick",
        vec![EventKind::Kick],
        HandlerFn::PluginAndEvent(Box::new(|plugin: &mut P, event: &Event| {
            let Some(channel_name) = &event.channel else { return };
            let own_nickname = plugin.state().client.nickname.clone();
            if event.target.as_deref() == Some(own_nickname.as_str()) {
                if let Some(channel) = plugin.state_mut().channels.remove(channel_name) {
                    for nick in channel.users {
                        drop_if_orphaned(plugin, &nick);
                    }
                }
            } else if let Some(nick) = event.target.clone() {
                if let Some(channel) = plugin.state_mut().channels.get_mut(channel_name) {
                    channel.remove_user(&nick);
                }
                drop_if_orphaned(plugin, &nick);
            }
        })),
    );

    push(
        registry,
        "awareness::channel::on_quit",
        vec![EventKind::Quit],
        HandlerFn::PluginAndEvent(Box::new(|plugin: &mut P, event: &Event| {
            let Some(nick) = event.sender.clone() else { return };
            for channel in plugin.state_mut().channels.values_mut() {
                channel.remove_user(&nick);
            }
            drop_if_orphaned(plugin, &nick);
        })),
    );

    push(
        registry,
        "awareness::channel::on_nick",
        vec![EventKind::Nick],
        HandlerFn::PluginAndEvent(Box::new(|plugin: &mut P, event: &Event| {
            let (Some(old), Some(new)) = (&event.sender, &event.target) else {
                return;
            };
            for channel in plugin.state_mut().channels.values_mut() {
                channel.rekey_user(old, new.clone());
            }
        })),
    );

    push(
        registry,
        "awareness::channel::on_topic",
        vec![EventKind::Topic, EventKind::Numeric(RPL_TOPIC)],
        HandlerFn::PluginAndEvent(Box::new(|plugin: &mut P, event: &Event| {
            let Some(channel_name) = &event.channel else { return };
            if let Some(channel) = plugin.state_mut().channels.get_mut(channel_name) {
                channel.topic = event.content.clone();
            }
        })),
    );

    push(
        registry,
        "awareness::channel::on_creation_time",
        vec![EventKind::Numeric(RPL_CREATIONTIME)],
        HandlerFn::PluginAndEvent(Box::new(|plugin: &mut P, event: &Event| {
            let Some(channel_name) = &event.channel else { return };
            let Some(unix_secs) = event.content.split_whitespace().next().and_then(|t| t.parse::<u64>().ok()) else {
                return;
            };
            if let Some(channel) = plugin.state_mut().channels.get_mut(channel_name) {
                channel.created = Some(std::time::UNIX_EPOCH + std::time::Duration::from_secs(unix_secs));
            }
        })),
    );

    push(
        registry,
        "awareness::channel::on_mode",
        vec![EventKind::Mode, EventKind::Numeric(RPL_CHANNELMODEIS)],
        HandlerFn::PluginAndEvent(Box::new(|plugin: &mut P, event: &Event| {
            let Some(channel_name) = &event.channel else { return };
            let mut tokens = event.content.split_whitespace();
            let Some(modeline) = tokens.next() else { return };
            let params: Vec<&str> = tokens.collect();
            let mut param_index = 0;
            let mut sign = '+';

            let Some(channel) = plugin.state_mut().channels.get_mut(channel_name) else {
                return;
            };
            for ch in modeline.chars() {
                match ch {
                    '+' | '-' => sign = ch,
                    'b' | 'e' | 'I' | 'q' => {
                        if let Some(&param) = params.get(param_index) {
                            param_index += 1;
                            channel.append_list_mode(ch, param);
                        }
                    }
                    'k' | 'l' => {
                        let value = if sign == '+' {
                            params.get(param_index).copied().unwrap_or("").to_string()
                        } else {
                            String::new()
                        };
                        if sign == '+' {
                            param_index += 1;
                        }
                        channel.set_mode(ch, ModeValue::Scalar(value));
                    }
                    _ => {
                        channel.set_mode(ch, ModeValue::Scalar(sign.to_string()));
                    }
                }
            }
        })),
    );

    for (mode_char, numeric) in [
        ('b', RPL_BANLIST),
        ('e', RPL_EXCEPTLIST),
        ('I', RPL_INVITELIST),
        ('R', RPL_REOPLIST),
        ('q', RPL_QUIETLIST),
    ] {
        registry.push(HandlerDescriptor {
            name: "awareness::channel::list_mode_numeric",
            event_types: vec![EventKind::Numeric(numeric)],
            channel_policy: ChannelPolicy::Any,
            prefix_policy: PrefixPolicy::Direct,
            command_words: Vec::new(),
            regexes: Vec::new(),
            privilege: PrivilegeLevel::Ignore,
            chainability: Chainability::Chainable,
            stage: AwarenessStage::Early,
            verbose: false,
            func: HandlerFn::PluginAndEvent(Box::new(move |plugin: &mut P, event: &Event| {
                append_list_entry(plugin, event, mode_char);
            })),
        });
    }
}
