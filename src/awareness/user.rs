//! User awareness (spec.md §4.4, second bullet).

use std::cell::Cell;
use std::time::{Duration, SystemTime};

use crate::event::{Event, EventKind};
use crate::plugin::Plugin;
use crate::privilege::PrivilegeLevel;
use crate::registry::{AwarenessStage, Chainability, ChannelPolicy, HandlerDescriptor, HandlerFn, PrefixPolicy, Registry};

use super::numeric::{RPL_ENDOFWHO, RPL_WHOISUSER};

const DEFAULT_HOURS_BETWEEN_REHASHES: u64 = 12;

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

/// Splits `content` into whitespace tokens, stripping the leading nickname
/// token WHOIS/WHO numerics carry before the fields awareness actually wants.
fn fields_after_nickname(content: &str) -> Vec<&str> {
    content.split_whitespace().skip(1).collect()
}

/// Registers the handlers described in spec.md §4.4's user-awareness
/// bullet. `hours_between_rehashes` gates the PING-driven rehash sweep
/// (default 12, per spec).
pub fn register_user_awareness<P: Plugin>(registry: &mut Registry<P>, hours_between_rehashes: Option<u64>) {
    let rehash_period = Duration::from_secs(hours_between_rehashes.unwrap_or(DEFAULT_HOURS_BETWEEN_REHASHES) * 3600);

    push(
        registry,
        "awareness::user::on_quit",
        vec![EventKind::Quit],
        HandlerFn::PluginAndEvent(Box::new(|plugin: &mut P, event: &Event| {
            if let Some(nick) = &event.sender {
                plugin.state_mut().users.remove(nick);
            }
        })),
    );

    push(
        registry,
        "awareness::user::on_nick",
        vec![EventKind::Nick],
        HandlerFn::PluginAndEvent(Box::new(|plugin: &mut P, event: &Event| {
            let (Some(old), Some(new)) = (&event.sender, &event.target) else {
                return;
            };
            if let Some(mut user) = plugin.state_mut().users.remove(old) {
                user.nickname = new.clone();
                plugin.state_mut().users.insert(new.clone(), user);
            }
        })),
    );

    push(
        registry,
        "awareness::user::on_whois_user",
        vec![EventKind::Numeric(RPL_WHOISUSER), EventKind::Chghost],
        HandlerFn::PluginAndEvent(Box::new(|plugin: &mut P, event: &Event| {
            let Some(nick) = &event.target else { return };
            let fields = fields_after_nickname(&event.content);
            let ident = fields.first().copied();
            let address = fields.get(1).copied();
            let account = event.tags.get("account").map(String::as_str);
            plugin.state_mut().ensure_user(nick).meld_identity(ident, address, account);
        })),
    );

    push(
        registry,
        "awareness::user::catch_sender",
        vec![EventKind::Join, EventKind::Account],
        HandlerFn::PluginAndEvent(Box::new(|plugin: &mut P, event: &Event| {
            if let Some(nick) = &event.sender {
                let user = plugin.state_mut().ensure_user(nick);
                if event.kind == EventKind::Account {
                    if let Some(account) = &event.aux {
                        user.account = account.clone();
                    }
                }
            }
        })),
    );

    push(
        registry,
        "awareness::user::names_reply",
        vec![EventKind::Numeric(super::numeric::RPL_NAMREPLY)],
        HandlerFn::PluginAndEvent(Box::new(|plugin: &mut P, event: &Event| {
            for token in event.content.split_whitespace() {
                let stripped = token.trim_start_matches(['@', '+', '%', '~', '&']);
                let nickname = stripped.split('!').next().unwrap_or(stripped);
                if nickname.is_empty() {
                    continue;
                }
                plugin.state_mut().ensure_user(nickname);
            }
        })),
    );

    push(
        registry,
        "awareness::user::rehash_on_list_end",
        vec![EventKind::Numeric(super::numeric::RPL_ENDOFNAMES), EventKind::Numeric(RPL_ENDOFWHO)],
        HandlerFn::PluginOnly(Box::new(|plugin: &mut P| {
            plugin.state_mut().users.shrink_to_fit();
            tracing::debug!(plugin = plugin.name(), "users map rehashed after list end");
        })),
    );

    let last_ping_rehash: Cell<Option<SystemTime>> = Cell::new(None);
    push(
        registry,
        "awareness::user::rehash_on_ping",
        vec![EventKind::Ping],
        HandlerFn::PluginOnly(Box::new(move |plugin: &mut P| {
            let now = SystemTime::now();
            let due = match last_ping_rehash.get() {
                None => true,
                Some(t) => now.duration_since(t).unwrap_or(Duration::ZERO) >= rehash_period,
            };
            if due {
                plugin.state_mut().users.shrink_to_fit();
                last_ping_rehash.set(Some(now));
                tracing::debug!(plugin = plugin.name(), "users map rehashed on periodic PING sweep");
            }
        })),
    );
}
