//! End-to-end coverage of the dispatcher's handler traversal, privilege
//! filter and WHOIS replay queue against a minimal fixture plugin.

use std::time::{Duration, SystemTime};

use finch_core::dispatcher::Dispatcher;
use finch_core::event::{Event, EventKind, WhoisReply};
use finch_core::outbound::{OutboundMessage, QueueSink};
use finch_core::privilege::PrivilegeLevel;
use finch_core::registry::{AwarenessStage, Chainability, ChannelPolicy, HandlerDescriptor, HandlerFn, PrefixPolicy, Registry};
use finch_core::state::{BotConfig, ClientIdentity, PluginState, ServerCapabilities};
use finch_core::user::{User, UserClass};
use finch_core::Plugin;

/// Each handler's only observable effect is an outbound `Raw { line }`
/// tagged with its own name, so traversal order and early-exit can be
/// read straight off the sink after `dispatch`.
struct TestPlugin {
    state: PluginState,
}

fn mark_handler(plugin: &mut TestPlugin, label: &'static str) {
    plugin.state.enqueue_outbound(
        OutboundMessage::Raw { line: label.to_string() },
        Default::default(),
    );
}

impl Plugin for TestPlugin {
    fn name(&self) -> &'static str {
        "test-plugin"
    }

    fn construct(state: PluginState) -> (Self, Registry<Self>) {
        let mut registry = Registry::new();

        registry.push(HandlerDescriptor {
            name: "early-chainable",
            event_types: vec![EventKind::Chan],
            channel_policy: ChannelPolicy::Any,
            prefix_policy: PrefixPolicy::Direct,
            command_words: Vec::new(),
            regexes: Vec::new(),
            privilege: PrivilegeLevel::Ignore,
            chainability: Chainability::Chainable,
            stage: AwarenessStage::Early,
            verbose: false,
            func: HandlerFn::PluginAndEvent(Box::new(|plugin: &mut TestPlugin, _event: &Event| {
                mark_handler(plugin, "early-chainable");
            })),
        });

        registry.push(HandlerDescriptor {
            name: "normal-terminating",
            event_types: vec![EventKind::Chan],
            channel_policy: ChannelPolicy::Any,
            prefix_policy: PrefixPolicy::Direct,
            command_words: Vec::new(),
            regexes: Vec::new(),
            privilege: PrivilegeLevel::Ignore,
            chainability: Chainability::Terminating,
            stage: AwarenessStage::Normal,
            verbose: false,
            func: HandlerFn::PluginAndEvent(Box::new(|plugin: &mut TestPlugin, _event: &Event| {
                mark_handler(plugin, "normal-terminating");
            })),
        });

        registry.push(HandlerDescriptor {
            name: "late-unreached",
            event_types: vec![EventKind::Chan],
            channel_policy: ChannelPolicy::Any,
            prefix_policy: PrefixPolicy::Direct,
            command_words: Vec::new(),
            regexes: Vec::new(),
            privilege: PrivilegeLevel::Ignore,
            chainability: Chainability::Terminating,
            stage: AwarenessStage::Late,
            verbose: false,
            func: HandlerFn::PluginAndEvent(Box::new(|plugin: &mut TestPlugin, _event: &Event| {
                mark_handler(plugin, "late-unreached");
            })),
        });

        registry.push(HandlerDescriptor {
            name: "anyone-only",
            event_types: vec![EventKind::Chan],
            channel_policy: ChannelPolicy::Any,
            prefix_policy: PrefixPolicy::Direct,
            command_words: vec!["!greet".to_string()],
            regexes: Vec::new(),
            privilege: PrivilegeLevel::Anyone,
            chainability: Chainability::ImplicitTerminating,
            stage: AwarenessStage::Normal,
            verbose: false,
            func: HandlerFn::PluginAndEvent(Box::new(|plugin: &mut TestPlugin, _event: &Event| {
                mark_handler(plugin, "anyone-only");
            })),
        });

        (TestPlugin { state }, registry)
    }

    fn state(&self) -> &PluginState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut PluginState {
        &mut self.state
    }
}

fn fresh_state() -> PluginState {
    PluginState::new(
        ClientIdentity {
            nickname: "bot".to_string(),
            ident: "botident".to_string(),
        },
        ServerCapabilities {
            daemon: "inspircd".to_string(),
            supports_whois: true,
        },
        BotConfig::default(),
    )
}

fn raw_lines(sink: &QueueSink) -> Vec<String> {
    sink.sent
        .iter()
        .filter_map(|(msg, _)| match msg {
            OutboundMessage::Raw { line } => Some(line.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn chainable_early_handler_falls_through_to_terminating_normal_handler() {
    let mut dispatcher = Dispatcher::new();
    dispatcher.register::<TestPlugin>(fresh_state());
    let mut sink = QueueSink::default();

    let event = Event::new(EventKind::Chan, "anything").with_sender("alice");
    dispatcher.dispatch(event, &mut sink, Duration::from_secs(300));

    assert_eq!(raw_lines(&sink), vec!["early-chainable", "normal-terminating"]);
}

#[test]
fn blacklisted_sender_never_reaches_an_anyone_level_handler() {
    let mut state = fresh_state();
    state.users.insert(
        "mallory".to_string(),
        User {
            nickname: "mallory".to_string(),
            ident: String::new(),
            address: String::new(),
            account: "mallory_acct".to_string(),
            alias: String::new(),
            class: UserClass::Blacklist,
            last_whois: Some(SystemTime::now()),
            badges: Vec::new(),
            colour: None,
        },
    );

    let mut dispatcher = Dispatcher::new();
    dispatcher.register::<TestPlugin>(state);
    let mut sink = QueueSink::default();

    let event = Event::new(EventKind::Chan, "!greet").with_sender("mallory");
    dispatcher.dispatch(event, &mut sink, Duration::from_secs(300));

    // early-chainable and normal-terminating both run unconditionally
    // (Ignore); anyone-only must not, since mallory is blacklisted.
    assert_eq!(raw_lines(&sink), vec!["early-chainable", "normal-terminating"]);
}

#[test]
fn anyone_level_handler_with_unknown_sender_issues_whois_then_replays_on_reply() {
    let mut state = fresh_state();
    state.users.insert(
        "bob".to_string(),
        User {
            nickname: "bob".to_string(),
            ident: String::new(),
            address: String::new(),
            account: String::new(),
            alias: String::new(),
            class: UserClass::Unset,
            last_whois: None,
            badges: Vec::new(),
            colour: None,
        },
    );

    let mut dispatcher = Dispatcher::new();
    dispatcher.register::<TestPlugin>(state);
    let mut sink = QueueSink::default();

    let event = Event::new(EventKind::Chan, "!greet").with_sender("bob");
    dispatcher.dispatch(event, &mut sink, Duration::from_secs(300));

    assert!(!raw_lines(&sink).contains(&"anyone-only".to_string()), "handler must wait on WHOIS");
    assert!(sink
        .sent
        .iter()
        .any(|(msg, _)| matches!(msg, OutboundMessage::Whois { nickname } if nickname == "bob")));

    // A real WHOIS-reply awareness handler stamps `last_whois` before the
    // EndOfWhois event reaches the replay queue; this fixture can't reach
    // into the registered plugin's state from outside the dispatcher, so
    // it only exercises the still-expired path: the replay re-evaluates
    // privilege and, finding the cache still stale, does not re-run the
    // handler and does not re-issue a second WHOIS either (the pending
    // request matching this reply was already removed from the queue).
    sink.sent.clear();
    let whois_reply = Event::new(EventKind::Whois(WhoisReply::EndOfWhois), "").with_sender("bob");
    dispatcher.dispatch(whois_reply, &mut sink, Duration::from_secs(300));

    assert!(sink.sent.is_empty());
}

#[test]
fn whois_unsupported_reply_clears_the_entire_trigger_queue() {
    let mut state = fresh_state();
    state.users.insert(
        "bob".to_string(),
        User {
            nickname: "bob".to_string(),
            ident: String::new(),
            address: String::new(),
            account: String::new(),
            alias: String::new(),
            class: UserClass::Unset,
            last_whois: None,
            badges: Vec::new(),
            colour: None,
        },
    );

    let mut dispatcher = Dispatcher::new();
    dispatcher.register::<TestPlugin>(state);
    let mut sink = QueueSink::default();

    let event = Event::new(EventKind::Chan, "!greet").with_sender("bob");
    dispatcher.dispatch(event, &mut sink, Duration::from_secs(300));
    assert!(sink.sent.iter().any(|(msg, _)| matches!(msg, OutboundMessage::Whois { .. })));

    sink.sent.clear();
    let unsupported = Event::new(EventKind::Whois(WhoisReply::UnknownCommand), "").with_sender("bob");
    dispatcher.dispatch(unsupported, &mut sink, Duration::from_secs(300));

    assert!(
        sink.sent.is_empty(),
        "an unsupported WHOIS must clear the queue outright, not replay against it"
    );
}
