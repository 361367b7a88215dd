//! Declarative handler predicates and the per-plugin handler registry
//! (spec.md §3 `HandlerDescriptor`, §9 "compile-time handler enumeration").
//!
//! Handlers are registered explicitly at plugin construction time into a
//! [`Registry`], mirroring the teacher's `add_plugin` pattern
//! (`net/plugin/mod.rs`), which inserts each processing element into a
//! priority-sorted `Vec<PluginEntry>` once at attach time rather than
//! re-deriving order on every dispatch. Here the sort key is the
//! [`AwarenessStage`] bucket plus registration order within it.

use regex::Regex;

use crate::event::{Event, EventKind};
use crate::privilege::PrivilegeLevel;

/// Whether a `home`-policy handler may run for a given channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelPolicy {
    /// Runs for any channel in `bot.home_channels`, or for channel-less events.
    Home,
    /// Runs regardless of channel membership.
    Any,
}

/// How raw message content is reduced to a command token (spec.md §4.2).
#[derive(Debug, Clone)]
pub enum PrefixPolicy {
    /// Matches always; `content` unchanged.
    Direct,
    /// Strip the configured global prefix; if it's empty, or the content
    /// doesn't start with it, fall through to nickname policy only when
    /// `fallback_to_nickname` is set. This resolves spec.md's Open
    /// Question (the prefixed→nickname fallback was gated on a build
    /// flag in the source) by making it an explicit per-handler choice.
    Prefixed { fallback_to_nickname: bool },
    /// Strip an optional leading `@`, then require the bot's own nickname
    /// followed by `:`, `,` or whitespace (not required for `Query` events).
    Nickname,
}

/// Awareness stage ordering: setup → early → normal → late → cleanup
/// (spec.md §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AwarenessStage {
    Setup,
    Early,
    Normal,
    Late,
    Cleanup,
}

impl AwarenessStage {
    pub const ALL: [AwarenessStage; 5] = [
        AwarenessStage::Setup,
        AwarenessStage::Early,
        AwarenessStage::Normal,
        AwarenessStage::Late,
        AwarenessStage::Cleanup,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Whether a handler falls through to the next handler in its plugin's
/// traversal, or ends it (spec.md §4.1(f)).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chainability {
    Chainable,
    Terminating,
    /// Behaves as terminating but is implied by the handler's nature
    /// (e.g. ordinary command handlers) rather than declared explicitly.
    ImplicitTerminating,
}

impl Chainability {
    pub fn falls_through(self) -> bool {
        matches!(self, Chainability::Chainable)
    }
}

/// A handler function bound to one of the four accepted arities
/// (spec.md §3, §9 "trigger-request polymorphism over arities").
pub enum HandlerFn<P> {
    NoArgs(Box<dyn Fn(&mut P)>),
    EventOnly(Box<dyn Fn(&mut P, &Event)>),
    PluginOnly(Box<dyn Fn(&mut P)>),
    PluginAndEvent(Box<dyn Fn(&mut P, &Event)>),
}

impl<P> HandlerFn<P> {
    pub fn invoke(&self, plugin: &mut P, event: &Event) {
        match self {
            HandlerFn::NoArgs(f) => f(plugin),
            HandlerFn::EventOnly(f) => f(plugin, event),
            HandlerFn::PluginOnly(f) => f(plugin),
            HandlerFn::PluginAndEvent(f) => f(plugin, event),
        }
    }
}

/// A single registered handler and its declarative predicates.
pub struct HandlerDescriptor<P> {
    pub name: &'static str,
    pub event_types: Vec<EventKind>,
    pub channel_policy: ChannelPolicy,
    pub prefix_policy: PrefixPolicy,
    pub command_words: Vec<String>,
    pub regexes: Vec<Regex>,
    pub privilege: PrivilegeLevel,
    pub chainability: Chainability,
    pub stage: AwarenessStage,
    pub verbose: bool,
    pub func: HandlerFn<P>,
}

impl<P> HandlerDescriptor<P> {
    pub fn accepts(&self, kind: EventKind) -> bool {
        self.event_types
            .iter()
            .any(|t| *t == EventKind::Any || *t == kind)
    }

    /// Emits the load-time warning spec.md §4.1 recommends for a wildcard
    /// handler that is neither chainable nor terminating on ordinary
    /// CHAN/QUERY/NUMERIC events.
    pub fn warn_if_unsafe_wildcard(&self) {
        let is_wildcard = self.event_types.iter().any(|t| *t == EventKind::Any);
        let is_plain = matches!(self.chainability, Chainability::ImplicitTerminating);
        if is_wildcard && is_plain {
            tracing::warn!(
                handler = self.name,
                "wildcard handler is neither chainable nor terminating"
            );
        }
    }
}

/// The ordered, stage-bucketed set of handlers for one plugin instance.
pub struct Registry<P> {
    stages: [Vec<HandlerDescriptor<P>>; 5],
}

impl<P> Default for Registry<P> {
    fn default() -> Self {
        Registry {
            stages: [Vec::new(), Vec::new(), Vec::new(), Vec::new(), Vec::new()],
        }
    }
}

impl<P> Registry<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler to its declared stage, preserving registration
    /// order within that stage (spec.md §4.1 ordering guarantee).
    pub fn push(&mut self, descriptor: HandlerDescriptor<P>) {
        descriptor.warn_if_unsafe_wildcard();
        self.stages[descriptor.stage.index()].push(descriptor);
    }

    /// Iterates stages in setup → early → normal → late → cleanup order,
    /// each yielding its handlers in registration order.
    pub fn stages(&self) -> impl Iterator<Item = (AwarenessStage, &[HandlerDescriptor<P>])> {
        AwarenessStage::ALL
            .into_iter()
            .map(move |stage| (stage, self.stages[stage.index()].as_slice()))
    }

    /// Looks up a handler by its `(stage, index)` coordinate, used to
    /// re-resolve a queued [`TriggerRequest`](crate::privilege::TriggerRequest)
    /// without storing a closure that would alias the plugin instance.
    pub fn handler_at(&self, stage_index: usize, handler_index: usize) -> Option<&HandlerDescriptor<P>> {
        self.stages.get(stage_index)?.get(handler_index)
    }
}
