//! Ordered traversal of plugins and their handlers (spec.md §4.1).

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, SystemTime};

use crate::bus::Bus;
use crate::event::{Event, EventKind};
use crate::matcher;
use crate::outbound::{OutboundMessage, OutboundSink, SendFlags};
use crate::plugin::Plugin;
use crate::privilege::{self, PrivilegeLevel, TriggerRequest, Verdict};
use crate::registry::{AwarenessStage, ChannelPolicy, HandlerDescriptor, PrefixPolicy, Registry};

/// Marker panic payload signalling a Unicode-decode-style failure; a
/// handler invocation that panics with this value is retried once with a
/// sanitised event (spec.md §4.1, §7). Ordinary panics are caught, logged
/// at warning level, and the dispatcher moves on to the next handler.
#[derive(Debug)]
pub struct DecodeFailure;

/// Object-safe façade over a concrete `Instance<P>` so the dispatcher can
/// hold heterogeneous plugins in one ordered list, mirroring the teacher's
/// `Box<dyn Plugin>`/`Box<dyn Module>` erasure pattern
/// (`net/plugin/mod.rs`'s `PluginEntry { plugin: Box<dyn Plugin>, .. }`).
trait PluginRuntime {
    fn name(&self) -> &'static str;
    fn is_enabled(&self) -> bool;
    fn postprocess(&mut self, event: &mut Event);
    fn on_event(&mut self, event: &Event, env: &mut DispatchEnv<'_>);
    fn periodically(&mut self, now: SystemTime);
    fn next_periodical(&self) -> Option<SystemTime>;
    fn on_bus_message(&mut self, header: &str, payload: &dyn Any);
    fn drain_whois(&mut self, nickname: &str, reply_unsupported: bool, env: &mut DispatchEnv<'_>);
    fn wake_scheduler(&mut self, event: &Event);
    fn sweep_timed(&mut self, now: SystemTime);
    fn flush_outbound(&mut self, sink: &mut dyn OutboundSink);
}

/// Per-dispatch shared services handed to whichever plugin is currently
/// running: outbound sink and the connection-wide bus.
pub struct DispatchEnv<'a> {
    pub outbound: &'a mut dyn OutboundSink,
    pub bus: &'a mut Bus,
    pub whois_retry: Duration,
    pub now: SystemTime,
}

struct Instance<P: Plugin> {
    plugin: P,
    registry: Registry<P>,
}

impl<P: Plugin> PluginRuntime for Instance<P> {
    fn name(&self) -> &'static str {
        self.plugin.name()
    }

    fn is_enabled(&self) -> bool {
        self.plugin.is_enabled()
    }

    fn postprocess(&mut self, event: &mut Event) {
        self.plugin.postprocess(event);
    }

    fn on_event(&mut self, event: &Event, env: &mut DispatchEnv<'_>) {
        let own_nickname = self.plugin.state().client.nickname.clone();
        let global_prefix = self.plugin.state().bot.global_prefix.clone();
        let home_channels = self.plugin.state().bot.home_channels.clone();
        let home_channels_ok = move |channel: &Option<String>, policy: ChannelPolicy| -> bool {
            match (policy, channel) {
                (ChannelPolicy::Any, _) | (ChannelPolicy::Home, None) => true,
                (ChannelPolicy::Home, Some(chan)) => home_channels.iter().any(|c| c == chan),
            }
        };

        'stages: for (stage_index, stage) in AwarenessStage::ALL.iter().enumerate() {
            let handler_count = self.registry.stages().nth(stage_index).map_or(0, |(_, h)| h.len());
            for handler_index in 0..handler_count {
                let outcome = self.try_handler(stage_index, handler_index, event, env, &own_nickname, &global_prefix, &home_channels_ok);
                match outcome {
                    HandlerRunOutcome::Skip | HandlerRunOutcome::Continue => continue,
                    HandlerRunOutcome::Stop => break 'stages,
                }
            }
            let _ = stage;
        }
    }

    fn periodically(&mut self, now: SystemTime) {
        self.plugin.periodically(now);
    }

    fn next_periodical(&self) -> Option<SystemTime> {
        self.plugin.state().next_periodical
    }

    fn on_bus_message(&mut self, header: &str, payload: &dyn Any) {
        self.plugin.on_bus_message(header, payload);
    }

    fn drain_whois(&mut self, nickname: &str, reply_unsupported: bool, env: &mut DispatchEnv<'_>) {
        if reply_unsupported {
            // ERR_UNKNOWNCOMMAND for WHOIS: clear the entire queue (spec.md §4.3).
            self.plugin.state_mut().trigger_queue.clear();
            tracing::debug!(plugin = self.plugin.name(), "WHOIS unsupported, trigger queue cleared");
            return;
        }

        let Some(pending) = self.plugin.state_mut().trigger_queue.remove(nickname) else {
            return;
        };

        for request in pending {
            if request.is_expired(env.now, env.whois_retry) {
                continue;
            }
            let Some(sender) = self.plugin.state().users.get(nickname).cloned() else {
                continue;
            };
            let verdict = privilege::evaluate(request.privilege_level, &sender, env.now, env.whois_retry);
            if verdict == Verdict::Pass {
                invoke_by_coordinates(&mut self.plugin, &self.registry, request.stage_index, request.handler_index, &request.event);
            }
        }
    }

    fn wake_scheduler(&mut self, event: &Event) {
        self.plugin.state_mut().scheduler.wake_event(event.kind, event);
    }

    fn sweep_timed(&mut self, now: SystemTime) {
        let marker = Event::new(EventKind::Any, "");
        self.plugin.state_mut().scheduler.sweep_timed(now, &marker);
    }

    fn flush_outbound(&mut self, sink: &mut dyn OutboundSink) {
        for (message, flags) in self.plugin.state_mut().drain_outbound() {
            sink.push(message, flags);
        }
    }
}

enum HandlerRunOutcome {
    Continue,
    Skip,
    Stop,
}

fn invoke_by_coordinates<P: Plugin>(plugin: &mut P, registry: &Registry<P>, stage: usize, index: usize, event: &Event) {
    // `registry` and `plugin` are disjoint fields of `Instance<P>` at every
    // call site, so this never aliases `&mut P` — no closure capture, no
    // unsafe re-borrow, just a lookup against an immutable sibling field.
    if let Some(descriptor) = registry.handler_at(stage, index) {
        descriptor.func.invoke(plugin, event);
    }
}

impl<P: Plugin> Instance<P> {
    #[allow(clippy::too_many_arguments)]
    fn try_handler(
        &mut self,
        stage_index: usize,
        handler_index: usize,
        event: &Event,
        env: &mut DispatchEnv<'_>,
        own_nickname: &str,
        global_prefix: &str,
        home_channels_ok: &dyn Fn(&Option<String>, ChannelPolicy) -> bool,
    ) -> HandlerRunOutcome {
        let (event_types_match, channel_ok, privilege) = {
            let descriptor = match self.registry.handler_at(stage_index, handler_index) {
                Some(d) => d,
                None => return HandlerRunOutcome::Skip,
            };
            (
                descriptor.accepts(event.kind),
                home_channels_ok(&event.channel, descriptor.channel_policy),
                descriptor.privilege,
            )
        };

        if !event_types_match || !channel_ok {
            return HandlerRunOutcome::Skip;
        }

        let mut mut_event = event.clone();
        let prefix_and_command_ok = {
            let descriptor = self.registry.handler_at(stage_index, handler_index).expect("checked above");
            prefix_and_command_match(descriptor, &mut mut_event, own_nickname, global_prefix)
        };
        if !prefix_and_command_ok {
            return HandlerRunOutcome::Skip;
        }

        if privilege != PrivilegeLevel::Ignore {
            let sender = mut_event
                .sender
                .as_ref()
                .and_then(|nick| self.plugin.state().users.get(nick).cloned());
            let Some(sender) = sender else {
                return HandlerRunOutcome::Skip;
            };
            match privilege::evaluate(privilege, &sender, env.now, env.whois_retry) {
                Verdict::Pass => {}
                Verdict::Fail => return HandlerRunOutcome::Skip,
                Verdict::Whois => {
                    self.enqueue_whois(&sender.nickname, mut_event.clone(), privilege, stage_index, handler_index, env);
                    return HandlerRunOutcome::Skip;
                }
            }
        }

        self.invoke_with_retry(stage_index, handler_index, &mut_event);

        let descriptor = self.registry.handler_at(stage_index, handler_index).expect("checked above");
        if descriptor.chainability.falls_through() {
            HandlerRunOutcome::Continue
        } else {
            HandlerRunOutcome::Stop
        }
    }

    fn invoke_with_retry(&mut self, stage_index: usize, handler_index: usize, event: &Event) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            invoke_by_coordinates(&mut self.plugin, &self.registry, stage_index, handler_index, event);
        }));

        if let Err(payload) = outcome {
            if payload.downcast_ref::<DecodeFailure>().is_some() {
                let sanitised = event.sanitised();
                let retry = panic::catch_unwind(AssertUnwindSafe(|| {
                    invoke_by_coordinates(&mut self.plugin, &self.registry, stage_index, handler_index, &sanitised);
                }));
                if let Err(second) = retry {
                    tracing::warn!(plugin = self.plugin.name(), "handler panicked again after decode retry");
                    drop(second);
                }
            } else {
                tracing::warn!(plugin = self.plugin.name(), "handler panicked, skipping to next handler");
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn enqueue_whois(
        &mut self,
        nickname: &str,
        event: Event,
        level: PrivilegeLevel,
        stage_index: usize,
        handler_index: usize,
        env: &mut DispatchEnv<'_>,
    ) {
        if !self.plugin.state().server.supports_whois {
            // Platform lacks WHOIS: discard pending dependents for this
            // nickname silently (spec.md §4.3, §7).
            self.plugin.state_mut().trigger_queue.remove(nickname);
            tracing::debug!(plugin = self.plugin.name(), nickname, "WHOIS unsupported on this platform");
            return;
        }

        let request = TriggerRequest::new(event, level, env.now, stage_index, handler_index);
        self.plugin
            .state_mut()
            .trigger_queue
            .entry(nickname.to_string())
            .or_default()
            .push(request);

        env.outbound.push(
            OutboundMessage::Whois {
                nickname: nickname.to_string(),
            },
            SendFlags::default(),
        );
    }
}

fn prefix_and_command_match<P>(
    descriptor: &HandlerDescriptor<P>,
    event: &mut Event,
    own_nickname: &str,
    global_prefix: &str,
) -> bool {
    if !descriptor.command_words.is_empty() || matches!(descriptor.prefix_policy, PrefixPolicy::Direct) {
        if !matcher::apply_prefix(event, &descriptor.prefix_policy, own_nickname, global_prefix) {
            return false;
        }
    }

    let by_command = if descriptor.command_words.is_empty() {
        true
    } else {
        matcher::match_command_words(event, &descriptor.command_words)
    };

    if by_command {
        return true;
    }

    // Regex expressions are evaluated only if command words did not
    // already match (spec.md §4.1(c)).
    for regex in &descriptor.regexes {
        if matcher::match_regex(event, regex) {
            return true;
        }
    }

    descriptor.command_words.is_empty() && descriptor.regexes.is_empty()
}

/// The dispatch engine: a deterministically ordered list of plugins plus
/// the connection-wide bus (spec.md §4.1, §4.6).
pub struct Dispatcher {
    plugins: Vec<Box<dyn PluginRuntime>>,
    bus: Bus,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Dispatcher {
            plugins: Vec::new(),
            bus: Bus::new(),
        }
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plugin in traversal order. Plugins are dispatched in
    /// this registration order for every event (spec.md §4.1).
    pub fn register<P: Plugin>(&mut self, state: crate::state::PluginState) {
        let (plugin, registry) = P::construct(state);
        self.plugins.push(Box::new(Instance { plugin, registry }));
    }

    /// Routes one parsed event through every enabled plugin: postprocess,
    /// then onEvent, then scheduler wakeups, then bus delivery.
    pub fn dispatch(&mut self, mut event: Event, outbound: &mut dyn OutboundSink, whois_retry: Duration) {
        let now = SystemTime::now();

        for plugin in &mut self.plugins {
            if !plugin.is_enabled() {
                continue;
            }
            plugin.postprocess(&mut event);
        }

        for plugin in &mut self.plugins {
            if !plugin.is_enabled() {
                continue;
            }

            let mut env = DispatchEnv {
                outbound: &mut *outbound,
                bus: &mut self.bus,
                whois_retry,
                now,
            };
            plugin.on_event(&event, &mut env);
            plugin.flush_outbound(&mut *env.outbound);

            if matches!(event.kind, EventKind::Whois(_)) {
                if let Some(nickname) = event.sender.clone().or_else(|| event.target.clone()) {
                    let unsupported = matches!(event.kind, EventKind::Whois(crate::event::WhoisReply::UnknownCommand));
                    plugin.drain_whois(&nickname, unsupported, &mut env);
                    plugin.flush_outbound(&mut *env.outbound);
                }
            }

            plugin.wake_scheduler(&event);
            plugin.flush_outbound(&mut *env.outbound);
        }

        self.drain_bus();
    }

    /// Main-loop tick: sweeps timed continuations and fires any plugin
    /// whose `next_periodical` has passed (spec.md §4.5, called at least
    /// once per second).
    pub fn tick(&mut self, now: SystemTime, outbound: &mut dyn OutboundSink) {
        for plugin in &mut self.plugins {
            plugin.sweep_timed(now);
            plugin.flush_outbound(&mut *outbound);
            if let Some(next) = plugin.next_periodical() {
                if now >= next {
                    plugin.periodically(now);
                    plugin.flush_outbound(&mut *outbound);
                }
            }
        }
        self.drain_bus();
    }

    /// Drains the bus and hands each message to every plugin in
    /// registration order before the next event is dispatched (spec.md
    /// §4.6's "order is preserved per sender").
    fn drain_bus(&mut self) {
        let mut pending = Vec::new();
        self.bus.drain(|msg| pending.push(msg));
        for msg in &pending {
            for plugin in &mut self.plugins {
                if plugin.is_enabled() {
                    plugin.on_bus_message(msg.header, msg.payload.as_ref());
                }
            }
        }
    }
}
