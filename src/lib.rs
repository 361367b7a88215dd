//! Plugin dispatch and coordination core for an IRC client/bot.
//!
//! This crate owns event routing, declarative handler predicates,
//! privilege filtering with WHOIS replay, awareness layers, a cooperative
//! scheduler and bus messaging. Protocol parsing, wire I/O and individual
//! plugin business logic live outside this crate.

pub mod bus;
pub mod channel;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod matcher;
pub mod outbound;
pub mod plugin;
pub mod privilege;
pub mod registry;
pub mod scheduler;
pub mod settings;
pub mod state;
pub mod user;

pub mod awareness;

pub use bus::Bus;
pub use channel::{Channel, ModeValue};
pub use dispatcher::Dispatcher;
pub use error::{CoreError, SettingsIssue};
pub use event::{CtcpKind, Event, EventKind, PlatformKind, WhoisReply};
pub use outbound::OutboundMessage;
pub use plugin::Plugin;
pub use privilege::{PrivilegeLevel, TriggerRequest};
pub use registry::{AwarenessStage, ChannelPolicy, Chainability, HandlerDescriptor, PrefixPolicy};
pub use scheduler::Scheduler;
pub use state::PluginState;
pub use user::{User, UserClass};

/// Installs a `tracing` subscriber reading `FINCH_LOG`/`RUST_LOG`.
///
/// Mirrors the teacher's habit of an explicit, opt-in logging init rather
/// than a `ctor`-style implicit install; callers decide when to call this.
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    let filter = EnvFilter::try_from_env("FINCH_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
