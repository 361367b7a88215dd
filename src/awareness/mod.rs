//! Awareness layers: reusable handler sets a plugin registers into its own
//! [`Registry`](crate::registry::Registry) (spec.md §4.4). Each layer is a
//! plain function, not a trait object — it borrows nothing from the
//! plugin beyond what `Plugin::state_mut` already exposes, so it composes
//! the same way the teacher composes independent `add_plugin` calls
//! (`net/plugin/mod.rs`) rather than through inheritance.

mod auth;
mod channel;
mod platform;
mod user;

pub use auth::register_minimal_authentication;
pub use channel::register_channel_awareness;
pub use platform::register_platform_awareness;
pub use user::register_user_awareness;

/// Numeric reply codes the awareness layers key off. Named here rather
/// than inline so the handler registrations below read like the prose in
/// spec.md §4.4. A few (WHOIS-family, `ERR_UNKNOWNCOMMAND`) document the
/// wire codes the parser collaborator maps to `EventKind::Whois(..)`
/// before this crate ever sees them, so they're unused internally.
#[allow(dead_code)]
mod numeric {
    pub const RPL_WHOISUSER: u16 = 311;
    pub const RPL_ENDOFWHO: u16 = 315;
    pub const RPL_WHOISREGNICK: u16 = 307;
    pub const RPL_WHOISACCOUNT: u16 = 330;
    pub const RPL_ENDOFWHOIS: u16 = 318;
    pub const RPL_CHANNELMODEIS: u16 = 324;
    pub const RPL_TOPIC: u16 = 332;
    pub const RPL_CREATIONTIME: u16 = 333;
    pub const RPL_NAMREPLY: u16 = 353;
    pub const RPL_ENDOFNAMES: u16 = 366;
    pub const RPL_EXCEPTLIST: u16 = 348;
    pub const RPL_INVITELIST: u16 = 346;
    pub const RPL_BANLIST: u16 = 367;
    pub const RPL_REOPLIST: u16 = 344;
    pub const RPL_QUIETLIST: u16 = 728;
    pub const ERR_UNKNOWNCOMMAND: u16 = 421;
}
