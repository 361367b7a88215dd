//! Privilege filter and the WHOIS replay queue (spec.md §4.3).

use std::time::{Duration, SystemTime};

use crate::event::Event;
use crate::user::{User, UserClass};

/// Ascending privilege levels a handler may require. `Ignore` always
/// passes, even for blacklisted senders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PrivilegeLevel {
    Ignore,
    Anyone,
    Registered,
    Whitelist,
    Operator,
    Admin,
}

/// The result of evaluating a handler's required [`PrivilegeLevel`]
/// against a sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
    Whois,
}

/// Evaluates spec.md §4.3's decision table.
///
/// `now` and `whois_retry` gate cache freshness; callers pass the wall
/// clock and the configured retry window.
pub fn evaluate(
    level: PrivilegeLevel,
    sender: &User,
    now: SystemTime,
    whois_retry: Duration,
) -> Verdict {
    if level == PrivilegeLevel::Ignore {
        return Verdict::Pass;
    }
    if sender.class == UserClass::Blacklist {
        return Verdict::Fail;
    }

    let expired = sender.whois_expired(now, whois_retry);

    if sender.has_account() {
        let class_level = match sender.class {
            UserClass::Admin => PrivilegeLevel::Admin,
            UserClass::Operator => PrivilegeLevel::Operator,
            UserClass::Whitelist => PrivilegeLevel::Whitelist,
            _ => PrivilegeLevel::Registered,
        };
        if level <= class_level {
            if level == PrivilegeLevel::Anyone && expired {
                return Verdict::Whois;
            }
            return Verdict::Pass;
        }
        // A non-empty account always satisfies `Registered` and `Anyone`,
        // regardless of class, per spec.md §4.3.
        if level == PrivilegeLevel::Registered || level == PrivilegeLevel::Anyone {
            return if expired && level == PrivilegeLevel::Anyone {
                Verdict::Whois
            } else {
                Verdict::Pass
            };
        }
        return Verdict::Fail;
    }

    match level {
        PrivilegeLevel::Anyone => {
            if expired {
                Verdict::Whois
            } else {
                Verdict::Pass
            }
        }
        _ => {
            if expired {
                Verdict::Whois
            } else {
                Verdict::Fail
            }
        }
    }
}

/// A deferred handler invocation, queued when the privilege filter
/// returns [`Verdict::Whois`] (spec.md §3 `TriggerRequest`).
///
/// Rather than a pre-bound closure over the handler's arguments (which in
/// a single-owner Rust plugin would alias the very plugin instance the
/// trigger queue lives inside of), `replay()` is re-resolved through the
/// originating handler's `(stage, index)` coordinates in the plugin's
/// [`Registry`](crate::registry::Registry) — the dispatcher looks the
/// descriptor back up and invokes it directly against the live `&mut P`
/// it already holds. This still satisfies spec.md §9's "tagged variants
/// with a single `invoke(plugin, event)` dispatcher": the tag here is the
/// `(stage, index)` coordinate instead of a closure capture.
#[derive(Debug, Clone)]
pub struct TriggerRequest {
    pub event: Event,
    pub privilege_level: PrivilegeLevel,
    pub enqueued_at: SystemTime,
    pub stage_index: usize,
    pub handler_index: usize,
}

impl TriggerRequest {
    pub fn new(
        event: Event,
        privilege_level: PrivilegeLevel,
        enqueued_at: SystemTime,
        stage_index: usize,
        handler_index: usize,
    ) -> Self {
        TriggerRequest {
            event,
            privilege_level,
            enqueued_at,
            stage_index,
            handler_index,
        }
    }

    pub fn is_expired(&self, now: SystemTime, whois_retry: Duration) -> bool {
        now.duration_since(self.enqueued_at).unwrap_or(Duration::ZERO) >= whois_retry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(class: UserClass, account: &str, last_whois: Option<SystemTime>) -> User {
        User {
            nickname: "alice".to_string(),
            ident: String::new(),
            address: String::new(),
            account: account.to_string(),
            alias: String::new(),
            class,
            last_whois,
            badges: Vec::new(),
            colour: None,
        }
    }

    #[test]
    fn ignore_always_passes_even_for_blacklist() {
        let sender = user(UserClass::Blacklist, "", None);
        let verdict = evaluate(PrivilegeLevel::Ignore, &sender, SystemTime::now(), Duration::from_secs(300));
        assert_eq!(verdict, Verdict::Pass);
    }

    #[test]
    fn blacklisted_sender_fails_any_real_level() {
        let sender = user(UserClass::Blacklist, "alice_acct", Some(SystemTime::now()));
        let verdict = evaluate(PrivilegeLevel::Anyone, &sender, SystemTime::now(), Duration::from_secs(300));
        assert_eq!(verdict, Verdict::Fail);
    }

    #[test]
    fn unknown_identity_requires_whois_before_registered_check() {
        let sender = user(UserClass::Unset, "", None);
        let verdict = evaluate(PrivilegeLevel::Registered, &sender, SystemTime::now(), Duration::from_secs(300));
        assert_eq!(verdict, Verdict::Whois);
    }

    #[test]
    fn expired_whois_on_anyone_refreshes_but_still_passes_once_known() {
        let stale = SystemTime::now() - Duration::from_secs(600);
        let sender = user(UserClass::Registered, "alice_acct", Some(stale));
        let verdict = evaluate(PrivilegeLevel::Anyone, &sender, SystemTime::now(), Duration::from_secs(300));
        assert_eq!(verdict, Verdict::Whois);
    }

    #[test]
    fn fresh_whitelist_account_passes_whitelist_level() {
        let sender = user(UserClass::Whitelist, "alice_acct", Some(SystemTime::now()));
        let verdict = evaluate(PrivilegeLevel::Whitelist, &sender, SystemTime::now(), Duration::from_secs(300));
        assert_eq!(verdict, Verdict::Pass);
    }

    #[test]
    fn account_below_required_class_fails() {
        let sender = user(UserClass::Registered, "alice_acct", Some(SystemTime::now()));
        let verdict = evaluate(PrivilegeLevel::Operator, &sender, SystemTime::now(), Duration::from_secs(300));
        assert_eq!(verdict, Verdict::Fail);
    }

    #[test]
    fn trigger_request_expires_after_whois_retry_elapses() {
        let enqueued_at = SystemTime::now() - Duration::from_secs(400);
        let request = TriggerRequest::new(Event::new(crate::event::EventKind::Chan, "hi"), PrivilegeLevel::Registered, enqueued_at, 0, 0);
        assert!(request.is_expired(SystemTime::now(), Duration::from_secs(300)));
    }
}
