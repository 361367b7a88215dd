//! User records and classification (spec.md §3).

use std::time::{Duration, SystemTime};

/// Ascending privilege classification. Ordering is derived so that
/// `class >= UserClass::Registered` reads naturally in the privilege
/// filter (spec.md §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UserClass {
    Unset,
    Blacklist,
    Anyone,
    Registered,
    Whitelist,
    Operator,
    Admin,
}

impl Default for UserClass {
    fn default() -> Self {
        UserClass::Unset
    }
}

/// A tracked user. `nickname` uniquely indexes a [`PluginState`](crate::state::PluginState)'s
/// users map.
#[derive(Debug, Clone)]
pub struct User {
    pub nickname: String,
    pub ident: String,
    pub address: String,
    /// Services login; empty if unknown.
    pub account: String,
    pub alias: String,
    pub class: UserClass,
    pub last_whois: Option<SystemTime>,
    pub badges: Vec<String>,
    pub colour: Option<String>,
}

impl User {
    pub fn new(nickname: impl Into<String>) -> Self {
        User {
            nickname: nickname.into(),
            ident: String::new(),
            address: String::new(),
            account: String::new(),
            alias: String::new(),
            class: UserClass::Unset,
            last_whois: None,
            badges: Vec::new(),
            colour: None,
        }
    }

    pub fn has_account(&self) -> bool {
        !self.account.is_empty()
    }

    /// Whether a cached WHOIS (or the lack of one) has expired against
    /// `whois_retry`, per spec.md §4.3.
    pub fn whois_expired(&self, now: SystemTime, whois_retry: Duration) -> bool {
        match self.last_whois {
            None => true,
            Some(t) => now.duration_since(t).unwrap_or(Duration::ZERO) >= whois_retry,
        }
    }

    /// Melds facts learned from a WHOIS/WHO/CHGHOST reply into this record,
    /// overwriting only fields the reply actually carries (spec.md §4.4).
    pub fn meld_identity(&mut self, ident: Option<&str>, address: Option<&str>, account: Option<&str>) {
        if let Some(ident) = ident {
            self.ident = ident.to_string();
        }
        if let Some(address) = address {
            self.address = address.to_string();
        }
        if let Some(account) = account {
            self.account = account.to_string();
        }
    }
}
