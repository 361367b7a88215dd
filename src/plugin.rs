//! Plugin lifecycle (spec.md §4.7): construct, load-settings,
//! init-resources, start, per-event, periodic, reload, teardown.

use std::any::Any;
use std::collections::HashMap;
use std::time::SystemTime;

use crate::error::{CoreError, SettingsIssue};
use crate::event::Event;
use crate::registry::Registry;
use crate::settings::CommandInfo;
use crate::state::PluginState;

/// A plugin definition. Implementors register their handlers once, at
/// construction, into a [`Registry<Self>`] — the dispatcher never
/// re-derives handler order at runtime (spec.md §9). Each plugin owns its
/// [`PluginState`] exclusively (spec.md §3 Ownership); `state`/`state_mut`
/// are the seam handlers and the dispatcher reach it through, since
/// handler closures are declared as `Fn(&mut P, ...)` and need a single
/// owned value to borrow from.
pub trait Plugin: Sized + 'static {
    /// Stable identifier used in logs and the help surface.
    fn name(&self) -> &'static str;

    /// Builds the plugin and its handler registry against fresh state.
    fn construct(state: PluginState) -> (Self, Registry<Self>);

    fn state(&self) -> &PluginState;
    fn state_mut(&mut self) -> &mut PluginState;

    /// Melds a config file's `[section]` into this plugin's settings,
    /// reporting missing/invalid keys without failing (spec.md §4.7, §7).
    fn read_settings(&mut self, section: &HashMap<String, String>) -> Vec<SettingsIssue> {
        let _ = section;
        Vec::new()
    }

    /// Opens resource files, pools, or other handles the plugin needs.
    /// Failure here is the one lifecycle error that may propagate to the
    /// program entry point (spec.md §7).
    fn init_resources(&mut self) -> Result<(), CoreError> {
        Ok(())
    }

    fn start(&mut self) {}

    fn set_setting_by_name(&mut self, name: &str, value: &str) -> bool {
        let _ = (name, value);
        false
    }

    fn serialise_settings(&self) -> HashMap<String, String> {
        HashMap::new()
    }

    fn print_settings(&self) {}

    fn reload(&mut self) {}

    fn teardown(&mut self) {}

    /// The command surface this plugin contributes to the aggregated
    /// help listing (spec.md §6).
    fn commands(&self) -> Vec<CommandInfo> {
        Vec::new()
    }

    /// Whether this plugin is currently active; driven by a designated
    /// boolean inside the plugin's settings struct (spec.md §4.7).
    fn is_enabled(&self) -> bool {
        true
    }

    /// May mutate the event; visible to subsequent plugins and handlers
    /// of this event (spec.md §4.1). Must not re-dispatch.
    fn postprocess(&mut self, event: &mut Event) {
        let _ = event;
    }

    /// Fired when `now >= state().next_periodical`; the plugin is
    /// expected to advance `next_periodical` itself (spec.md §4.5).
    fn periodically(&mut self, now: SystemTime) {
        let _ = now;
    }

    /// Filters by `header` and downcasts `payload` to a known concrete
    /// type (spec.md §4.6).
    fn on_bus_message(&mut self, header: &str, payload: &dyn Any) {
        let _ = (header, payload);
    }
}
