//! Quick-reply option sets.
//!
//! At most one set is live at a time and it always belongs to the latest
//! bot turn. Sending any reply, typed or chosen, clears it.

use crate::protocol::QuickReply;
use crate::view::OptionsView;

#[derive(Debug, Clone, Default)]
pub struct OptionDispatcher {
    active: Vec<QuickReply>,
}

impl OptionDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the live set with `options`. An empty slice just clears.
    pub fn show_options<V: OptionsView + ?Sized>(&mut self, view: &mut V, options: &[QuickReply]) {
        self.clear_options(view);
        if options.is_empty() {
            return;
        }
        self.active = options.to_vec();
        view.render_options(&self.active);
    }

    pub fn clear_options<V: OptionsView + ?Sized>(&mut self, view: &mut V) {
        self.active.clear();
        view.clear_options();
    }

    pub fn active(&self) -> &[QuickReply] {
        &self.active
    }

    /// Resolve a control by its position in the live set.
    pub fn get(&self, index: usize) -> Option<&QuickReply> {
        self.active.get(index)
    }
}
