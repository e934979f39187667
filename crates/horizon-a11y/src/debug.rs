//! Human-readable dumps of the accessible tree.
//!
//! ```
//! use horizon_a11y::{AccessibilityController, AccessibleTreeDebug};
//!
//! let controller = AccessibilityController::default();
//! tracing::debug!("{}", AccessibleTreeDebug::new().format(&controller));
//! ```

use std::collections::HashSet;

use crate::controller::AccessibilityController;
use crate::item::{AccessibleItem, ItemId, State};

/// Style options for tree visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// ASCII characters for tree branches.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
    /// Compact single-line representation.
    Compact,
}

/// Configuration for tree debug output.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    /// The style of tree visualization.
    pub style: TreeStyle,
    /// Whether to show item ids.
    pub show_ids: bool,
    /// Whether to show roles.
    pub show_roles: bool,
    /// Whether to show the states that are set.
    pub show_states: bool,
    /// Maximum depth to traverse (None for unlimited).
    pub max_depth: Option<usize>,
    /// Indent size for each level.
    pub indent_size: usize,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_ids: true,
            show_roles: true,
            show_states: false,
            max_depth: None,
            indent_size: 2,
        }
    }
}

impl TreeFormatOptions {
    /// Options for detailed output.
    pub fn detailed() -> Self {
        Self {
            show_states: true,
            ..Default::default()
        }
    }

    /// Options for names only.
    pub fn minimal() -> Self {
        Self {
            show_ids: false,
            show_roles: false,
            show_states: false,
            ..Default::default()
        }
    }
}

/// Formats the live accessible tree of a controller.
#[derive(Debug, Clone, Default)]
pub struct AccessibleTreeDebug {
    options: TreeFormatOptions,
}

impl AccessibleTreeDebug {
    /// Create a formatter with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a formatter with custom options.
    pub fn with_options(options: TreeFormatOptions) -> Self {
        Self { options }
    }

    /// Format the whole tree, starting at the root.
    pub fn format(&self, controller: &AccessibilityController) -> String {
        let mut output = format!(
            "Accessible Tree ({} registered items):\n",
            controller.registry().len()
        );
        if controller.is_registered(controller.root_id()) {
            let mut visited = HashSet::new();
            self.format_into(controller, controller.root_id(), 0, true, &mut visited, &mut output);
        } else {
            output.push_str("  (empty)\n");
        }
        output
    }

    /// Format the subtree under `root`.
    pub fn format_subtree(&self, controller: &AccessibilityController, root: ItemId) -> String {
        let mut output = String::new();
        let mut visited = HashSet::new();
        self.format_into(controller, root, 0, true, &mut visited, &mut output);
        output
    }

    fn format_into(
        &self,
        controller: &AccessibilityController,
        id: ItemId,
        depth: usize,
        is_last: bool,
        visited: &mut HashSet<ItemId>,
        output: &mut String,
    ) {
        if self.options.max_depth.is_some_and(|max| depth > max) {
            return;
        }
        let Some(item) = controller.item(id) else {
            return;
        };

        output.push_str(&self.build_prefix(depth, is_last));
        // A child list that leads back to an item already shown.
        if !visited.insert(id) {
            output.push_str(&format!("{id} (cycle)\n"));
            return;
        }
        let name = item.accessible_name();
        output.push_str(if name.is_empty() { "(unnamed)" } else { &name });

        if self.options.show_ids {
            output.push_str(&format!(" [{id}]"));
        }
        if self.options.show_roles {
            output.push_str(&format!(" ({:?})", item.accessible_role()));
        }
        if self.options.show_states {
            let states = set_states(item.as_ref());
            if !states.is_empty() {
                output.push_str(&format!(" {{{}}}", states.join(", ")));
            }
        }
        if controller.last_focused() == Some(id) {
            output.push_str(" *");
        }
        output.push('\n');

        let navigator = controller.navigator();
        let children: Vec<ItemId> = (0..item.accessible_child_count())
            .filter_map(|i| navigator.child_of(id, i))
            .map(|handle| handle.id())
            .collect();
        let count = children.len();
        for (i, child) in children.into_iter().enumerate() {
            self.format_into(controller, child, depth + 1, i + 1 == count, visited, output);
        }
    }

    fn build_prefix(&self, depth: usize, is_last: bool) -> String {
        if depth == 0 {
            return String::new();
        }

        let (branch, corner, last) = match self.options.style {
            TreeStyle::Ascii => ("|", "+-- ", "`-- "),
            TreeStyle::Unicode => ("\u{2502}", "\u{251c}\u{2500}\u{2500} ", "\u{2514}\u{2500}\u{2500} "),
            TreeStyle::Compact => ("", "- ", "- "),
        };

        let mut prefix = String::new();
        for _ in 0..(depth - 1) {
            prefix.push_str(branch);
            prefix.push_str(&" ".repeat(self.options.indent_size));
        }
        prefix.push_str(if is_last { last } else { corner });
        prefix
    }
}

fn set_states(item: &dyn AccessibleItem) -> Vec<String> {
    State::ALL
        .into_iter()
        .filter(|&state| item.accessible_state(state))
        .map(|state| format!("{state:?}"))
        .collect()
}
