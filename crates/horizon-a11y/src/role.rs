//! Accessibility roles and the per-platform role table.

use accesskit::Role as NativeRole;
use serde::{Deserialize, Serialize};

/// The accessibility role of an item.
///
/// This is a closed set. Platform-specific presentation is decided by
/// [`Role::to_accesskit_role`], the only place that varies per target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Role {
    /// No specific role.
    #[default]
    NoRole,
    /// The application root.
    Application,
    /// A dialog box.
    Dialog,
    /// A panel grouping related controls.
    Panel,
    /// A push button.
    Button,
    /// A radio button.
    RadioButton,
    /// A checkbox.
    CheckBox,
    /// A combo box / dropdown.
    ComboBox,
    /// An editable text field.
    EditableText,
    /// A static text label.
    StaticText,
    /// A list of items.
    List,
    /// An item within a list.
    ListItem,
    /// A menu item.
    MenuItem,
    /// A spin box for numeric input.
    SpinBox,
    /// A ranged value control such as a slider.
    Range,
    /// A group of related items.
    Group,
    /// Read-only information.
    Information,
    /// A rich content element that describes itself through
    /// screen-reader info and extra info.
    ElementOnScore,
    /// A focusable item that should not be announced by role.
    SilentRole,
}

impl Role {
    /// Whether items with this role can take keyboard focus.
    pub fn is_focusable(self) -> bool {
        !matches!(
            self,
            Role::NoRole | Role::Application | Role::Dialog | Role::Panel | Role::List
        )
    }

    /// Whether items with this role carry a checked state.
    pub fn is_checkable(self) -> bool {
        matches!(self, Role::CheckBox | Role::RadioButton)
    }

    /// Whether items with this role carry a selected state.
    pub fn is_selectable(self) -> bool {
        matches!(self, Role::ListItem)
    }

    /// Whether items with this role expose an active state.
    pub fn reports_active(self) -> bool {
        matches!(self, Role::Dialog | Role::Panel | Role::List)
    }

    /// Convert to AccessKit's role for the given platform.
    pub fn to_accesskit_role(self, platform: Platform) -> NativeRole {
        match self {
            Role::NoRole => NativeRole::Unknown,
            Role::Application => NativeRole::Application,
            Role::Dialog => NativeRole::Dialog,
            Role::Panel => match platform {
                Platform::Windows => NativeRole::Label,
                _ => NativeRole::Pane,
            },
            Role::StaticText => NativeRole::Label,
            Role::SilentRole => match platform {
                Platform::MacOs => NativeRole::Label,
                _ => NativeRole::ListItem,
            },
            Role::EditableText => NativeRole::TextInput,
            Role::Button => NativeRole::Button,
            Role::CheckBox => NativeRole::CheckBox,
            Role::RadioButton => NativeRole::RadioButton,
            Role::ComboBox => NativeRole::ComboBox,
            Role::List => NativeRole::List,
            Role::ListItem => NativeRole::ListItem,
            Role::MenuItem => NativeRole::MenuItem,
            Role::SpinBox => NativeRole::SpinButton,
            Role::Range => NativeRole::Slider,
            Role::Group | Role::Information | Role::ElementOnScore => match platform {
                Platform::Windows => NativeRole::Label,
                _ => NativeRole::GenericContainer,
            },
        }
    }
}

/// The platform whose accessibility conventions the mapping tables follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Linux (AT-SPI).
    Linux,
    /// macOS (NSAccessibility).
    #[serde(rename = "macos")]
    MacOs,
    /// Windows (UI Automation).
    Windows,
    /// Anything else; follows the Linux conventions.
    Other,
}

impl Platform {
    /// The platform this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "linux") {
            Platform::Linux
        } else {
            Platform::Other
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::current()
    }
}
