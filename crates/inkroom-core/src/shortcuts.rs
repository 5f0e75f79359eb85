//! Keyboard shortcut registry and dispatch.

use serde::{Deserialize, Serialize};

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    /// Cmd on macOS. Treated like Ctrl for shortcuts.
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub const CTRL: Modifiers = Modifiers {
        ctrl: true,
        ..Modifiers::NONE
    };

    pub const CTRL_SHIFT: Modifiers = Modifiers {
        ctrl: true,
        shift: true,
        ..Modifiers::NONE
    };

    /// Ctrl or Cmd.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// What a shortcut does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShortcutAction {
    Undo,
    Redo,
    /// Close text editing.
    Dismiss,
}

/// A keyboard shortcut definition.
#[derive(Debug, Clone)]
pub struct Shortcut {
    pub key: &'static str,
    pub ctrl: bool,
    pub shift: bool,
    pub action: ShortcutAction,
    pub description: &'static str,
}

impl Shortcut {
    pub const fn new(
        key: &'static str,
        ctrl: bool,
        shift: bool,
        action: ShortcutAction,
        description: &'static str,
    ) -> Self {
        Self {
            key,
            ctrl,
            shift,
            action,
            description,
        }
    }

    /// Format the shortcut for display (e.g., "Ctrl+Z").
    pub fn format(&self) -> String {
        let mut parts = Vec::new();
        if self.ctrl {
            parts.push("Ctrl");
        }
        if self.shift {
            parts.push("Shift");
        }
        parts.push(self.key);
        parts.join("+")
    }

    /// Check whether a key press triggers this shortcut. Letter keys match
    /// case-insensitively since Shift changes the reported key.
    pub fn matches(&self, key: &str, modifiers: Modifiers) -> bool {
        self.key.eq_ignore_ascii_case(key) && self.ctrl == modifiers.command() && self.shift == modifiers.shift
    }
}

/// Registry of all keyboard shortcuts.
pub struct ShortcutRegistry;

impl ShortcutRegistry {
    /// Get all registered shortcuts.
    pub fn all() -> Vec<Shortcut> {
        vec![
            Shortcut::new("Z", true, false, ShortcutAction::Undo, "Undo"),
            Shortcut::new("Z", true, true, ShortcutAction::Redo, "Redo"),
            Shortcut::new("Y", true, false, ShortcutAction::Redo, "Redo"),
            Shortcut::new("Escape", false, false, ShortcutAction::Dismiss, "Close text editing"),
        ]
    }

    /// Find the action bound to a key press.
    pub fn lookup(key: &str, modifiers: Modifiers) -> Option<ShortcutAction> {
        Self::all()
            .into_iter()
            .find(|shortcut| shortcut.matches(key, modifiers))
            .map(|shortcut| shortcut.action)
    }

    /// Human-readable list, one shortcut per line.
    pub fn describe() -> String {
        Self::all()
            .iter()
            .map(|shortcut| format!("{:20} {}", shortcut.format(), shortcut.description))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undo_redo_bindings() {
        assert_eq!(ShortcutRegistry::lookup("z", Modifiers::CTRL), Some(ShortcutAction::Undo));
        assert_eq!(ShortcutRegistry::lookup("Z", Modifiers::CTRL_SHIFT), Some(ShortcutAction::Redo));
        assert_eq!(ShortcutRegistry::lookup("y", Modifiers::CTRL), Some(ShortcutAction::Redo));
        assert_eq!(ShortcutRegistry::lookup("z", Modifiers::NONE), None);
    }

    #[test]
    fn test_cmd_acts_as_ctrl() {
        let cmd = Modifiers {
            meta: true,
            ..Modifiers::default()
        };
        assert_eq!(ShortcutRegistry::lookup("z", cmd), Some(ShortcutAction::Undo));
    }

    #[test]
    fn test_escape() {
        assert_eq!(ShortcutRegistry::lookup("Escape", Modifiers::NONE), Some(ShortcutAction::Dismiss));
        assert_eq!(ShortcutRegistry::lookup("Escape", Modifiers::CTRL), None);
    }

    #[test]
    fn test_format() {
        let shortcuts = ShortcutRegistry::all();
        assert_eq!(shortcuts[1].format(), "Ctrl+Shift+Z");
        assert!(ShortcutRegistry::describe().contains("Close text editing"));
    }
}
