#![forbid(unsafe_code)]

use ftui::prelude::*;
use ftui::KeyEventKind;

/// Terminal key reduced to what the browser distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Esc,
    Up,
    Down,
    Left,
    Right,
    Backspace,
    PageUp,
    PageDown,
    CtrlC,
}

impl Key {
    /// Only presses count; repeats and releases are dropped.
    pub fn from_event(event: &KeyEvent) -> Option<Key> {
        if event.kind != KeyEventKind::Press {
            return None;
        }
        let key = match event.code {
            KeyCode::Char('c') if event.modifiers.contains(Modifiers::CTRL) => Key::CtrlC,
            KeyCode::Char(_) if event.modifiers.contains(Modifiers::CTRL) => return None,
            KeyCode::Char(ch) => Key::Char(ch),
            KeyCode::Enter => Key::Enter,
            KeyCode::Escape => Key::Esc,
            KeyCode::Up => Key::Up,
            KeyCode::Down => Key::Down,
            KeyCode::Left => Key::Left,
            KeyCode::Right => Key::Right,
            KeyCode::Backspace => Key::Backspace,
            KeyCode::PageUp => Key::PageUp,
            KeyCode::PageDown => Key::PageDown,
            _ => return None,
        };
        Some(key)
    }
}

/// The semantic input vocabulary the views react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Select,
    Up,
    Down,
    Ascend,
    Descend,
    Create,
    Delete,
    Edit,
    Back,
    Filter,
    PageUp,
    PageDown,
}

pub struct Binding {
    pub keys: &'static [Key],
    pub label: &'static str,
    pub action: Action,
}

pub const BINDINGS: &[Binding] = &[
    Binding { keys: &[Key::Char('q'), Key::CtrlC], label: "q", action: Action::Quit },
    Binding { keys: &[Key::Enter], label: "enter", action: Action::Select },
    Binding { keys: &[Key::Char('k'), Key::Up], label: "k/↑", action: Action::Up },
    Binding { keys: &[Key::Char('j'), Key::Down], label: "j/↓", action: Action::Down },
    Binding { keys: &[Key::Char('h'), Key::Left], label: "h/←", action: Action::Ascend },
    Binding { keys: &[Key::Char('l'), Key::Right], label: "l/→", action: Action::Descend },
    Binding { keys: &[Key::Char('c')], label: "c", action: Action::Create },
    Binding { keys: &[Key::Char('d')], label: "d", action: Action::Delete },
    Binding { keys: &[Key::Char('e')], label: "e", action: Action::Edit },
    Binding { keys: &[Key::Esc], label: "esc", action: Action::Back },
    Binding { keys: &[Key::Char('/')], label: "/", action: Action::Filter },
    Binding { keys: &[Key::PageUp], label: "pgup", action: Action::PageUp },
    Binding { keys: &[Key::PageDown], label: "pgdn", action: Action::PageDown },
];

pub fn action_for(key: Key) -> Option<Action> {
    BINDINGS
        .iter()
        .find(|binding| binding.keys.contains(&key))
        .map(|binding| binding.action)
}

pub fn label_for(action: Action) -> &'static str {
    BINDINGS
        .iter()
        .find(|binding| binding.action == action)
        .map(|binding| binding.label)
        .unwrap_or("?")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vim_and_arrow_keys_share_actions() {
        assert_eq!(action_for(Key::Char('k')), Some(Action::Up));
        assert_eq!(action_for(Key::Up), Some(Action::Up));
        assert_eq!(action_for(Key::Char('h')), Some(Action::Ascend));
        assert_eq!(action_for(Key::Right), Some(Action::Descend));
        assert_eq!(action_for(Key::CtrlC), Some(Action::Quit));
        assert_eq!(action_for(Key::Char('z')), None);
    }

    #[test]
    fn every_action_has_a_label() {
        for binding in BINDINGS {
            assert_ne!(label_for(binding.action), "?");
        }
    }

    #[test]
    fn no_key_is_bound_twice() {
        let mut seen = Vec::new();
        for binding in BINDINGS {
            for key in binding.keys {
                assert!(!seen.contains(key), "{key:?} bound twice");
                seen.push(*key);
            }
        }
    }
}
