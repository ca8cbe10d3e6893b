use crate::models::{Action, InputKind, KeyCode, Modifiers, MouseButton, RawInput};
use indexmap::IndexSet;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

/// Translates a key press into the characters it produces.
///
/// Implementations are best-effort: an unknown code or a failed lookup
/// yields an empty vector, never an error.
pub trait CharTranslator: Send + Sync {
    fn translate(&self, code: KeyCode, modifiers: Modifiers) -> Vec<char>;
}

/// US keyboard layout over Windows-style virtual key codes.
///
/// Produces nothing while Control, Alt or Super is held so shortcuts never
/// leak into the character queue.
#[derive(Debug, Default, Clone, Copy)]
pub struct UsLayoutTranslator;

impl CharTranslator for UsLayoutTranslator {
    fn translate(&self, code: KeyCode, modifiers: Modifiers) -> Vec<char> {
        if modifiers.intersects(Modifiers::CONTROL | Modifiers::ALT | Modifiers::SUPER) {
            return Vec::new();
        }
        let shift = modifiers.is_shift_down();
        let ch = match code {
            0x41..=0x5A => {
                let c = char::from(code as u8);
                Some(if shift { c } else { c.to_ascii_lowercase() })
            }
            0x30..=0x39 if !shift => Some(char::from(code as u8)),
            0x30..=0x39 => {
                const SHIFTED: [char; 10] = [')', '!', '@', '#', '$', '%', '^', '&', '*', '('];
                Some(SHIFTED[usize::from(code - 0x30)])
            }
            0x60..=0x69 => Some(char::from(b'0' + (code - 0x60) as u8)),
            0x20 => Some(' '),
            0x0D => Some('\r'),
            0x09 => Some('\t'),
            0xBA => Some(if shift { ':' } else { ';' }),
            0xBB => Some(if shift { '+' } else { '=' }),
            0xBC => Some(if shift { '<' } else { ',' }),
            0xBD => Some(if shift { '_' } else { '-' }),
            0xBE => Some(if shift { '>' } else { '.' }),
            0xBF => Some(if shift { '?' } else { '/' }),
            0xC0 => Some(if shift { '~' } else { '`' }),
            0xDB => Some(if shift { '{' } else { '[' }),
            0xDC => Some(if shift { '|' } else { '\\' }),
            0xDD => Some(if shift { '}' } else { ']' }),
            0xDE => Some(if shift { '"' } else { '\'' }),
            _ => None,
        };
        ch.into_iter().collect()
    }
}

#[derive(Debug, Default)]
struct KeyState {
    held: IndexSet<KeyCode>,
    pressed_once: HashSet<KeyCode>,
    released_once: HashSet<KeyCode>,
    repeat: HashSet<KeyCode>,
    press_queue: VecDeque<KeyCode>,
    char_queue: VecDeque<char>,
    /// Last observed mask from either a key or a mouse notification.
    modifiers: Modifiers,
}

impl KeyState {
    fn reset_edges(&mut self) {
        self.pressed_once.clear();
        self.released_once.clear();
        self.repeat.clear();
        self.press_queue.clear();
        self.char_queue.clear();
    }
}

#[derive(Debug, Default)]
struct MouseState {
    held: IndexSet<MouseButton>,
    pressed_once: HashSet<MouseButton>,
    released_once: HashSet<MouseButton>,
    position: (i32, i32),
}

impl MouseState {
    fn reset_edges(&mut self) {
        self.pressed_once.clear();
        self.released_once.clear();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Derives held / pressed / released / repeat state from raw down/up notifications.
///
/// Keyboard and mouse state sit behind independent mutexes. Whenever both are
/// needed at once they are taken mouse first, then keys; the producer path
/// never holds both at the same time.
///
/// Edge flags and the two FIFOs are only meaningful between two consecutive
/// [`reset`](Self::reset) calls; held sets and the mouse position survive a reset.
pub struct InputStateTracker {
    keys: Mutex<KeyState>,
    mouse: Mutex<MouseState>,
    translator: Arc<dyn CharTranslator>,
}

impl InputStateTracker {
    pub fn new() -> Self {
        Self::with_translator(Arc::new(UsLayoutTranslator))
    }

    pub fn with_translator(translator: Arc<dyn CharTranslator>) -> Self {
        Self {
            keys: Mutex::new(KeyState::default()),
            mouse: Mutex::new(MouseState::default()),
            translator,
        }
    }

    /// Apply one raw notification. Called synchronously on the UI-owning thread.
    pub fn on_raw_input(&self, input: &RawInput) {
        match input.kind {
            InputKind::Key => self.on_key(input.code, input.action, input.modifiers),
            InputKind::Mouse => {
                self.on_mouse(input.code, input.action, input.x, input.y);
                lock(&self.keys).modifiers = input.modifiers;
            }
        }
    }

    fn on_key(&self, code: KeyCode, action: Action, modifiers: Modifiers) {
        // The translator never runs under the key lock; repeats discard its output
        let chars = match action {
            Action::Down => self.translator.translate(code, modifiers),
            Action::Up => Vec::new(),
        };
        let mut keys = lock(&self.keys);
        match action {
            Action::Down => {
                if keys.held.insert(code) {
                    keys.pressed_once.insert(code);
                    keys.press_queue.push_back(code);
                    keys.char_queue.extend(chars);
                } else {
                    keys.repeat.insert(code);
                }
            }
            Action::Up => {
                if keys.held.shift_remove(&code) {
                    keys.released_once.insert(code);
                } else {
                    tracing::trace!(code, "key up without matching down ignored");
                }
            }
        }
        keys.modifiers = modifiers;
    }

    fn on_mouse(&self, button: MouseButton, action: Action, x: i32, y: i32) {
        let mut mouse = lock(&self.mouse);
        mouse.position = (x, y);
        match action {
            Action::Down => {
                if mouse.held.insert(button) {
                    mouse.pressed_once.insert(button);
                }
            }
            Action::Up => {
                if mouse.held.shift_remove(&button) {
                    mouse.released_once.insert(button);
                }
            }
        }
    }

    /// End-of-frame reset: clears edge flags and both FIFOs, keeps held state.
    pub fn reset(&self) {
        let mut mouse = lock(&self.mouse);
        let mut keys = lock(&self.keys);
        mouse.reset_edges();
        keys.reset_edges();
    }

    /// Wipe everything back to the empty state, held sets and position included.
    pub fn clear_all(&self) {
        let mut mouse = lock(&self.mouse);
        let mut keys = lock(&self.keys);
        *mouse = MouseState::default();
        *keys = KeyState::default();
    }

    pub fn is_key_down(&self, code: KeyCode) -> bool {
        lock(&self.keys).held.contains(&code)
    }

    pub fn is_key_up(&self, code: KeyCode) -> bool {
        !self.is_key_down(code)
    }

    pub fn is_key_pressed(&self, code: KeyCode) -> bool {
        lock(&self.keys).pressed_once.contains(&code)
    }

    pub fn is_key_released(&self, code: KeyCode) -> bool {
        lock(&self.keys).released_once.contains(&code)
    }

    pub fn is_key_repeat(&self, code: KeyCode) -> bool {
        lock(&self.keys).repeat.contains(&code)
    }

    /// Pop the oldest key press recorded this frame.
    pub fn dequeue_key(&self) -> Option<KeyCode> {
        lock(&self.keys).press_queue.pop_front()
    }

    /// Pop the oldest character produced this frame.
    pub fn dequeue_char(&self) -> Option<char> {
        lock(&self.keys).char_queue.pop_front()
    }

    pub fn modifiers(&self) -> Modifiers {
        lock(&self.keys).modifiers
    }

    /// Keys currently held, in the order they went down.
    pub fn held_keys(&self) -> Vec<KeyCode> {
        lock(&self.keys).held.iter().copied().collect()
    }

    pub fn is_mouse_button_down(&self, button: MouseButton) -> bool {
        lock(&self.mouse).held.contains(&button)
    }

    pub fn is_mouse_button_up(&self, button: MouseButton) -> bool {
        !self.is_mouse_button_down(button)
    }

    pub fn is_mouse_button_pressed(&self, button: MouseButton) -> bool {
        lock(&self.mouse).pressed_once.contains(&button)
    }

    pub fn is_mouse_button_released(&self, button: MouseButton) -> bool {
        lock(&self.mouse).released_once.contains(&button)
    }

    pub fn mouse_position(&self) -> (i32, i32) {
        lock(&self.mouse).position
    }
}

impl Default for InputStateTracker {
    fn default() -> Self {
        Self::new()
    }
}
