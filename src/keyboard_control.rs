//! Keyboard control module for X11-based systems.
//!
//! Synthesizes key presses through the XTEST extension. Key names follow the
//! lower-case vocabulary used in action descriptors (`"enter"`, `"ctrl"`,
//! `"f5"`, `"a"`, ...); text is typed character by character, holding shift
//! for characters that live on the shifted level of their key.

use crate::{action::InputInjector, Error, Result};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::thread;
use std::time::Duration;
use x11rb::{
    connection::Connection,
    protocol::{
        xproto::{ConnectionExt as _, Keycode, Keysym, Window, KEY_PRESS_EVENT, KEY_RELEASE_EVENT},
        xtest::ConnectionExt as _,
    },
    rust_connection::RustConnection,
};

const XK_SHIFT_L: Keysym = 0xffe1;
const XK_RETURN: Keysym = 0xff0d;
const XK_TAB: Keysym = 0xff09;
const XK_F1: Keysym = 0xffbe;
const XK_KP_0: Keysym = 0xffb0;

/// Keysym for a named key, case-insensitive
#[must_use]
pub fn keysym_for_name(name: &str) -> Option<Keysym> {
    let name = name.trim().to_ascii_lowercase();

    let named = match name.as_str() {
        "enter" | "return" => Some(XK_RETURN),
        "tab" => Some(XK_TAB),
        "space" => Some(0x0020),
        "esc" | "escape" => Some(0xff1b),
        "backspace" => Some(0xff08),
        "delete" | "del" => Some(0xffff),
        "insert" => Some(0xff63),
        "home" => Some(0xff50),
        "end" => Some(0xff57),
        "pageup" | "pgup" => Some(0xff55),
        "pagedown" | "pgdn" => Some(0xff56),
        "left" => Some(0xff51),
        "up" => Some(0xff52),
        "right" => Some(0xff53),
        "down" => Some(0xff54),
        "shift" | "shiftleft" => Some(XK_SHIFT_L),
        "shiftright" => Some(0xffe2),
        "ctrl" | "ctrlleft" | "control" => Some(0xffe3),
        "ctrlright" => Some(0xffe4),
        "alt" | "altleft" => Some(0xffe9),
        "altright" => Some(0xffea),
        "win" | "winleft" | "super" | "command" => Some(0xffeb),
        "winright" => Some(0xffec),
        "capslock" => Some(0xffe5),
        "printscreen" | "prtsc" => Some(0xff61),
        "pause" => Some(0xff13),
        "volumeup" => Some(0x1008_ff13),
        "volumedown" => Some(0x1008_ff11),
        "volumemute" => Some(0x1008_ff12),
        "playpause" => Some(0x1008_ff14),
        "nexttrack" => Some(0x1008_ff17),
        "prevtrack" => Some(0x1008_ff16),
        _ => None,
    };
    if named.is_some() {
        return named;
    }

    if let Some(n) = name.strip_prefix('f').and_then(|n| n.parse::<u32>().ok()) {
        return (1..=12).contains(&n).then(|| XK_F1 + n - 1);
    }
    if let Some(n) = name.strip_prefix("num").and_then(|n| n.parse::<u32>().ok()) {
        return (n <= 9).then(|| XK_KP_0 + n);
    }

    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => keysym_for_char(c),
        _ => None,
    }
}

/// Keysym typing `c` produces
#[must_use]
pub fn keysym_for_char(c: char) -> Option<Keysym> {
    match c {
        '\n' => Some(XK_RETURN),
        '\t' => Some(XK_TAB),
        ' '..='~' | '\u{a0}'..='\u{ff}' => Some(u32::from(c)),
        c if c.is_control() => None,
        c => Some(0x0100_0000 | u32::from(c)),
    }
}

/// Where a keysym sits on the keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct KeyPosition {
    keycode: Keycode,
    shifted: bool,
}

/// XTEST-backed keyboard injector
pub struct X11Injector {
    connection: RustConnection,
    root: Window,
    keymap: HashMap<Keysym, KeyPosition>,
}

impl X11Injector {
    /// Connect to the default display and read its keyboard mapping
    ///
    /// # Errors
    ///
    /// Returns an error if the display, the XTEST extension or the keyboard
    /// mapping is unavailable.
    pub fn new() -> Result<Self> {
        info!("Initializing X11 keyboard injector");

        let (connection, screen_num) = RustConnection::connect(None)
            .map_err(|e| Error::X11(format!("Failed to connect to X11: {e}")))?;

        let root = connection
            .setup()
            .roots
            .get(screen_num)
            .ok_or_else(|| Error::X11("Failed to get screen".to_string()))?
            .root;

        let version = connection
            .xtest_get_version(2, 2)
            .map_err(|e| Error::X11(format!("Failed to query XTEST: {e}")))?
            .reply()
            .map_err(|e| Error::X11(format!("XTEST extension unavailable: {e}")))?;
        debug!("XTEST version {}.{}", version.major_version, version.minor_version);

        let keymap = Self::read_keymap(&connection)?;
        info!("Connected to X11 display, {} keysyms mapped", keymap.len());

        Ok(Self {
            connection,
            root,
            keymap,
        })
    }

    fn read_keymap(connection: &RustConnection) -> Result<HashMap<Keysym, KeyPosition>> {
        let setup = connection.setup();
        let (min, max) = (setup.min_keycode, setup.max_keycode);
        let count = max.saturating_sub(min).saturating_add(1);

        let reply = connection
            .get_keyboard_mapping(min, count)
            .map_err(|e| Error::X11(format!("Failed to send keyboard mapping request: {e}")))?
            .reply()
            .map_err(|e| Error::X11(format!("Failed to get keyboard mapping: {e}")))?;

        Ok(build_keymap(min, usize::from(reply.keysyms_per_keycode), &reply.keysyms))
    }

    fn position(&self, keysym: Keysym, what: &str) -> Result<KeyPosition> {
        self.keymap
            .get(&keysym)
            .copied()
            .ok_or_else(|| Error::Injection(format!("No key on this keyboard produces {what:?}")))
    }

    fn send(&self, event: u8, keycode: Keycode) -> Result<()> {
        self.connection
            .xtest_fake_input(event, keycode, x11rb::CURRENT_TIME, self.root, 0, 0, 0)
            .map_err(|e| Error::Injection(format!("Failed to send fake input: {e}")))?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.connection
            .flush()
            .map_err(|e| Error::Injection(format!("Failed to flush connection: {e}")))
    }

    fn tap(&self, position: KeyPosition) -> Result<()> {
        let mut keycodes = Vec::with_capacity(2);
        if position.shifted {
            keycodes.push(self.position(XK_SHIFT_L, "shift")?.keycode);
        }
        keycodes.push(position.keycode);

        chord(&keycodes, |event, keycode| self.send(event, keycode))?;
        self.flush()
    }

    fn named(&self, name: &str) -> Result<KeyPosition> {
        let keysym = keysym_for_name(name)
            .ok_or_else(|| Error::Injection(format!("Unknown key name: {name:?}")))?;
        self.position(keysym, name)
    }
}

/// Press `keycodes` in order and release them in reverse. A failed press
/// still releases every key already held.
fn chord(keycodes: &[Keycode], mut send: impl FnMut(u8, Keycode) -> Result<()>) -> Result<()> {
    for (held, &keycode) in keycodes.iter().enumerate() {
        if let Err(e) = send(KEY_PRESS_EVENT, keycode) {
            for &pressed in keycodes[..held].iter().rev() {
                if let Err(release) = send(KEY_RELEASE_EVENT, pressed) {
                    warn!("Failed to release keycode {pressed}: {release}");
                }
            }
            return Err(e);
        }
    }
    for &keycode in keycodes.iter().rev() {
        send(KEY_RELEASE_EVENT, keycode)?;
    }
    Ok(())
}

fn build_keymap(min_keycode: Keycode, per_keycode: usize, keysyms: &[Keysym]) -> HashMap<Keysym, KeyPosition> {
    let mut keymap = HashMap::new();
    if per_keycode == 0 {
        return keymap;
    }

    // Unshifted and shifted levels only; the first keycode wins
    for level in 0..per_keycode.min(2) {
        for (offset, syms) in keysyms.chunks(per_keycode).enumerate() {
            let Ok(offset) = u8::try_from(offset) else {
                break;
            };
            let Some(&keysym) = syms.get(level).filter(|&&sym| sym != 0) else {
                continue;
            };
            keymap.entry(keysym).or_insert(KeyPosition {
                keycode: min_keycode.saturating_add(offset),
                shifted: level == 1,
            });
        }
    }
    keymap
}

impl InputInjector for X11Injector {
    fn press(&mut self, key: &str) -> Result<()> {
        debug!("Pressing {key}");
        let position = self.named(key)?;
        self.tap(position)
    }

    fn hotkey(&mut self, keys: &[String]) -> Result<()> {
        debug!("Hotkey {}", keys.join("+"));
        let keycodes = keys
            .iter()
            .map(|key| self.named(key).map(|position| position.keycode))
            .collect::<Result<Vec<_>>>()?;

        chord(&keycodes, |event, keycode| self.send(event, keycode))?;
        self.flush()
    }

    fn write(&mut self, text: &str, interval: Duration) -> Result<()> {
        debug!("Writing {text:?}");
        let mut first = true;
        for c in text.chars() {
            if !first {
                thread::sleep(interval);
            }
            first = false;

            let keysym = keysym_for_char(c)
                .ok_or_else(|| Error::Injection(format!("Cannot type character {c:?}")))?;
            let position = self.position(keysym, &c.to_string())?;
            self.tap(position)?;
        }
        Ok(())
    }
}
