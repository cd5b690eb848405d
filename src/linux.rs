//! Linux implementation using evdev.

use crate::listener::{emit_key, EventSink, KeyAction, ModifierState};
use crate::shortcut::Modifier;
use anyhow::{anyhow, Context, Result};
use evdev::{Device, Key};
use nix::fcntl::{fcntl, FcntlArg, OFlag};
use std::os::fd::AsRawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Modifier tracked for an evdev key, if it is one.
fn modifier_for(key: Key) -> Option<Modifier> {
    match key {
        Key::KEY_LEFTSHIFT | Key::KEY_RIGHTSHIFT => Some(Modifier::Shift),
        Key::KEY_LEFTCTRL | Key::KEY_RIGHTCTRL => Some(Modifier::Ctrl),
        Key::KEY_LEFTALT | Key::KEY_RIGHTALT => Some(Modifier::Alt),
        Key::KEY_LEFTMETA | Key::KEY_RIGHTMETA => Some(Modifier::Meta),
        _ => None,
    }
}

/// Convert an evdev key to the key code used by the key table.
fn to_key_code(key: Key) -> Option<u32> {
    let code = match key {
        Key::KEY_BACKSPACE => 8,
        Key::KEY_TAB => 9,
        Key::KEY_ENTER | Key::KEY_KPENTER => 13,
        Key::KEY_LEFTSHIFT | Key::KEY_RIGHTSHIFT => 16,
        Key::KEY_LEFTCTRL | Key::KEY_RIGHTCTRL => 17,
        Key::KEY_LEFTALT | Key::KEY_RIGHTALT => 18,
        Key::KEY_PAUSE => 19,
        Key::KEY_ESC => 27,
        Key::KEY_SPACE => 32,
        Key::KEY_PAGEUP => 33,
        Key::KEY_PAGEDOWN => 34,
        Key::KEY_END => 35,
        Key::KEY_HOME => 36,
        Key::KEY_LEFT => 37,
        Key::KEY_UP => 38,
        Key::KEY_RIGHT => 39,
        Key::KEY_DOWN => 40,
        Key::KEY_INSERT => 45,
        Key::KEY_DELETE => 46,
        Key::KEY_0 => 48,
        Key::KEY_1 => 49,
        Key::KEY_2 => 50,
        Key::KEY_3 => 51,
        Key::KEY_4 => 52,
        Key::KEY_5 => 53,
        Key::KEY_6 => 54,
        Key::KEY_7 => 55,
        Key::KEY_8 => 56,
        Key::KEY_9 => 57,
        Key::KEY_A => 65,
        Key::KEY_B => 66,
        Key::KEY_C => 67,
        Key::KEY_D => 68,
        Key::KEY_E => 69,
        Key::KEY_F => 70,
        Key::KEY_G => 71,
        Key::KEY_H => 72,
        Key::KEY_I => 73,
        Key::KEY_J => 74,
        Key::KEY_K => 75,
        Key::KEY_L => 76,
        Key::KEY_M => 77,
        Key::KEY_N => 78,
        Key::KEY_O => 79,
        Key::KEY_P => 80,
        Key::KEY_Q => 81,
        Key::KEY_R => 82,
        Key::KEY_S => 83,
        Key::KEY_T => 84,
        Key::KEY_U => 85,
        Key::KEY_V => 86,
        Key::KEY_W => 87,
        Key::KEY_X => 88,
        Key::KEY_Y => 89,
        Key::KEY_Z => 90,
        Key::KEY_LEFTMETA | Key::KEY_RIGHTMETA => 91,
        Key::KEY_F1 => 112,
        Key::KEY_F2 => 113,
        Key::KEY_F3 => 114,
        Key::KEY_F4 => 115,
        Key::KEY_F5 => 116,
        Key::KEY_F6 => 117,
        Key::KEY_F7 => 118,
        Key::KEY_F8 => 119,
        Key::KEY_F9 => 120,
        Key::KEY_F10 => 121,
        Key::KEY_F11 => 122,
        Key::KEY_F12 => 123,
        Key::KEY_SCROLLLOCK => 145,
        _ => return None,
    };
    Some(code)
}

/// Find all keyboard devices in /dev/input.
pub fn find_keyboards() -> Result<Vec<Device>> {
    let mut keyboards = Vec::new();

    for entry in std::fs::read_dir("/dev/input")? {
        let entry = entry?;
        let path = entry.path();

        if !path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with("event"))
            .unwrap_or(false)
        {
            continue;
        }

        if let Ok(device) = Device::open(&path) {
            if device
                .supported_keys()
                .map(|keys| keys.contains(Key::KEY_A))
                .unwrap_or(false)
            {
                log::debug!("Found keyboard: {:?} at {:?}", device.name(), path);
                keyboards.push(device);
            }
        }
    }

    if keyboards.is_empty() {
        Err(anyhow!(
            "No keyboards found. Make sure you're in the 'input' group or running as root."
        ))
    } else {
        Ok(keyboards)
    }
}

fn set_nonblocking(keyboards: &[Device]) -> Result<()> {
    for device in keyboards {
        let fd = device.as_raw_fd();
        let flags = fcntl(fd, FcntlArg::F_GETFL).context("Failed to get fd flags")?;
        let flags = OFlag::from_bits_truncate(flags) | OFlag::O_NONBLOCK;
        fcntl(fd, FcntlArg::F_SETFL(flags)).context("Failed to set non-blocking")?;
    }
    Ok(())
}

fn would_block(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(libc::EAGAIN) || e.raw_os_error() == Some(libc::EWOULDBLOCK)
}

/// Drain stale events so keys pressed before a reconnect don't fire shortcuts.
fn drain_events(keyboards: &mut [Device]) {
    for device in keyboards.iter_mut() {
        let device_name = device.name().map(String::from);
        loop {
            match device.fetch_events() {
                Ok(events) => {
                    let count = events.count();
                    if count == 0 {
                        break;
                    }
                    log::debug!("Drained {} stale events from {:?}", count, device_name);
                }
                Err(e) => {
                    if !would_block(&e) {
                        log::debug!("Error draining events from {:?}: {}", device_name, e);
                    }
                    break;
                }
            }
        }
    }
}

/// Key source reading every keyboard device through evdev.
pub struct KeyboardSource {
    keyboards: Vec<Device>,
}

impl KeyboardSource {
    pub fn new(keyboards: Vec<Device>) -> Self {
        Self { keyboards }
    }

    /// Read keyboards on a background thread until `running` is cleared.
    pub fn start(self, sink: EventSink, running: Arc<AtomicBool>) -> Result<()> {
        set_nonblocking(&self.keyboards)?;
        thread::Builder::new()
            .name("shortcut-evdev".to_string())
            .spawn(move || read_keyboards(self.keyboards, sink, running))
            .context("Failed to spawn keyboard thread")?;
        Ok(())
    }
}

fn read_keyboards(mut keyboards: Vec<Device>, mut sink: EventSink, running: Arc<AtomicBool>) {
    // Keyed by device index so each keyboard's modifiers are held independently
    let mut modifiers: ModifierState<(usize, Key)> = ModifierState::new();
    let mut last_rescan = Instant::now();
    let mut had_error = false;

    const RESCAN_INTERVAL: Duration = Duration::from_secs(3);

    while running.load(Ordering::Relaxed) {
        if had_error && last_rescan.elapsed() >= RESCAN_INTERVAL {
            log::info!("Keyboard error detected, rescanning devices...");
            match find_keyboards() {
                Ok(mut new_keyboards) => {
                    // Bluetooth keyboards need a moment after reconnecting
                    thread::sleep(Duration::from_millis(100));

                    match set_nonblocking(&new_keyboards) {
                        Ok(()) => {
                            log::info!(
                                "Keyboards reconnected: found {} device(s)",
                                new_keyboards.len()
                            );
                            drain_events(&mut new_keyboards);
                            keyboards = new_keyboards;
                            modifiers.clear();
                            had_error = false;
                        }
                        Err(e) => {
                            log::warn!("Failed to set non-blocking on new keyboards: {}", e);
                        }
                    }
                }
                Err(e) => {
                    log::warn!("Failed to rescan keyboards: {}", e);
                }
            }
            last_rescan = Instant::now();
        }

        for (index, device) in keyboards.iter_mut().enumerate() {
            match device.fetch_events() {
                Ok(events) => {
                    for event in events {
                        let evdev::InputEventKind::Key(key) = event.kind() else {
                            continue;
                        };
                        let action = match event.value() {
                            0 => KeyAction::Release,
                            1 => KeyAction::Press,
                            2 => KeyAction::Repeat,
                            _ => continue,
                        };

                        let modifier = modifier_for(key);
                        if let Some(modifier) = modifier {
                            modifiers.update((index, key), modifier, action);
                        }

                        if let Some(code) = to_key_code(key) {
                            let mods = modifiers.modifiers();
                            emit_key(&mut sink, code, mods, action, modifier.is_some());
                        }
                    }
                }
                Err(e) => {
                    if !would_block(&e) {
                        log::debug!("Keyboard read error: {}", e);
                        had_error = true;
                    }
                }
            }
        }

        thread::sleep(Duration::from_millis(10));
    }
}
