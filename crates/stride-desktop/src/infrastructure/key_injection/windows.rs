//! Windows keyboard injection via the SendInput API.
//!
//! Key names are translated to Windows Virtual Key codes at send time.
//! Before every event the pointer position is checked; a pointer parked in
//! the top-left screen corner trips the failsafe and the event is refused.
//! That corner check is the user's always-available kill switch when a
//! simulated key runs away.

#![cfg(target_os = "windows")]

use stride_core::KeyCode;
use windows::Win32::Foundation::POINT;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYBD_EVENT_FLAGS, KEYEVENTF_EXTENDEDKEY,
    KEYEVENTF_KEYUP, VIRTUAL_KEY,
};
use windows::Win32::UI::WindowsAndMessaging::GetCursorPos;

use crate::application::dispatch_steps::{InjectionError, KeyInjector};

/// Windows implementation of [`KeyInjector`] using SendInput.
pub struct WindowsKeyInjector;

impl WindowsKeyInjector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WindowsKeyInjector {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyInjector for WindowsKeyInjector {
    fn press(&self, key: &KeyCode) -> Result<(), InjectionError> {
        check_failsafe()?;
        let vk = key_to_vk(key).ok_or_else(|| InjectionError::UnsupportedKey(key.to_string()))?;
        send_key(vk, false)
    }

    fn release(&self, key: &KeyCode) -> Result<(), InjectionError> {
        check_failsafe()?;
        let vk = key_to_vk(key).ok_or_else(|| InjectionError::UnsupportedKey(key.to_string()))?;
        send_key(vk, true)
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Maps a key name to a Windows Virtual Key code.
///
/// Single letters and digits name themselves; a handful of named keys cover
/// the movement and modifier keys games commonly bind.
fn key_to_vk(key: &KeyCode) -> Option<u16> {
    let name = key.as_str();
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        // VK codes for A-Z and 0-9 equal their uppercase ASCII values.
        if c.is_ascii_alphabetic() {
            return Some(c.to_ascii_uppercase() as u16);
        }
        if c.is_ascii_digit() {
            return Some(c as u16);
        }
    }
    let vk = match name.to_ascii_lowercase().as_str() {
        "space" => 0x20,
        "enter" | "return" => 0x0D,
        "tab" => 0x09,
        "esc" | "escape" => 0x1B,
        "shift" => 0x10,
        "ctrl" => 0x11,
        "alt" => 0x12,
        "left" => 0x25,
        "up" => 0x26,
        "right" => 0x27,
        "down" => 0x28,
        _ => return None,
    };
    Some(vk)
}

/// Refuses injection while the pointer sits in the top-left screen corner.
fn check_failsafe() -> Result<(), InjectionError> {
    let mut point = POINT::default();
    // SAFETY: point is a valid POINT on the stack
    if unsafe { GetCursorPos(&mut point) }.is_ok() && point.x == 0 && point.y == 0 {
        return Err(InjectionError::Failsafe(
            "pointer parked in the top-left screen corner".to_string(),
        ));
    }
    Ok(())
}

fn send_key(vk: u16, key_up: bool) -> Result<(), InjectionError> {
    let mut flags = KEYBD_EVENT_FLAGS(0);
    if key_up {
        flags |= KEYEVENTF_KEYUP;
    }
    // Navigation keys need the EXTENDEDKEY flag
    if (0x21..=0x28).contains(&vk) {
        flags |= KEYEVENTF_EXTENDEDKEY;
    }

    let input = INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: VIRTUAL_KEY(vk),
                wScan: 0,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    };
    // SAFETY: input is a valid INPUT structure on the stack
    let injected = unsafe {
        windows::Win32::UI::Input::KeyboardAndMouse::SendInput(
            &[input],
            std::mem::size_of::<INPUT>() as i32,
        )
    };
    if injected != 1 {
        return Err(InjectionError::Platform(
            "SendInput rejected the event".to_string(),
        ));
    }
    Ok(())
}
