use anyhow::{Context, Result};
use std::path::Path;

// =============================================================================
// Button / Action Space
// =============================================================================

/// Physical Game Boy buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Up,
    Down,
    Left,
    Right,
    A,
    B,
    Start,
    Select,
}

/// Discrete agent action space: one button per action, in the fixed order the
/// policy indexes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Action {
    Up = 0,
    Down = 1,
    Left = 2,
    Right = 3,
    A = 4,
    B = 5,
    Start = 6,
    Select = 7,
}

impl Action {
    pub const COUNT: usize = 8;

    pub fn from_index(i: usize) -> Self {
        assert!(i < Self::COUNT);
        // SAFETY: repr(u8) and we checked bounds
        unsafe { std::mem::transmute(i as u8) }
    }

    pub fn button(self) -> Button {
        match self {
            Action::Up => Button::Up,
            Action::Down => Button::Down,
            Action::Left => Button::Left,
            Action::Right => Button::Right,
            Action::A => Button::A,
            Action::B => Button::B,
            Action::Start => Button::Start,
            Action::Select => Button::Select,
        }
    }
}

// =============================================================================
// Emulator Bridge
// =============================================================================

/// Boundary to the emulation engine: a byte-addressable memory oracle plus a
/// frame-stepping clock and joypad lines. Reads reflect state after the last
/// completed frame advance; no further atomicity is assumed.
///
/// A failed `clock_frame` is fatal to the episode: memory contents can no
/// longer be trusted, so callers surface the error instead of retrying.
pub trait EmulatorBridge {
    fn peek(&self, addr: u16) -> u8;
    fn poke(&mut self, addr: u16, value: u8);
    fn clock_frame(&mut self) -> Result<()>;
    fn set_button(&mut self, button: Button, pressed: bool);
    fn release_all(&mut self);
    fn load_state(&mut self, path: &Path) -> Result<()>;
    fn save_state(&mut self, path: &Path) -> Result<()>;
}

// =============================================================================
// In-memory bus
// =============================================================================

/// Flat 64 KiB address space with a frame counter. Backs the `inspect` CLI
/// subcommand (decoding raw RAM dumps) and the test suite; save states are
/// raw memory images.
pub struct RamBuffer {
    ram: Box<[u8; 0x1_0000]>,
    frames: u64,
    /// Button-edge log: every press (transition to held) in order.
    pub presses: Vec<Button>,
    held: [bool; 8],
}

impl Default for RamBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl RamBuffer {
    pub fn new() -> Self {
        Self {
            ram: Box::new([0; 0x1_0000]),
            frames: 0,
            presses: Vec::new(),
            held: [false; 8],
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let mut bus = Self::new();
        bus.load_state(path)?;
        Ok(bus)
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn write_bytes(&mut self, addr: u16, bytes: &[u8]) {
        let start = addr as usize;
        self.ram[start..start + bytes.len()].copy_from_slice(bytes);
    }

    fn button_index(button: Button) -> usize {
        match button {
            Button::Up => 0,
            Button::Down => 1,
            Button::Left => 2,
            Button::Right => 3,
            Button::A => 4,
            Button::B => 5,
            Button::Start => 6,
            Button::Select => 7,
        }
    }
}

impl EmulatorBridge for RamBuffer {
    fn peek(&self, addr: u16) -> u8 {
        self.ram[addr as usize]
    }

    fn poke(&mut self, addr: u16, value: u8) {
        self.ram[addr as usize] = value;
    }

    fn clock_frame(&mut self) -> Result<()> {
        self.frames += 1;
        Ok(())
    }

    fn set_button(&mut self, button: Button, pressed: bool) {
        let idx = Self::button_index(button);
        if pressed && !self.held[idx] {
            self.presses.push(button);
        }
        self.held[idx] = pressed;
    }

    fn release_all(&mut self) {
        self.held = [false; 8];
    }

    fn load_state(&mut self, path: &Path) -> Result<()> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;
        let len = bytes.len().min(self.ram.len());
        self.ram[..len].copy_from_slice(&bytes[..len]);
        self.ram[len..].fill(0);
        Ok(())
    }

    fn save_state(&mut self, path: &Path) -> Result<()> {
        std::fs::write(path, &self.ram[..])
            .with_context(|| format!("Failed to write state file: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_index_round_trip() {
        for i in 0..Action::COUNT {
            assert_eq!(Action::from_index(i) as usize, i);
        }
    }

    #[test]
    fn press_edges_are_logged_once() {
        let mut bus = RamBuffer::new();
        bus.set_button(Button::A, true);
        bus.set_button(Button::A, true);
        bus.set_button(Button::A, false);
        bus.set_button(Button::A, true);
        assert_eq!(bus.presses, vec![Button::A, Button::A]);
    }

    #[test]
    fn poke_peek_round_trip() {
        let mut bus = RamBuffer::new();
        bus.poke(0xD163, 3);
        assert_eq!(bus.peek(0xD163), 3);
    }
}
