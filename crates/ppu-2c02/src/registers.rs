//! CPU-visible PPU register bit assignments.

use bitflags::bitflags;

bitflags! {
    /// $2000 PPUCTRL.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Ctrl: u8 {
        /// Base nametable select, bits 0-1 (also written into `t`).
        const NAMETABLE_X = 0x01;
        const NAMETABLE_Y = 0x02;
        /// VRAM address increment: 1 when clear, 32 when set.
        const INCREMENT_32 = 0x04;
        /// Sprite pattern table select for 8x8 sprites.
        const SPRITE_TABLE = 0x08;
        /// Background pattern table select.
        const BG_TABLE = 0x10;
        /// 8x16 sprite mode.
        const SPRITE_16 = 0x20;
        /// EXT pin direction (unused here).
        const MASTER = 0x40;
        /// Generate NMI at vblank start.
        const NMI_ENABLE = 0x80;
    }
}

bitflags! {
    /// $2001 PPUMASK.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Mask: u8 {
        const GRAYSCALE = 0x01;
        /// Show background in the left 8 pixels.
        const BG_LEFT = 0x02;
        /// Show sprites in the left 8 pixels.
        const SPRITE_LEFT = 0x04;
        const BG = 0x08;
        const SPRITES = 0x10;
        const EMPHASIZE_RED = 0x20;
        const EMPHASIZE_GREEN = 0x40;
        const EMPHASIZE_BLUE = 0x80;
    }
}

impl Mask {
    /// Rendering is active when either layer is enabled.
    #[must_use]
    pub fn rendering(self) -> bool {
        self.intersects(Mask::BG.union(Mask::SPRITES))
    }

    /// The three emphasis bits as a 0-7 palette bank index.
    #[must_use]
    pub fn emphasis(self) -> u8 {
        self.bits() >> 5
    }
}

/// $2002 PPUSTATUS flag bits (kept as a plain byte; the low five bits
/// come from the register-bus latch on reads).
pub mod status {
    pub const SPRITE_OVERFLOW: u8 = 0x20;
    pub const SPRITE0_HIT: u8 = 0x40;
    pub const VBLANK: u8 = 0x80;
}
