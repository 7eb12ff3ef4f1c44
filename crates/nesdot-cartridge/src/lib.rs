//! Cartridge images and the mapper bus contract.
//!
//! An iNES image is a 16-byte header, an optional 512-byte trainer, PRG
//! ROM in 16 KiB units, and CHR ROM in 8 KiB units (zero CHR units means
//! the board carries 8 KiB of CHR RAM instead). The mapper id is split
//! across the high nibbles of header bytes 6 and 7.
//!
//! A [`Mapper`] owns everything on the cartridge edge: PRG decode in CPU
//! space, and the whole video space below the palette: pattern tables
//! plus nametable RAM with the board's mirroring policy. Reads the board
//! does not decode return `None` so the system bus can substitute the
//! open-bus value.

use std::fmt;

use log::info;
use ppu_2c02::VideoBus;

/// iNES header length.
pub const HEADER_SIZE: usize = 16;
/// Optional trainer length.
pub const TRAINER_SIZE: usize = 512;
/// PRG ROM unit (header byte 4).
pub const PRG_BANK_SIZE: usize = 16 * 1024;
/// CHR ROM unit (header byte 5).
pub const CHR_BANK_SIZE: usize = 8 * 1024;

/// Nametable mirroring policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirroring {
    Horizontal,
    Vertical,
}

/// Cartridge image rejected at load time.
#[derive(Debug)]
pub enum CartridgeError {
    /// Image shorter than the 16-byte header.
    ImageTooSmall(usize),
    /// No mapper registered for the decoded id.
    UnknownMapper(u8),
    /// Header promises more data than the image holds.
    Truncated { needed: usize, have: usize },
}

impl fmt::Display for CartridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImageTooSmall(size) => {
                write!(f, "image too small: {size} bytes (need at least {HEADER_SIZE})")
            }
            Self::UnknownMapper(id) => write!(f, "no mapper registered for id {id}"),
            Self::Truncated { needed, have } => {
                write!(f, "image truncated: header needs {needed} bytes, have {have}")
            }
        }
    }
}

impl std::error::Error for CartridgeError {}

/// Parsed header fields.
#[derive(Debug, Clone, Copy)]
pub struct Header {
    pub prg_banks: u8,
    pub chr_banks: u8,
    pub mapper_id: u8,
    pub mirroring: Mirroring,
    pub has_trainer: bool,
}

impl Header {
    pub fn parse(image: &[u8]) -> Result<Self, CartridgeError> {
        if image.len() < HEADER_SIZE {
            return Err(CartridgeError::ImageTooSmall(image.len()));
        }
        Ok(Self {
            prg_banks: image[4],
            chr_banks: image[5],
            mapper_id: (image[6] >> 4) | (image[7] & 0xF0),
            mirroring: if image[6] & 0x01 == 0 {
                Mirroring::Horizontal
            } else {
                Mirroring::Vertical
            },
            has_trainer: image[6] & 0x04 != 0,
        })
    }

    /// Offset of PRG data within the image.
    #[must_use]
    pub fn prg_start(&self) -> usize {
        HEADER_SIZE + if self.has_trainer { TRAINER_SIZE } else { 0 }
    }
}

/// The cartridge edge connector, as seen by CPU, PPU, and DMA.
///
/// `read`/`write` cover cartridge CPU space ($4020-$FFFF); `None` from a
/// read means nothing drove the bus. The `VideoBus` supertrait covers the
/// PPU-side space, including nametables and their mirroring. The reset
/// hooks mirror the console's reset button and power cycle.
pub trait Mapper: VideoBus {
    fn read(&mut self, addr: u16) -> Option<u8>;
    fn write(&mut self, addr: u16, value: u8);
    /// Soft reset (reset button): mapper-internal latches only.
    fn reset(&mut self);
    /// Hard reset (power cycle): RAM contents decay back to noise.
    fn hard_reset(&mut self);
    /// Level of the cartridge IRQ line. NROM never asserts it.
    fn irq_line(&self) -> bool {
        false
    }
}

/// Decode the header and construct the matching mapper.
pub fn load(image: &[u8]) -> Result<Box<dyn Mapper>, CartridgeError> {
    let header = Header::parse(image)?;
    info!(
        "cartridge: mapper {}, {}x16K PRG, {}x8K CHR, {:?} mirroring",
        header.mapper_id, header.prg_banks, header.chr_banks, header.mirroring
    );
    match header.mapper_id {
        0 => Ok(Box::new(Nrom::from_image(&header, image)?)),
        id => Err(CartridgeError::UnknownMapper(id)),
    }
}

/// Marsaglia xorshift, used to fill power-on RAM with noise so software
/// cannot get away with assuming cleared memory.
pub fn fill_noise(buffer: &mut [u8], seed: &mut u32) {
    for byte in buffer {
        *seed ^= *seed << 13;
        *seed ^= *seed >> 17;
        *seed ^= *seed << 5;
        *byte = *seed as u8;
    }
}

/// NROM (mapper 0): no banking at all.
///
/// - PRG: 16K mirrored across $8000-$FFFF, or 32K flat
/// - CHR: 8K ROM, or 8K RAM when the header has no CHR units
/// - Nametables: 2K on-console RAM wired for horizontal or vertical
///   mirroring by the board
pub struct Nrom {
    prg: Vec<u8>,
    chr: Vec<u8>,
    chr_is_ram: bool,
    vram: [u8; 0x800],
    mirroring: Mirroring,
    noise_seed: u32,
}

impl Nrom {
    pub fn from_image(header: &Header, image: &[u8]) -> Result<Self, CartridgeError> {
        let prg_size = usize::from(header.prg_banks) * PRG_BANK_SIZE;
        let chr_size = usize::from(header.chr_banks) * CHR_BANK_SIZE;
        let prg_start = header.prg_start();
        let needed = prg_start + prg_size.max(PRG_BANK_SIZE) + chr_size;
        if prg_size == 0 || image.len() < needed {
            return Err(CartridgeError::Truncated {
                needed,
                have: image.len(),
            });
        }

        let mut seed = 1;
        let prg = image[prg_start..prg_start + prg_size].to_vec();
        let (chr, chr_is_ram) = if chr_size == 0 {
            let mut chr = vec![0u8; CHR_BANK_SIZE];
            fill_noise(&mut chr, &mut seed);
            (chr, true)
        } else {
            (image[prg_start + prg_size..prg_start + prg_size + chr_size].to_vec(), false)
        };

        let mut vram = [0u8; 0x800];
        fill_noise(&mut vram, &mut seed);

        Ok(Self {
            prg,
            chr,
            chr_is_ram,
            vram,
            mirroring: header.mirroring,
            noise_seed: seed,
        })
    }

    fn nametable_index(&self, addr: u16) -> usize {
        let a = usize::from(addr) & 0x0FFF;
        match self.mirroring {
            // $2000/$2400 share the first table, $2800/$2C00 the second.
            Mirroring::Horizontal => ((a & 0x800) >> 1) | (a & 0x3FF),
            // $2000/$2800 share the first table, $2400/$2C00 the second.
            Mirroring::Vertical => a & 0x7FF,
        }
    }
}

impl Mapper for Nrom {
    fn read(&mut self, addr: u16) -> Option<u8> {
        if addr >= 0x8000 {
            Some(self.prg[(usize::from(addr) - 0x8000) % self.prg.len()])
        } else {
            None
        }
    }

    fn write(&mut self, _addr: u16, _value: u8) {
        // No PRG RAM and no registers on an NROM board.
    }

    fn reset(&mut self) {}

    fn hard_reset(&mut self) {
        fill_noise(&mut self.vram, &mut self.noise_seed);
        if self.chr_is_ram {
            fill_noise(&mut self.chr, &mut self.noise_seed);
        }
    }
}

impl VideoBus for Nrom {
    fn video_read(&mut self, addr: u16) -> u8 {
        match addr & 0x3FFF {
            0x0000..=0x1FFF => self.chr[usize::from(addr) & 0x1FFF],
            0x2000..=0x3EFF => self.vram[self.nametable_index(addr)],
            _ => 0,
        }
    }

    fn video_write(&mut self, addr: u16, value: u8) {
        match addr & 0x3FFF {
            0x0000..=0x1FFF => {
                if self.chr_is_ram {
                    self.chr[usize::from(addr) & 0x1FFF] = value;
                }
            }
            0x2000..=0x3EFF => self.vram[self.nametable_index(addr)] = value,
            _ => {}
        }
    }
}
