//! Controller port: a strobe-latched shift register.
//!
//! The console sees a controller as one bit at a time out of an 8-bit
//! shift register. Strobe high makes the register follow the live button
//! state; the falling edge latches it; each read shifts one bit out with
//! the vacated high bit set, so reads past the eighth return 1.

/// Supplies the live button byte when the register latches. Button order
/// is the hardware's: A, B, Select, Start, Up, Down, Left, Right from bit
/// 0 up.
pub trait ControllerSource {
    fn poll(&mut self) -> u8;
}

impl<F: FnMut() -> u8> ControllerSource for F {
    fn poll(&mut self) -> u8 {
        self()
    }
}

/// One controller port.
pub struct Controller {
    register: u8,
    strobe: bool,
    source: Option<Box<dyn ControllerSource>>,
}

impl Controller {
    /// A port with nothing plugged in: latches all-released.
    #[must_use]
    pub fn new() -> Self {
        Self {
            register: 0,
            strobe: false,
            source: None,
        }
    }

    /// Plug in a button source.
    pub fn connect(&mut self, source: Box<dyn ControllerSource>) {
        self.source = Some(source);
    }

    /// Snapshot the current button state into the shift register.
    pub fn load_register(&mut self) -> u8 {
        self.register = self.source.as_mut().map_or(0, |s| s.poll());
        self.register
    }

    /// Rotate one bit out; the vacated high bit reads 1.
    pub fn shift_register(&mut self) -> u8 {
        self.register = (self.register >> 1) | 0x80;
        self.register
    }

    /// $4016/$4017 read: bit 0 of the register, then shift.
    pub fn read(&mut self) -> u8 {
        if self.strobe {
            // While strobed the register keeps reloading, so reads always
            // see the live A button.
            return self.load_register() & 0x01;
        }
        let bit = self.register & 0x01;
        self.shift_register();
        bit
    }

    /// $4016 write: bit 0 drives the strobe line.
    pub fn set_strobe(&mut self, value: u8) {
        let high = value & 0x01 != 0;
        if high || self.strobe {
            // High keeps the register following the buttons; the falling
            // edge takes the final snapshot.
            self.load_register();
        }
        self.strobe = high;
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}
