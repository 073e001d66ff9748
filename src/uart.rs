//! PL011 UART driver for the suite console
//!
//! Base address comes from `platform::UART_BASE`. Firmware has already set
//! the baud rate, so only the data and flag registers are touched. Off the
//! target the console is a sink.

use core::fmt;

use crate::platform;
use crate::sync::SpinLock;

/// PL011 register offsets
const UART_DR: usize = 0x00; // Data Register
const UART_FR: usize = 0x18; // Flag Register

/// Flag Register bits
const UART_FR_TXFF: u32 = 1 << 5; // Transmit FIFO full

/// UART device structure
pub struct Uart {
    base: usize,
}

impl Uart {
    const fn new(base: usize) -> Self {
        Self { base }
    }

    /// Write a byte, translating `\n` to `\r\n`.
    pub fn putc(&self, c: u8) {
        if c == b'\n' {
            self.put_raw(b'\r');
        }
        self.put_raw(c);
    }

    fn put_raw(&self, c: u8) {
        // Wait until TX FIFO is not full
        while self.read_reg(UART_FR) & UART_FR_TXFF != 0 {
            core::hint::spin_loop();
        }
        self.write_reg(UART_DR, c as u32);
    }

    pub fn puts(&self, s: &str) {
        for byte in s.bytes() {
            self.putc(byte);
        }
    }

    #[cfg(all(target_arch = "aarch64", target_os = "none"))]
    #[inline]
    fn read_reg(&self, offset: usize) -> u32 {
        unsafe { core::ptr::read_volatile((self.base + offset) as *const u32) }
    }

    #[cfg(all(target_arch = "aarch64", target_os = "none"))]
    #[inline]
    fn write_reg(&self, offset: usize, value: u32) {
        unsafe { core::ptr::write_volatile((self.base + offset) as *mut u32, value) }
    }

    #[cfg(not(all(target_arch = "aarch64", target_os = "none")))]
    fn read_reg(&self, _offset: usize) -> u32 {
        let _ = self.base;
        0
    }

    #[cfg(not(all(target_arch = "aarch64", target_os = "none")))]
    fn write_reg(&self, _offset: usize, _value: u32) {}
}

impl fmt::Write for Uart {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.puts(s);
        Ok(())
    }
}

/// Console shared by all PEs. Whole lines go out under the lock.
static CONSOLE: SpinLock<Uart> = SpinLock::new(Uart::new(platform::UART_BASE));

/// Writes `args` with the console lock held.
pub fn write_fmt(args: fmt::Arguments<'_>) {
    use core::fmt::Write;
    let _ = CONSOLE.lock().write_fmt(args);
}

/// Like [`write_fmt`], but never waits: if the lock is taken (a fault hit
/// while printing) the text goes straight to the device.
pub fn write_fmt_nowait(args: fmt::Arguments<'_>) {
    use core::fmt::Write;
    match CONSOLE.try_lock() {
        Some(mut uart) => {
            let _ = uart.write_fmt(args);
        }
        None => {
            let _ = Uart::new(platform::UART_BASE).write_fmt(args);
        }
    }
}

/// Frees the console after a fault abandoned a PE while it held the lock,
/// so the summary can still be printed.
pub fn release_after_fault() {
    if CONSOLE.is_locked() {
        // SAFETY: only called once the guarded phase ended in a fault; the
        // holder's frames were discarded and its guard never drops.
        unsafe { CONSOLE.force_unlock() };
    }
}

/// Print macro (without newline)
#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => {
        $crate::uart::write_fmt(format_args!($($arg)*))
    };
}

/// Println macro (with newline)
#[macro_export]
macro_rules! println {
    () => {
        $crate::print!("\n")
    };
    ($($arg:tt)*) => {
        $crate::uart::write_fmt(format_args!("{}\n", format_args!($($arg)*)))
    };
}
