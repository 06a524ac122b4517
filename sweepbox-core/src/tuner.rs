//! TEA5767 tuner driver.
//!
//! Stateless beyond a presence flag: every tune encodes the frequency into
//! the chip's five-byte control word and writes it over I2C. Bus failures
//! are logged and reported as `false`; the sweep keeps issuing tunes
//! regardless, since a transient bus error should not halt the rest of the
//! device.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::AsRawFd;
use std::path::PathBuf;
use std::sync::Mutex;

use log::{debug, info, warn};

pub const TEA5767_ADDR: u16 = 0x60;
pub const I2C_BUS_PATH: &str = "/dev/i2c-1";

/// `ioctl` request selecting the slave address on an i2c-dev fd.
const I2C_SLAVE: libc::c_ulong = 0x0703;

/// Intermediate-frequency offset used for high-side injection, in Hz.
const IF_OFFSET_HZ: f64 = 225_000.0;
/// Reference divisor for the 32.768 kHz crystal.
const PLL_REF_DIVISOR: f64 = 32_768.0;

/// Encode a frequency into the chip's five control bytes.
///
/// Byte 1-2 carry the 14-bit PLL word (high-side injection). Byte 3 selects
/// injection side and stereo/forced-mono. Byte 4 picks the 32.768 kHz
/// crystal and switches soft-mute, high-cut, and stereo-noise-cancel on.
pub fn control_bytes(freq_mhz: f64, forced_mono: bool) -> [u8; 5] {
    let pll = (4.0 * (freq_mhz * 1_000_000.0 + IF_OFFSET_HZ) / PLL_REF_DIVISOR) as u32;
    [
        ((pll >> 8) & 0x3F) as u8,
        (pll & 0xFF) as u8,
        if forced_mono { 0x18 } else { 0x10 },
        0x1E,
        0x00,
    ]
}

/// Raw access to the tuner's bus, separated from the encoding so the driver
/// is testable without hardware.
pub trait TunerBus: Send {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;
    fn read_status(&mut self) -> io::Result<[u8; 5]>;
}

/// Linux i2c-dev bus. The device file is opened per operation, matching how
/// rarely the status side is read and keeping no fd held across sweeps.
pub struct I2cDev {
    path: PathBuf,
    addr: u16,
}

impl I2cDev {
    pub fn new(path: impl Into<PathBuf>, addr: u16) -> Self {
        Self {
            path: path.into(),
            addr,
        }
    }

    pub fn default_bus() -> Self {
        Self::new(I2C_BUS_PATH, TEA5767_ADDR)
    }

    fn open(&self) -> io::Result<File> {
        let file = OpenOptions::new().read(true).write(true).open(&self.path)?;
        let rc = unsafe { libc::ioctl(file.as_raw_fd(), I2C_SLAVE, self.addr as libc::c_ulong) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(file)
    }
}

impl TunerBus for I2cDev {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.open()?.write_all(bytes)
    }

    fn read_status(&mut self) -> io::Result<[u8; 5]> {
        let mut buf = [0u8; 5];
        self.open()?.read_exact(&mut buf)?;
        Ok(buf)
    }
}

/// The tuner itself: `tune` and `probe`, nothing else.
pub struct Tuner {
    bus: Mutex<Box<dyn TunerBus>>,
}

impl Tuner {
    pub fn new(bus: Box<dyn TunerBus>) -> Self {
        Self {
            bus: Mutex::new(bus),
        }
    }

    pub fn i2c_default() -> Self {
        Self::new(Box::new(I2cDev::default_bus()))
    }

    /// Write a frequency to the chip. Returns false on any I/O failure.
    pub fn tune(&self, freq_mhz: f64) -> bool {
        let bytes = control_bytes(freq_mhz, false);
        match self.bus.lock().unwrap().write(&bytes) {
            Ok(()) => {
                debug!(target: "tuner", "tuned {:.1} MHz", freq_mhz);
                true
            }
            Err(e) => {
                warn!(target: "tuner", "tune {:.1} MHz failed: {}", freq_mhz, e);
                false
            }
        }
    }

    /// Hardware presence check, informational only: sweeps run with or
    /// without the chip responding.
    pub fn probe(&self) -> bool {
        match self.bus.lock().unwrap().read_status() {
            Ok(status) => {
                info!(target: "tuner", "receiver present, status {:02x?}", status);
                true
            }
            Err(e) => {
                warn!(target: "tuner", "receiver not responding: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex as StdMutex};

    #[test]
    fn pll_encoding_matches_known_frequencies() {
        // 100.0 MHz: pll = 4 * 100_225_000 / 32_768 = 12234 = 0x2FCA
        assert_eq!(control_bytes(100.0, false), [0x2F, 0xCA, 0x10, 0x1E, 0x00]);
        // 88.0 MHz: pll = 4 * 88_225_000 / 32_768 = 10769 = 0x2A11
        assert_eq!(control_bytes(88.0, false), [0x2A, 0x11, 0x10, 0x1E, 0x00]);
    }

    #[test]
    fn mono_flag_sets_byte_three() {
        assert_eq!(control_bytes(100.0, true)[2], 0x18);
        assert_eq!(control_bytes(100.0, false)[2], 0x10);
    }

    struct RecordingBus {
        writes: Arc<StdMutex<Vec<Vec<u8>>>>,
        fail: bool,
    }

    impl TunerBus for RecordingBus {
        fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
            if self.fail {
                return Err(io::Error::new(io::ErrorKind::Other, "bus gone"));
            }
            self.writes.lock().unwrap().push(bytes.to_vec());
            Ok(())
        }
        fn read_status(&mut self) -> io::Result<[u8; 5]> {
            if self.fail {
                return Err(io::Error::new(io::ErrorKind::Other, "bus gone"));
            }
            Ok([0; 5])
        }
    }

    #[test]
    fn tune_reports_bus_failures_without_panicking() {
        let writes = Arc::new(StdMutex::new(Vec::new()));
        let ok = Tuner::new(Box::new(RecordingBus {
            writes: writes.clone(),
            fail: false,
        }));
        assert!(ok.tune(95.5));
        assert_eq!(writes.lock().unwrap().len(), 1);

        let broken = Tuner::new(Box::new(RecordingBus {
            writes: Arc::new(StdMutex::new(Vec::new())),
            fail: true,
        }));
        assert!(!broken.tune(95.5));
        assert!(!broken.probe());
    }
}
