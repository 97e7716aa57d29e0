//! In-memory bus, pin and delay doubles that record every transition.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, OutputPin};
use embedded_hal::spi::{self, SpiBus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Control line identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    Dc,
    Cs,
    Reset,
    Backlight,
}

/// One observable bus event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Set(Line, bool),
    Write(Vec<u8>),
    Flush,
    DelayMs(u32),
}

/// Shared, ordered event log.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<Event>>>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: Event) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }

    /// All bytes written, concatenated.
    pub fn written(&self) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Write(bytes) => Some(bytes),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Decodes the log into (command, data) transactions using the DC line.
    pub fn transactions(&self) -> Vec<(u8, Vec<u8>)> {
        let mut dc_high = true;
        let mut out: Vec<(u8, Vec<u8>)> = Vec::new();
        for event in self.events() {
            match event {
                Event::Set(Line::Dc, level) => dc_high = level,
                Event::Write(bytes) if !dc_high => {
                    for b in bytes {
                        out.push((b, Vec::new()));
                    }
                }
                Event::Write(bytes) => {
                    if let Some(last) = out.last_mut() {
                        last.1.extend(bytes);
                    }
                }
                _ => {}
            }
        }
        out
    }
}

/// SPI bus that records writes and can be told to fail.
pub struct MockSpi {
    log: EventLog,
    /// Fail the nth write (0-based) from now on.
    fail_at: Option<usize>,
    writes: usize,
    broken: Arc<AtomicBool>,
}

impl MockSpi {
    pub fn new(log: &EventLog) -> Self {
        Self {
            log: log.clone(),
            fail_at: None,
            writes: 0,
            broken: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle that makes every later write fail while set.
    pub fn fault_switch(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.broken)
    }

    pub fn failing_at(log: &EventLog, write: usize) -> Self {
        Self {
            fail_at: Some(write),
            ..Self::new(log)
        }
    }
}

impl spi::ErrorType for MockSpi {
    type Error = spi::ErrorKind;
}

impl SpiBus for MockSpi {
    fn read(&mut self, _words: &mut [u8]) -> Result<(), Self::Error> {
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        let n = self.writes;
        self.writes += 1;
        if self.fail_at.is_some_and(|at| n >= at) || self.broken.load(Ordering::SeqCst) {
            return Err(spi::ErrorKind::Other);
        }
        self.log.push(Event::Write(words.to_vec()));
        Ok(())
    }

    fn transfer(&mut self, _read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        self.write(write)
    }

    fn transfer_in_place(&mut self, _words: &mut [u8]) -> Result<(), Self::Error> {
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.log.push(Event::Flush);
        Ok(())
    }
}

/// Output line that records level changes.
pub struct MockPin {
    log: EventLog,
    line: Line,
    stuck_low: bool,
}

impl MockPin {
    pub fn new(log: &EventLog, line: Line) -> Self {
        Self {
            log: log.clone(),
            line,
            stuck_low: false,
        }
    }

    /// Line whose `set_high` always fails.
    pub fn stuck_low(log: &EventLog, line: Line) -> Self {
        Self {
            stuck_low: true,
            ..Self::new(log, line)
        }
    }
}

impl digital::ErrorType for MockPin {
    type Error = digital::ErrorKind;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.log.push(Event::Set(self.line, false));
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        if self.stuck_low {
            return Err(digital::ErrorKind::Other);
        }
        self.log.push(Event::Set(self.line, true));
        Ok(())
    }
}

/// Delay that returns immediately and records the requested duration.
pub struct MockDelay {
    log: EventLog,
}

impl MockDelay {
    pub fn new(log: &EventLog) -> Self {
        Self { log: log.clone() }
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.log.push(Event::DelayMs(ns / 1_000_000));
    }

    fn delay_us(&mut self, us: u32) {
        self.log.push(Event::DelayMs(us / 1_000));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.log.push(Event::DelayMs(ms));
    }
}
