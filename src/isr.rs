//! State shared between interrupt handlers and the main loop
//!
//! Handlers only ever record a timestamp or raise a flag. The main loop
//! collects them inside short critical sections, so nothing in the decision
//! core runs in interrupt context.
//!
//! The types are `const`-constructible and meant to live in `static`s:
//!
//! ```
//! use lean_signal::isr::SharedInputs;
//!
//! static INPUTS: SharedInputs = SharedInputs::new();
//!
//! // hall sensor edge handler
//! fn on_hall_edge(rtc_counter: u32) {
//!     INPUTS.pulses.record(rtc_counter);
//! }
//!
//! // IMU data-ready handler
//! fn on_data_ready() {
//!     INPUTS.data_ready.set();
//! }
//!
//! on_hall_edge(1200);
//! on_data_ready();
//!
//! let drained = INPUTS.pulses.drain();
//! assert_eq!(drained.ticks.as_slice(), &[1200]);
//! assert!(INPUTS.data_ready.take());
//! assert!(!INPUTS.data_ready.take());
//! ```

use core::cell::{Cell, RefCell};

use critical_section::Mutex;
use heapless::{Deque, Vec};

/// Pulse timestamps buffered between two main-loop iterations
pub const PULSE_QUEUE_CAPACITY: usize = 32;

/// Pulses taken out of a [`PulseQueue`]
#[derive(Debug, Clone, Default)]
pub struct DrainedPulses<const N: usize> {
    /// Timestamps in arrival order
    pub ticks: Vec<u32, N>,
    /// Pulses that arrived while the queue was full
    pub missed: u32,
}

#[derive(Debug)]
struct PulseBuffer<const N: usize> {
    ticks: Deque<u32, N>,
    missed: u32,
}

/// Wheel pulse timestamps recorded from the hall-sensor interrupt
///
/// When the queue is full the oldest timestamp is dropped and counted as
/// missed, so the drained ticks are always the most recent ones.
pub struct PulseQueue<const N: usize = PULSE_QUEUE_CAPACITY> {
    inner: Mutex<RefCell<PulseBuffer<N>>>,
}

impl<const N: usize> PulseQueue<N> {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(PulseBuffer {
                ticks: Deque::new(),
                missed: 0,
            })),
        }
    }

    /// Record one pulse; safe to call from an interrupt handler
    pub fn record(&self, now_ticks: u32) {
        critical_section::with(|cs| {
            let mut buffer = self.inner.borrow_ref_mut(cs);
            if buffer.ticks.is_full() {
                buffer.ticks.pop_front();
                buffer.missed = buffer.missed.saturating_add(1);
            }
            let _ = buffer.ticks.push_back(now_ticks);
        });
    }

    /// Take every buffered pulse
    pub fn drain(&self) -> DrainedPulses<N> {
        critical_section::with(|cs| {
            let mut buffer = self.inner.borrow_ref_mut(cs);
            let mut drained = DrainedPulses {
                ticks: Vec::new(),
                missed: core::mem::take(&mut buffer.missed),
            };
            while let Some(tick) = buffer.ticks.pop_front() {
                // Same capacity on both sides
                let _ = drained.ticks.push(tick);
            }
            drained
        })
    }

    /// Buffered timestamps
    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.inner.borrow_ref(cs).ticks.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<const N: usize> Default for PulseQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Flag raised by the sensor's data-ready interrupt
pub struct DataReady {
    flag: Mutex<Cell<bool>>,
}

impl DataReady {
    pub const fn new() -> Self {
        Self {
            flag: Mutex::new(Cell::new(false)),
        }
    }

    /// Mark a fresh sample as available
    pub fn set(&self) {
        critical_section::with(|cs| self.flag.borrow(cs).set(true));
    }

    /// Read and clear the flag
    pub fn take(&self) -> bool {
        critical_section::with(|cs| self.flag.borrow(cs).replace(false))
    }
}

impl Default for DataReady {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the interrupt handlers hand to the main loop
#[derive(Default)]
pub struct SharedInputs {
    pub pulses: PulseQueue,
    pub data_ready: DataReady,
}

impl SharedInputs {
    pub const fn new() -> Self {
        Self {
            pulses: PulseQueue::new(),
            data_ready: DataReady::new(),
        }
    }
}
