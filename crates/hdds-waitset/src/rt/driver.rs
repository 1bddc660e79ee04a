// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Event-backed blocking driver.
//!
//! Every descriptor of a wait set owns one driver slot. Entities hold a weak
//! [`WaitsetSignal`] for their slot and call `signal()` when they become
//! ready, which wakes the thread blocked in [`WaitsetDriver::wait`].
//!
//! - On Linux/Unix: eventfd + poll.
//! - On Windows: manual-reset kernel Event + WaitForSingleObject.

use super::bitmap::SignalBitmap;
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Slot ids are process-wide so entity hooks from different drivers never
/// collide.
static NEXT_SLOT_ID: AtomicU64 = AtomicU64::new(1);

/// Handle given to entities so they can wake the driver.
///
/// Entities keep a weak reference and call `signal()` when they become
/// ready. The id is unique per registration and is used to detach cleanly.
pub trait WaitsetSignal: Send + Sync {
    /// Notify the driver that the associated slot became active.
    fn signal(&self);

    /// Stable identifier for this registration.
    fn id(&self) -> u64;
}

/// Outcome of a single blocking call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverWake {
    /// Woken by signals; the slot indices that fired (may be empty after a
    /// manual notify).
    Signalled(Vec<usize>),
    /// The timeout elapsed without any signal.
    TimedOut,
}

/// Blocking primitive shared by all descriptors of one wait set.
#[derive(Clone)]
pub struct WaitsetDriver {
    inner: Arc<DriverInner>,
}

impl WaitsetDriver {
    /// Create a driver able to track up to `max_slots` registrations.
    pub fn new(max_slots: usize) -> Result<Self> {
        if max_slots == 0 {
            return Err(Error::InvalidArgument("max_slots must be > 0"));
        }

        let event_handle = platform::create_event()?;

        Ok(Self {
            inner: Arc::new(DriverInner {
                event_handle,
                pending: SignalBitmap::new(max_slots),
                slots: Mutex::new(SlotTable::new()),
                max_slots,
            }),
        })
    }

    /// Allocate a slot and return its registration.
    pub fn register_slot(&self) -> Result<WaitsetRegistration> {
        let (slot_index, slot_id) = self.inner.slots.lock().allocate(self.inner.max_slots)?;

        let signal = Arc::new(SignalHandle {
            inner: Arc::downgrade(&self.inner),
            slot_index,
            slot_id,
        });

        Ok(WaitsetRegistration {
            slot_index,
            slot_id,
            signal,
        })
    }

    /// Release a slot. Returns `true` if the registration was still live.
    pub fn unregister_slot(&self, slot_index: usize, slot_id: u64) -> bool {
        let released = self.inner.slots.lock().release(slot_index, slot_id);
        if released {
            self.inner.pending.clear(slot_index);
        }
        released
    }

    /// Number of live registrations.
    #[must_use]
    pub fn registered(&self) -> usize {
        self.inner.slots.lock().live
    }

    #[must_use]
    pub fn max_slots(&self) -> usize {
        self.inner.max_slots
    }

    /// Block until a slot is signalled or `timeout` elapses (`None` = forever).
    pub fn wait(&self, timeout: Option<Duration>) -> Result<DriverWake> {
        if !platform::wait_event(&self.inner.event_handle, timeout)? {
            return Ok(DriverWake::TimedOut);
        }
        platform::drain_event(&self.inner.event_handle);
        Ok(DriverWake::Signalled(self.inner.pending.drain()))
    }

    /// Wake a blocked `wait()` without marking any slot.
    pub fn manual_notify(&self) {
        platform::signal_event(&self.inner.event_handle);
    }
}

struct DriverInner {
    event_handle: platform::EventHandle,
    pending: SignalBitmap,
    slots: Mutex<SlotTable>,
    max_slots: usize,
}

impl DriverInner {
    fn signal_slot(&self, slot_index: usize, slot_id: u64) {
        if !self.slots.lock().is_live(slot_index, slot_id) {
            return;
        }
        if !self.pending.mark(slot_index) {
            platform::signal_event(&self.event_handle);
        }
    }
}

impl Drop for DriverInner {
    fn drop(&mut self) {
        platform::close_event(&self.event_handle);
    }
}

// =============================================================================
// Unix implementation (eventfd + poll)
// =============================================================================
#[cfg(unix)]
mod platform {
    use std::io;
    use std::os::fd::RawFd;
    use std::time::Duration;

    const EVENTFD_FLAGS: libc::c_int = libc::EFD_NONBLOCK | libc::EFD_CLOEXEC;

    pub type EventHandle = RawFd;

    pub fn create_event() -> io::Result<EventHandle> {
        // SAFETY: eventfd is invoked with valid flags and no shared state.
        let fd = unsafe { libc::eventfd(0, EVENTFD_FLAGS) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(fd)
    }

    /// Round up so sub-millisecond budgets still block instead of spinning.
    fn timeout_ms(timeout: Option<Duration>) -> libc::c_int {
        match timeout {
            None => -1,
            Some(d) => {
                let ms = d.as_nanos().div_ceil(1_000_000);
                libc::c_int::try_from(ms).unwrap_or(libc::c_int::MAX)
            }
        }
    }

    /// Returns `Ok(true)` when the event fired, `Ok(false)` on timeout.
    pub fn wait_event(handle: &EventHandle, timeout: Option<Duration>) -> io::Result<bool> {
        let timeout_ms = timeout_ms(timeout);
        let mut pollfd = libc::pollfd {
            fd: *handle,
            events: libc::POLLIN,
            revents: 0,
        };

        loop {
            // SAFETY: poll_target points to our stack-allocated pollfd structure.
            let poll_target = std::ptr::addr_of_mut!(pollfd);
            let res = unsafe { libc::poll(poll_target, 1, timeout_ms) };
            if res == 0 {
                return Ok(false);
            }
            if res > 0 {
                return Ok(true);
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
        }
    }

    pub fn signal_event(handle: &EventHandle) {
        let payload = 1u64.to_ne_bytes();
        loop {
            // SAFETY: payload references a stack buffer with the 8-byte eventfd payload.
            let ret = unsafe { libc::write(*handle, payload.as_ptr().cast(), payload.len()) };
            if ret >= 0 {
                break;
            }

            let err = io::Error::last_os_error();
            match err.kind() {
                io::ErrorKind::Interrupted => continue,
                io::ErrorKind::WouldBlock => break,
                _ => {
                    log::debug!("[rt] waitset eventfd write failed: {}", err);
                    break;
                }
            }
        }
    }

    pub fn drain_event(handle: &EventHandle) {
        let mut payload = [0u8; 8];
        loop {
            // SAFETY: payload is a stack buffer sized to the eventfd read requirements (8 bytes).
            let ret = unsafe { libc::read(*handle, payload.as_mut_ptr().cast(), payload.len()) };
            if ret >= 0 {
                break;
            }

            let err = io::Error::last_os_error();
            match err.kind() {
                io::ErrorKind::Interrupted => continue,
                io::ErrorKind::WouldBlock => break,
                _ => {
                    log::debug!("[rt] waitset eventfd read failed: {}", err);
                    break;
                }
            }
        }
    }

    pub fn close_event(handle: &EventHandle) {
        // SAFETY: eventfd was obtained via libc::eventfd and is closed once here.
        unsafe {
            libc::close(*handle);
        }
    }
}

// =============================================================================
// Windows implementation (kernel Event object)
// =============================================================================
#[cfg(windows)]
mod platform {
    use std::io;
    use std::time::Duration;

    const INFINITE: u32 = 0xFFFF_FFFF;
    const WAIT_OBJECT_0: u32 = 0;
    const WAIT_TIMEOUT: u32 = 258;

    pub struct EventHandle(std::os::windows::io::RawHandle);

    // SAFETY: Windows Event objects are inherently thread-safe kernel objects.
    unsafe impl Send for EventHandle {}
    unsafe impl Sync for EventHandle {}

    extern "system" {
        fn CreateEventW(
            lpEventAttributes: *const std::ffi::c_void,
            bManualReset: i32,
            bInitialState: i32,
            lpName: *const u16,
        ) -> *mut std::ffi::c_void;
        fn SetEvent(hEvent: *mut std::ffi::c_void) -> i32;
        fn ResetEvent(hEvent: *mut std::ffi::c_void) -> i32;
        fn WaitForSingleObject(hHandle: *mut std::ffi::c_void, dwMilliseconds: u32) -> u32;
        fn CloseHandle(hObject: *mut std::ffi::c_void) -> i32;
    }

    pub fn create_event() -> io::Result<EventHandle> {
        // Manual-reset event, initially non-signaled.
        // SAFETY: CreateEventW FFI with null security attributes and name (valid for unnamed event)
        let handle = unsafe { CreateEventW(std::ptr::null(), 1, 0, std::ptr::null()) };
        if handle.is_null() {
            return Err(io::Error::last_os_error());
        }
        Ok(EventHandle(handle as std::os::windows::io::RawHandle))
    }

    pub fn wait_event(handle: &EventHandle, timeout: Option<Duration>) -> io::Result<bool> {
        let timeout_ms = timeout
            .map(|d| u32::try_from(d.as_nanos().div_ceil(1_000_000)).unwrap_or(INFINITE - 1))
            .unwrap_or(INFINITE);

        // SAFETY: WaitForSingleObject FFI with valid event handle from CreateEventW
        match unsafe { WaitForSingleObject(handle.0 as *mut _, timeout_ms) } {
            WAIT_OBJECT_0 => Ok(true),
            WAIT_TIMEOUT => Ok(false),
            _ => Err(io::Error::last_os_error()),
        }
    }

    pub fn signal_event(handle: &EventHandle) {
        // SAFETY: SetEvent FFI with valid event handle from CreateEventW
        unsafe {
            SetEvent(handle.0 as *mut _);
        }
    }

    pub fn drain_event(handle: &EventHandle) {
        // SAFETY: ResetEvent FFI with valid event handle from CreateEventW
        unsafe {
            ResetEvent(handle.0 as *mut _);
        }
    }

    pub fn close_event(handle: &EventHandle) {
        // SAFETY: CloseHandle FFI with valid event handle from CreateEventW, called once in Drop
        unsafe {
            CloseHandle(handle.0 as *mut _);
        }
    }
}

/// Registration returned by [`WaitsetDriver::register_slot`].
pub struct WaitsetRegistration {
    slot_index: usize,
    slot_id: u64,
    signal: Arc<SignalHandle>,
}

impl WaitsetRegistration {
    #[must_use]
    pub fn slot_index(&self) -> usize {
        self.slot_index
    }

    #[must_use]
    pub fn slot_id(&self) -> u64 {
        self.slot_id
    }

    /// Erase the concrete type so callers can store `Arc<dyn WaitsetSignal>`.
    #[must_use]
    pub fn signal(&self) -> Arc<dyn WaitsetSignal> {
        Arc::clone(&self.signal) as Arc<dyn WaitsetSignal>
    }
}

struct SignalHandle {
    inner: Weak<DriverInner>,
    slot_index: usize,
    slot_id: u64,
}

impl WaitsetSignal for SignalHandle {
    fn signal(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.signal_slot(self.slot_index, self.slot_id);
        }
    }

    fn id(&self) -> u64 {
        self.slot_id
    }
}

/// Slot ids per index; `None` marks a free index.
struct SlotTable {
    entries: Vec<Option<u64>>,
    free: Vec<usize>,
    live: usize,
}

impl SlotTable {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    fn allocate(&mut self, max_slots: usize) -> Result<(usize, u64)> {
        let slot_index = match self.free.pop() {
            Some(index) => index,
            None => {
                let index = self.entries.len();
                if index >= max_slots {
                    return Err(Error::CapacityExceeded(max_slots));
                }
                self.entries.push(None);
                index
            }
        };

        let slot_id = NEXT_SLOT_ID.fetch_add(1, Ordering::Relaxed);
        self.entries[slot_index] = Some(slot_id);
        self.live += 1;

        Ok((slot_index, slot_id))
    }

    fn release(&mut self, slot_index: usize, slot_id: u64) -> bool {
        match self.entries.get(slot_index) {
            Some(Some(id)) if *id == slot_id => {
                self.entries[slot_index] = None;
                self.free.push(slot_index);
                self.live -= 1;
                true
            }
            _ => false,
        }
    }

    fn is_live(&self, slot_index: usize, slot_id: u64) -> bool {
        matches!(self.entries.get(slot_index), Some(Some(id)) if *id == slot_id)
    }
}
