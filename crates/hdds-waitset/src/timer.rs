// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Periodic timer waitable.
//!
//! A timer is ready once its period has elapsed and stays ready until the
//! caller takes its [`TimerInfo`] through the wait result, which re-arms it.
//! The descriptor set bounds its blocking time by the nearest timer
//! deadline, so timers need no background thread.

use crate::context::Context;
use crate::error::{Error, Result};
use crate::rt::WaitsetSignal;
use crate::waitable::{next_waitable_id, SignalHooks, Waitable, WaitableData};
use parking_lot::Mutex;
use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Extra data produced by a ready timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerInfo {
    /// When the timer was scheduled to fire.
    pub expected_call_time: Instant,
    /// When the expiry was taken.
    pub actual_call_time: Instant,
}

struct TimerState {
    next_call: Instant,
    canceled: bool,
}

/// Periodic timer.
pub struct Timer {
    id: u64,
    context: Arc<Context>,
    period: Duration,
    state: Mutex<TimerState>,
    hooks: SignalHooks,
}

impl Timer {
    /// Create a timer in the default context, first firing one period from now.
    pub fn new(period: Duration) -> Result<Self> {
        Self::with_context(Context::default_context(), period)
    }

    /// Create a timer bound to `context`.
    pub fn with_context(context: Arc<Context>, period: Duration) -> Result<Self> {
        if period.is_zero() {
            return Err(Error::InvalidArgument("timer period must be > 0"));
        }
        let next_call = Instant::now()
            .checked_add(period)
            .ok_or(Error::Overflow("timer period exceeds the clock range"))?;

        Ok(Self {
            id: next_waitable_id(),
            context,
            period,
            state: Mutex::new(TimerState {
                next_call,
                canceled: false,
            }),
            hooks: SignalHooks::default(),
        })
    }

    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Stop the timer; it is never ready until [`Timer::reset`].
    pub fn cancel(&self) {
        self.state.lock().canceled = true;
        self.hooks.notify();
    }

    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.state.lock().canceled
    }

    /// Re-arm one period from now and wake waiters so they pick up the new
    /// deadline.
    pub fn reset(&self) {
        {
            let mut state = self.state.lock();
            let now = Instant::now();
            state.canceled = false;
            state.next_call = now.checked_add(self.period).unwrap_or(now);
        }
        self.hooks.notify();
    }

    /// Time left before the next expiry; `None` when canceled.
    #[must_use]
    pub fn time_until_trigger(&self) -> Option<Duration> {
        let state = self.state.lock();
        (!state.canceled).then(|| state.next_call.saturating_duration_since(Instant::now()))
    }

    /// Consume the current expiry, if any, and schedule the next one.
    ///
    /// Missed periods are skipped rather than replayed.
    pub fn call(&self) -> Option<TimerInfo> {
        let now = Instant::now();
        let mut state = self.state.lock();
        if state.canceled || now < state.next_call {
            return None;
        }

        let expected_call_time = state.next_call;
        let behind = now.duration_since(expected_call_time).as_nanos();
        let periods = u32::try_from(behind / self.period.as_nanos() + 1).unwrap_or(u32::MAX);
        state.next_call = expected_call_time
            .checked_add(self.period.saturating_mul(periods))
            .unwrap_or(now + self.period.min(Duration::from_secs(1)));

        Some(TimerInfo {
            expected_call_time,
            actual_call_time: now,
        })
    }
}

impl Waitable for Timer {
    fn waitable_id(&self) -> u64 {
        self.id
    }

    fn context(&self) -> &Arc<Context> {
        &self.context
    }

    fn add_waitset_signal(&self, signal: &Arc<dyn WaitsetSignal>) {
        self.hooks.add(signal);
    }

    fn remove_waitset_signal(&self, signal_id: u64) {
        self.hooks.remove(signal_id);
    }

    fn poll_ready(&self) -> bool {
        let state = self.state.lock();
        !state.canceled && Instant::now() >= state.next_call
    }

    fn next_deadline(&self) -> Option<Instant> {
        let state = self.state.lock();
        (!state.canceled).then_some(state.next_call)
    }

    fn take_data(&self) -> Option<WaitableData> {
        self.call().map(|info| Box::new(info) as WaitableData)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rt::{DriverWake, WaitsetDriver};
    use std::thread;

    #[test]
    fn zero_period_is_rejected() {
        assert!(matches!(
            Timer::new(Duration::ZERO),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn ready_after_period_and_rearmed_by_call() {
        let timer = Timer::new(Duration::from_millis(20)).expect("timer");
        assert!(!timer.poll_ready());
        assert!(timer.call().is_none());

        thread::sleep(Duration::from_millis(30));
        assert!(timer.poll_ready());
        assert!(timer.poll_ready(), "probe does not consume");

        let info = timer.call().expect("expired");
        assert!(info.actual_call_time >= info.expected_call_time);
        assert!(!timer.poll_ready());
    }

    #[test]
    fn cancel_and_reset() {
        let timer = Timer::new(Duration::from_millis(5)).expect("timer");
        timer.cancel();
        assert!(timer.is_canceled());
        assert!(timer.next_deadline().is_none());
        assert!(timer.time_until_trigger().is_none());

        thread::sleep(Duration::from_millis(10));
        assert!(!timer.poll_ready());

        timer.reset();
        assert!(!timer.is_canceled());
        assert!(timer.time_until_trigger().is_some());
    }

    #[test]
    fn cancel_wakes_attached_driver() {
        let driver = WaitsetDriver::new(4).expect("driver");
        let reg = driver.register_slot().expect("register");
        let timer = Timer::new(Duration::from_secs(60)).expect("timer");
        timer.add_waitset_signal(&reg.signal());

        timer.cancel();
        let wake = driver.wait(Some(Duration::from_millis(10))).expect("wait");
        assert_eq!(wake, DriverWake::Signalled(vec![reg.slot_index()]));
    }

    #[test]
    fn missed_periods_are_skipped() {
        let timer = Timer::new(Duration::from_millis(5)).expect("timer");
        thread::sleep(Duration::from_millis(40));
        let info = timer.call().expect("expired");
        let next = timer.next_deadline().expect("armed");
        assert!(next > info.actual_call_time);
    }

    #[test]
    fn take_data_yields_timer_info() {
        let timer = Timer::new(Duration::from_millis(1)).expect("timer");
        thread::sleep(Duration::from_millis(5));
        let data = timer.take_data().expect("expired");
        assert!(data.downcast_ref::<TimerInfo>().is_some());
    }
}
