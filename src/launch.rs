use crate::call::CallerInfo;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

pub const DEFAULT_DELAY_SECS: u32 = 5;

/// Reads the delay typed into the prompt. Blank or unparsable input falls back
/// to `default`.
pub fn parse_delay_secs(input: &str, default: u32) -> u32 {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return default;
    }
    match trimmed.parse::<u32>() {
        Ok(secs) => secs,
        Err(e) => {
            log::warn!("Ignoring delay {trimmed:?} ({e}), using {default}s");
            default
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub caller: CallerInfo,
    pub delay: Duration,
}

impl LaunchRequest {
    pub fn new(caller: CallerInfo, delay_input: &str, default_secs: u32) -> Self {
        let secs = parse_delay_secs(delay_input, default_secs);
        Self {
            caller,
            delay: Duration::from_secs(u64::from(secs)),
        }
    }
}

/// A one-shot launch queued on the main loop. Fires at most once.
pub struct PendingCall {
    source: Rc<RefCell<Option<glib::SourceId>>>,
}

impl PendingCall {
    pub fn schedule<F>(delay: Duration, launch: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self::schedule_holding(delay, (), launch)
    }

    /// Like [`schedule`](Self::schedule), but keeps `hold` alive until the launch
    /// has run or been cancelled.
    pub fn schedule_holding<H, F>(delay: Duration, hold: H, launch: F) -> Self
    where
        H: 'static,
        F: FnOnce() + 'static,
    {
        let source = Rc::new(RefCell::new(None));
        let fired = source.clone();
        let id = glib::timeout_add_local_once(delay, move || {
            // The source is gone once this returns; forget the id so cancel() can't remove it.
            fired.borrow_mut().take();
            launch();
            drop(hold);
        });
        *source.borrow_mut() = Some(id);
        Self { source }
    }

    pub fn is_pending(&self) -> bool {
        self.source.borrow().is_some()
    }

    /// Drops the queued launch. Returns false when it already fired or was cancelled.
    pub fn cancel(&self) -> bool {
        match self.source.borrow_mut().take() {
            Some(id) => {
                id.remove();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::time::Instant;

    #[test]
    fn blank_or_garbage_uses_default() {
        assert_eq!(parse_delay_secs("", 5), 5);
        assert_eq!(parse_delay_secs("   ", 5), 5);
        assert_eq!(parse_delay_secs("soon", 5), 5);
        assert_eq!(parse_delay_secs("-3", 5), 5);
        assert_eq!(parse_delay_secs("2.5", 5), 5);
        assert_eq!(parse_delay_secs("99999999999", 5), 5);
    }

    #[test]
    fn numeric_input_is_taken_verbatim() {
        assert_eq!(parse_delay_secs("0", 5), 0);
        assert_eq!(parse_delay_secs(" 12 ", 5), 12);
        assert_eq!(parse_delay_secs("30", 7), 30);
    }

    #[test]
    fn launch_request_carries_caller() {
        let caller = CallerInfo::new(Some("Mom".into()), Some("voice_1.mp3".into()));
        let req = LaunchRequest::new(caller.clone(), "abc", DEFAULT_DELAY_SECS);
        assert_eq!(req.caller, caller);
        assert_eq!(req.delay, Duration::from_secs(5));
    }

    // Everything touching the default main context lives in one test.
    #[test]
    fn pending_call_fires_once_or_cancels() {
        let ctx = glib::MainContext::default();
        let _guard = ctx.acquire().unwrap();

        let fired = Rc::new(Cell::new(0));
        let counter = fired.clone();
        let held = Rc::new(());
        let started = Instant::now();
        let pending = PendingCall::schedule_holding(Duration::ZERO, held.clone(), move || {
            counter.set(counter.get() + 1)
        });
        assert!(pending.is_pending());
        assert_eq!(Rc::strong_count(&held), 2);
        while fired.get() == 0 && started.elapsed() < Duration::from_secs(5) {
            ctx.iteration(true);
        }
        assert_eq!(fired.get(), 1);
        assert_eq!(Rc::strong_count(&held), 1);
        assert!(!pending.is_pending());
        assert!(!pending.cancel());
        while ctx.iteration(false) {}
        assert_eq!(fired.get(), 1);

        let cancelled = Rc::new(Cell::new(false));
        let flag = cancelled.clone();
        let pending =
            PendingCall::schedule_holding(Duration::from_secs(60), held.clone(), move || flag.set(true));
        assert_eq!(Rc::strong_count(&held), 2);
        assert!(pending.cancel());
        assert_eq!(Rc::strong_count(&held), 1);
        assert!(!pending.is_pending());
        while ctx.iteration(false) {}
        assert!(!cancelled.get());
    }
}
