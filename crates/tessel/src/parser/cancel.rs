use crate::error::CancelReason;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cooperative cancellation, polled once per parser step.
#[derive(Debug)]
pub(crate) struct CancelCheck {
    flag: Option<Arc<AtomicBool>>,
    budget: Option<u64>,
    deadline: Option<Instant>,
    operations: u64,
}

impl CancelCheck {
    pub fn new(flag: Option<Arc<AtomicBool>>, budget: Option<u64>, timeout: Option<Duration>) -> Self {
        Self {
            flag,
            budget,
            deadline: timeout.map(|timeout| Instant::now() + timeout),
            operations: 0,
        }
    }

    pub fn tick(&mut self) -> Result<(), CancelReason> {
        self.operations += 1;
        if self.flag.as_ref().is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            return Err(CancelReason::Flag);
        }
        if self.budget.is_some_and(|budget| self.operations > budget) {
            return Err(CancelReason::Budget);
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(CancelReason::Timeout);
        }
        Ok(())
    }

    pub const fn operations(&self) -> u64 {
        self.operations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_trips_after_limit() {
        let mut check = CancelCheck::new(None, Some(2), None);
        assert!(check.tick().is_ok());
        assert!(check.tick().is_ok());
        assert_eq!(check.tick(), Err(CancelReason::Budget));
    }

    #[test]
    fn test_flag_trips_immediately() {
        let flag = Arc::new(AtomicBool::new(false));
        let mut check = CancelCheck::new(Some(flag.clone()), None, None);
        assert!(check.tick().is_ok());
        flag.store(true, Ordering::Relaxed);
        assert_eq!(check.tick(), Err(CancelReason::Flag));
    }

    #[test]
    fn test_zero_timeout_trips() {
        let mut check = CancelCheck::new(None, None, Some(Duration::ZERO));
        assert_eq!(check.tick(), Err(CancelReason::Timeout));
    }
}
