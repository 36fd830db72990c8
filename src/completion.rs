//! Blocking completion of a DHCPINFORM request.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::lease::{InformWaiter, Parameters};
use crate::time::Duration;
use crate::Result;

/// The result slot a thread waits on while the monitor runs an inform exchange.
///
/// Only the first result is kept.
#[derive(Debug, Default)]
pub struct InformCompletion {
    result: Mutex<Option<Result<Parameters>>>,
    done: Condvar,
}

impl InformCompletion {
    pub fn new() -> InformCompletion {
        InformCompletion::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Result<Parameters>>> {
        self.result.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_complete(&self) -> bool {
        self.lock().is_some()
    }

    /// Block until the exchange is over.
    pub fn wait(&self) -> Result<Parameters> {
        let mut result = self.lock();
        loop {
            if let Some(result) = result.as_ref() {
                return result.clone();
            }
            result = self.done.wait(result).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Block until the exchange is over or `timeout` passes, whichever is first.
    /// `None` on timeout.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<Parameters>> {
        let result = self.lock();
        let (result, _) = self
            .done
            .wait_timeout_while(result, timeout.into(), |result| result.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        result.clone()
    }
}

impl InformWaiter for InformCompletion {
    fn complete(&self, result: Result<Parameters>) {
        let mut slot = self.lock();
        if slot.is_none() {
            *slot = Some(result);
            self.done.notify_all();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Error;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_first_result_wins() {
        let completion = InformCompletion::new();
        assert!(!completion.is_complete());
        completion.complete(Err(Error::NoReply));
        completion.complete(Err(Error::Released));
        assert!(completion.is_complete());
        assert_eq!(completion.wait(), Err(Error::NoReply));
    }

    #[test]
    fn test_timeout() {
        let completion = InformCompletion::new();
        assert_eq!(completion.wait_timeout(Duration::from_millis(10)), None);
    }

    #[test]
    fn test_wakes_waiter() {
        let completion = Arc::new(InformCompletion::new());
        let remote = completion.clone();
        let waiter = thread::spawn(move || remote.wait());
        completion.complete(Err(Error::Released));
        assert_eq!(waiter.join().unwrap(), Err(Error::Released));
    }
}
