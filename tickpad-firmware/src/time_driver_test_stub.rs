extern crate std;

use core::{cell::RefCell, task::Waker};
use embassy_time_driver::Driver;
use std::time::SystemTime;

struct TestTimeDriver;

impl Driver for TestTimeDriver {
    fn now(&self) -> u64 {
        NOW.with_borrow(|now| {
            if now.0 == 0 {
                SystemTime::now()
                    .duration_since(SystemTime::UNIX_EPOCH)
                    .unwrap()
                    .as_micros() as u64
            } else {
                now.0
            }
        })
    }

    /// A manual clock jumps straight to the wake time (plus any configured lag).
    fn schedule_wake(&self, at: u64, waker: &Waker) {
        NOW.with_borrow_mut(|now| {
            if now.0 != 0 && at > now.0 {
                now.0 = at + now.1;
            }
        });

        waker.wake_by_ref();
    }
}

std::thread_local! {
    /// (manual time in micros or 0 for the system clock, lag added to each wake)
    static NOW: RefCell<(u64,u64)> = const {RefCell::new((0,0))};
}

embassy_time_driver::time_driver_impl!(static TIME_DRIVER: TestTimeDriver = TestTimeDriver);

/// Switch this thread to a manual clock reading `t` micros.
pub fn set_time(t: u64) {
    NOW.with_borrow_mut(|now| now.0 = t);
}

pub fn advance_time(us: u64) {
    NOW.with_borrow_mut(|now| now.0 += us);
}

pub fn set_wait_lag(t: u64) {
    NOW.with_borrow_mut(|now| now.1 = t);
}
