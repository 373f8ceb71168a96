//! Process-wide media subsystem guard.
//!
//! Some platform backends require a media runtime that must be brought
//! up once per process and torn down only after the last user is gone.
//! Sessions hold a [`MediaGuard`] for their lifetime; the underlying
//! startup/shutdown hooks run on the 0→1 and 1→0 refcount edges only,
//! no matter how many sessions overlap.

use parking_lot::Mutex;

static REFCOUNT: Mutex<usize> = Mutex::new(0);

/// RAII handle on the shared media runtime.
pub struct MediaGuard {
    _private: (),
}

impl MediaGuard {
    /// Take a reference on the media runtime, starting it if this is
    /// the first holder in the process.
    pub fn acquire() -> Self {
        let mut count = REFCOUNT.lock();
        if *count == 0 {
            log::debug!("media subsystem starting");
        }
        *count += 1;
        Self { _private: () }
    }

    /// Current number of live guards, for diagnostics.
    pub fn holders() -> usize {
        *REFCOUNT.lock()
    }
}

impl Drop for MediaGuard {
    fn drop(&mut self) {
        let mut count = REFCOUNT.lock();
        *count -= 1;
        if *count == 0 {
            log::debug!("media subsystem shut down");
        }
    }
}
