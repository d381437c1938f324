//! Bridge from SIGINT/SIGTERM to a [`CancelToken`].
//!
//! The handler only flips an atomic; a relay thread forwards it to the token
//! so cancellation follows the normal teardown path.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crate::session::CancelToken;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

const RELAY_POLL: Duration = Duration::from_millis(10);

#[cfg(unix)]
extern "C" fn on_signal(_signo: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Whether an interrupt has been received.
pub fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Install the handlers and cancel `token` once an interrupt arrives.
#[cfg(unix)]
pub fn install(token: CancelToken) -> io::Result<()> {
    let handler: extern "C" fn(libc::c_int) = on_signal;
    for signo in [libc::SIGINT, libc::SIGTERM] {
        let previous = unsafe { libc::signal(signo, handler as libc::sighandler_t) };
        if previous == libc::SIG_ERR {
            return Err(io::Error::last_os_error());
        }
    }
    spawn_relay(token)
}

/// No signal support off Unix; the token can still be cancelled directly.
#[cfg(not(unix))]
pub fn install(token: CancelToken) -> io::Result<()> {
    spawn_relay(token)
}

fn spawn_relay(token: CancelToken) -> io::Result<()> {
    thread::Builder::new()
        .name("signal-relay".to_string())
        .spawn(move || {
            while !interrupted() {
                thread::sleep(RELAY_POLL);
            }
            tracing::warn!("interrupt received, cancelling session");
            token.cancel();
        })
        .map(|_| ())
}
