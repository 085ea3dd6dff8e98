// Interruptible blocking waits on a socket descriptor.
//
// Each connection owns one `SocketWaiter`. A waiting thread polls the socket
// and a wake pipe together; `interrupt` clears the liveness flag and writes
// one wake byte per potentially-waiting thread (one reader, one writer), so a
// wakeup is never lost even when nobody is waiting yet: the next `wait` sees
// the dead flag before it ever reaches `poll`.

use std::fs::File;
use std::io::{Read, Write};
use std::os::fd::{AsFd, BorrowedFd};
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitDirection {
    Read,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The socket is ready in the requested direction.
    Ready,
    /// The timeout elapsed first.
    TimedOut,
    /// `interrupt` was called; the waiter is permanently dead.
    Interrupted,
    /// The descriptor is not valid (closed concurrently or never open).
    Closed,
}

struct WaiterState {
    alive: bool,
    waiting: u32,
}

pub struct SocketWaiter {
    state: Mutex<WaiterState>,
    wake_rx: File,
    wake_tx: File,
}

impl SocketWaiter {
    pub fn new() -> crate::error::Result<Self> {
        let (rx, tx) = nix::unistd::pipe().map_err(std::io::Error::from)?;
        Ok(SocketWaiter {
            state: Mutex::new(WaiterState {
                alive: true,
                waiting: 0,
            }),
            wake_rx: File::from(rx),
            wake_tx: File::from(tx),
        })
    }

    pub fn is_alive(&self) -> bool {
        self.state.lock().alive
    }

    #[cfg(test)]
    fn waiting_threads(&self) -> u32 {
        self.state.lock().waiting
    }

    /// Block until `fd` is ready in `direction`, the timeout elapses, the
    /// waiter is interrupted, or the descriptor turns out to be closed.
    /// `Duration::ZERO` blocks indefinitely.
    pub fn wait(&self, fd: BorrowedFd<'_>, direction: WaitDirection, timeout: Duration) -> WaitOutcome {
        {
            let mut state = self.state.lock();
            if !state.alive {
                return WaitOutcome::Interrupted;
            }
            state.waiting += 1;
        }
        let outcome = self.wait_inner(fd, direction, timeout);
        self.state.lock().waiting -= 1;
        outcome
    }

    fn wait_inner(
        &self,
        fd: BorrowedFd<'_>,
        direction: WaitDirection,
        timeout: Duration,
    ) -> WaitOutcome {
        if !fd_is_valid(fd) {
            return WaitOutcome::Closed;
        }

        let deadline = (!timeout.is_zero()).then(|| Instant::now() + timeout);
        let events = match direction {
            WaitDirection::Read => PollFlags::POLLIN,
            WaitDirection::Write => PollFlags::POLLOUT,
        };

        loop {
            // Long deadlines are chunked; the deadline check at the top of
            // each iteration decides when the wait is really over.
            let poll_timeout = match deadline {
                None => PollTimeout::NONE,
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return WaitOutcome::TimedOut;
                    }
                    let millis = (deadline - now).as_millis().saturating_add(1);
                    PollTimeout::from(u16::try_from(millis).unwrap_or(u16::MAX))
                }
            };

            let mut fds = [
                PollFd::new(fd, events),
                PollFd::new(self.wake_rx.as_fd(), PollFlags::POLLIN),
            ];
            match poll(&mut fds, poll_timeout) {
                Err(Errno::EINTR) => continue,
                Err(_) => return WaitOutcome::Closed,
                Ok(0) => continue,
                Ok(_) => (),
            }

            let socket_revents = fds[0].revents().unwrap_or(PollFlags::empty());
            let wake_revents = fds[1].revents().unwrap_or(PollFlags::empty());

            // An interrupt wins over simultaneous socket readiness.
            if wake_revents.contains(PollFlags::POLLIN) {
                let mut byte = [0u8; 1];
                let _ = (&self.wake_rx).read(&mut byte);
                return WaitOutcome::Interrupted;
            }
            if socket_revents.contains(PollFlags::POLLNVAL) {
                return WaitOutcome::Closed;
            }
            if !socket_revents.is_empty() {
                if !fd_is_valid(fd) {
                    return WaitOutcome::Closed;
                }
                if !self.state.lock().alive {
                    return WaitOutcome::Interrupted;
                }
                return WaitOutcome::Ready;
            }
        }
    }

    /// Permanently kill the waiter and wake any blocked threads. Idempotent.
    pub fn interrupt(&self) {
        {
            let mut state = self.state.lock();
            if !state.alive {
                return;
            }
            state.alive = false;
        }
        // One byte per potential waiter: one reader, one writer. A 2-byte
        // write into an empty pipe cannot block.
        for _ in 0..2 {
            let _ = (&self.wake_tx).write(&[0u8]);
        }
    }
}

fn fd_is_valid(fd: BorrowedFd<'_>) -> bool {
    let mut fds = [PollFd::new(fd, PollFlags::empty())];
    loop {
        match poll(&mut fds, PollTimeout::ZERO) {
            Err(Errno::EINTR) => continue,
            Err(_) => return false,
            Ok(_) => {
                let revents = fds[0].revents().unwrap_or(PollFlags::POLLNVAL);
                return !revents.contains(PollFlags::POLLNVAL);
            }
        }
    }
}
