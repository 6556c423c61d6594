use crate::error::Error;
use crate::shutdown::ShutdownToken;
use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
use signal_hook::iterator::{Handle, Signals};
use std::thread::{self, JoinHandle};
use tracing::{debug, info};

/// Background thread translating process signals into the shutdown token.
///
/// SIGTERM and SIGINT request a graceful shutdown. SIGHUP is reserved and ignored.
pub struct SignalListener {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

impl SignalListener {
    pub fn install(shutdown: ShutdownToken) -> Result<Self, Error> {
        let mut signals = Signals::new([SIGTERM, SIGINT, SIGHUP])?;
        let handle = signals.handle();

        let thread = thread::Builder::new()
            .name("signals".to_string())
            .spawn(move || {
                for signal in signals.forever() {
                    match signal {
                        SIGTERM | SIGINT => {
                            info!("Received signal {}, shutting down", signal);
                            shutdown.trigger();
                        }
                        SIGHUP => debug!("Received SIGHUP, ignoring"),
                        other => debug!("Unexpected signal {}", other),
                    }
                }
            })?;

        Ok(Self {
            handle,
            thread: Some(thread),
        })
    }

    pub fn close(mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
