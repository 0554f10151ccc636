//! Process signals that stop or reconfigure the players.
//!
//! On Unix, SIGTERM and Ctrl-C stop the process and SIGHUP rereads the
//! configuration. Elsewhere only Ctrl-C is watched.
//!
//! ```no_run
//! use cloudtune::signal::{Handler, Signal};
//!
//! async fn wait() -> cloudtune::error::Result<()> {
//!     let mut signals = Handler::new()?;
//!     while signals.recv().await == Signal::Reload {
//!         // reread the configuration
//!     }
//!     Ok(())
//! }
//! ```

use std::fmt;

use crate::error::Result;

#[cfg(unix)]
use tokio::signal::unix::{self, SignalKind};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Signal {
    /// Ctrl-C
    Interrupt,
    /// SIGTERM
    Terminate,
    /// SIGHUP
    Reload,
}

impl Signal {
    #[must_use]
    pub fn is_shutdown(self) -> bool {
        matches!(self, Self::Interrupt | Self::Terminate)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupt => write!(f, "Ctrl+C"),
            Self::Terminate => write!(f, "SIGTERM"),
            Self::Reload => write!(f, "SIGHUP"),
        }
    }
}

pub struct Handler {
    #[cfg(unix)]
    terminate: unix::Signal,
    #[cfg(unix)]
    reload: unix::Signal,
}

impl Handler {
    /// Registers the signal listeners.
    ///
    /// # Errors
    ///
    /// Returns an error if a listener cannot be registered.
    pub fn new() -> Result<Self> {
        #[cfg(unix)]
        {
            Ok(Self {
                terminate: unix::signal(SignalKind::terminate())?,
                reload: unix::signal(SignalKind::hangup())?,
            })
        }

        #[cfg(not(unix))]
        Ok(Self {})
    }

    /// Waits for the next signal.
    pub async fn recv(&mut self) -> Signal {
        #[cfg(unix)]
        {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => Signal::Interrupt,
                _ = self.terminate.recv() => Signal::Terminate,
                _ = self.reload.recv() => Signal::Reload,
            }
        }

        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
            Signal::Interrupt
        }
    }
}
