//! Process stop signals.
//!
//! References: https://stackoverflow.com/questions/77585473/rust-tokio-how-to-handle-more-signals-than-just-sigint-i-e-sigquit

use std::fmt;
use std::io;

/// The signal that asked the process to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopSignal {
    Terminate,
    Interrupt,
    CtrlBreak,
    CtrlClose,
    CtrlShutdown,
}

impl fmt::Display for StopSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StopSignal::Terminate => "SIGTERM",
            StopSignal::Interrupt => "SIGINT",
            StopSignal::CtrlBreak => "CTRL_BREAK",
            StopSignal::CtrlClose => "CTRL_CLOSE",
            StopSignal::CtrlShutdown => "CTRL_SHUTDOWN",
        };
        f.write_str(name)
    }
}

#[cfg(unix)]
async fn wait_for_signal_impl() -> io::Result<StopSignal> {
    use tokio::signal::unix::{signal, SignalKind};

    // https://www.gnu.org/software/libc/manual/html_node/Termination-Signals.html
    let mut terminate = signal(SignalKind::terminate())?;
    let mut interrupt = signal(SignalKind::interrupt())?;

    Ok(tokio::select! {
        _ = terminate.recv() => StopSignal::Terminate,
        _ = interrupt.recv() => StopSignal::Interrupt,
    })
}

#[cfg(windows)]
async fn wait_for_signal_impl() -> io::Result<StopSignal> {
    use tokio::signal::windows;

    // https://learn.microsoft.com/en-us/windows/console/handlerroutine
    let mut ctrl_c = windows::ctrl_c()?;
    let mut ctrl_break = windows::ctrl_break()?;
    let mut ctrl_close = windows::ctrl_close()?;
    let mut ctrl_shutdown = windows::ctrl_shutdown()?;

    Ok(tokio::select! {
        _ = ctrl_c.recv() => StopSignal::Interrupt,
        _ = ctrl_break.recv() => StopSignal::CtrlBreak,
        _ = ctrl_close.recv() => StopSignal::CtrlClose,
        _ = ctrl_shutdown.recv() => StopSignal::CtrlShutdown,
    })
}

/// Waits until the process is asked to stop.
///
/// Fails only when the signal handlers cannot be installed.
pub async fn wait_for_stop_signal() -> io::Result<StopSignal> {
    wait_for_signal_impl().await
}

#[cfg(test)]
mod tests {
    use super::StopSignal;

    #[test]
    fn stop_signal_names() {
        assert_eq!("SIGTERM", StopSignal::Terminate.to_string());
        assert_eq!("SIGINT", StopSignal::Interrupt.to_string());
        assert_eq!("CTRL_CLOSE", StopSignal::CtrlClose.to_string());
    }
}
