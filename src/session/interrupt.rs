//! Ctrl-C delivered as a cloneable notification the session can race against.

use std::io;

use tokio::sync::watch;
use tracing::debug;

#[derive(Debug)]
pub struct InterruptTrigger {
    tx: watch::Sender<u64>,
}

impl InterruptTrigger {
    pub fn trigger(&self) {
        self.tx.send_modify(|n| *n += 1);
    }
}

#[derive(Debug, Clone)]
pub struct Interrupt {
    rx: watch::Receiver<u64>,
}

impl Interrupt {
    /// Resolves on the next trigger after this point. Never resolves once the trigger is gone.
    pub async fn recv(&mut self) {
        if self.rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

pub fn channel() -> (InterruptTrigger, Interrupt) {
    let (tx, rx) = watch::channel(0);
    (InterruptTrigger { tx }, Interrupt { rx })
}

/// Forward every Ctrl-C received by the process into an [`Interrupt`].
///
/// The handler is installed before this returns, so a Ctrl-C arriving at any later point
/// is delivered rather than taking the default action.
pub fn ctrl_c() -> io::Result<Interrupt> {
    let (trigger, interrupt) = channel();
    #[cfg(unix)]
    let mut signals = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;
    #[cfg(windows)]
    let mut signals = tokio::signal::windows::ctrl_c()?;

    tokio::spawn(async move {
        while signals.recv().await.is_some() {
            debug!("interrupt received");
            trigger.trigger();
        }
    });
    Ok(interrupt)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn every_clone_sees_a_trigger() {
        let (trigger, mut a) = channel();
        let mut b = a.clone();
        trigger.trigger();
        tokio::time::timeout(Duration::from_secs(1), a.recv()).await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), b.recv()).await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn sigint_is_delivered_once_installed() {
        let mut interrupt = ctrl_c().unwrap();
        let status = std::process::Command::new("kill")
            .args(["-INT", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());
        tokio::time::timeout(Duration::from_secs(5), interrupt.recv()).await.unwrap();
    }

    #[tokio::test]
    async fn dropped_trigger_never_fires() {
        let (trigger, mut a) = channel();
        drop(trigger);
        assert!(tokio::time::timeout(Duration::from_millis(50), a.recv()).await.is_err());
    }
}
