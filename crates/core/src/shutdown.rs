//! Prozessweites Shutdown-Signal
//!
//! Wird genau einmal gesetzt (Ctrl-C, fataler Fehler in einer Aktivitaet)
//! und von allen langlaufenden Aktivitaeten kooperativ beobachtet.
//! Threads pruefen `ist_ausgeloest()`, async-Code wartet mit `abwarten()`.

use std::sync::Arc;
use tokio::sync::watch;

/// Klonbares Handle auf das gemeinsame Shutdown-Flag
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }
}

impl ShutdownSignal {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Setzt das Signal. Gibt `true` zurueck wenn dieser Aufruf es gesetzt hat.
    pub fn ausloesen(&self) -> bool {
        !self.tx.send_replace(true)
    }

    pub fn ist_ausgeloest(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wartet bis das Signal gesetzt wurde; beliebig viele Warter
    pub async fn abwarten(&self) {
        let mut rx = self.tx.subscribe();
        // Sender lebt so lange wie `self`, Err ist hier nicht moeglich
        let _ = rx.wait_for(|ausgeloest| *ausgeloest).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn nur_einmal_ausloesbar() {
        let signal = ShutdownSignal::neu();
        assert!(!signal.ist_ausgeloest());
        assert!(signal.ausloesen());
        assert!(!signal.ausloesen());
        assert!(signal.ist_ausgeloest());
    }

    #[test]
    fn klone_teilen_zustand() {
        let signal = ShutdownSignal::neu();
        let klon = signal.clone();
        klon.ausloesen();
        assert!(signal.ist_ausgeloest());
    }

    #[tokio::test]
    async fn abwarten_nach_ausloesen_kehrt_sofort_zurueck() {
        let signal = ShutdownSignal::neu();
        signal.ausloesen();
        tokio::time::timeout(Duration::from_millis(100), signal.abwarten())
            .await
            .expect("abwarten darf nicht blockieren");
    }

    #[tokio::test]
    async fn abwarten_wird_aus_thread_geweckt() {
        let signal = ShutdownSignal::neu();
        let klon = signal.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            klon.ausloesen();
        });

        tokio::time::timeout(Duration::from_secs(2), signal.abwarten())
            .await
            .expect("Signal muss ankommen");
        handle.join().unwrap();
    }

    #[tokio::test]
    async fn alle_warter_werden_geweckt() {
        let signal = ShutdownSignal::neu();
        let warter: Vec<_> = (0..3)
            .map(|_| {
                let s = signal.clone();
                tokio::spawn(async move { s.abwarten().await })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(20)).await;
        signal.ausloesen();

        for w in warter {
            tokio::time::timeout(Duration::from_millis(500), w)
                .await
                .expect("jeder Warter muss geweckt werden")
                .unwrap();
        }
    }
}
