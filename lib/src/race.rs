use std::sync::{Arc, Mutex};

use tokio::{
    sync::{mpsc, oneshot},
    task::JoinSet,
};

use crate::{
    dial::{self, DialSettings, Session},
    error::{Error, Result},
    mx::{self, LookupMx},
};

/// What each participant of a race reports
type RaceOutcome = Result<Session>;

/// Single-use slot admitting the first session of a race.
///
/// A dial that succeeds must [`claim`](Self::claim) the slot; when another
/// dial already won, the session comes back and the caller has to close it.
struct WinnerSlot(Mutex<Option<oneshot::Sender<Session>>>);

impl WinnerSlot {
    fn new() -> (Self, oneshot::Receiver<Session>) {
        let (sender, receiver) = oneshot::channel();
        (Self(Mutex::new(Some(sender))), receiver)
    }

    fn claim(&self, session: Session) -> std::result::Result<(), Session> {
        // A poisoned lock means a participant panicked mid-claim: treat as taken
        let sender = self.0.lock().ok().and_then(|mut slot| slot.take());
        match sender {
            Some(sender) => sender.send(session),
            None => Err(session),
        }
    }
}

/// Resolve the exchangers of `ascii_domain` and dial all of them at once,
/// returning the first session established.
///
/// Losing sessions are closed by their own dial task. When every attempt
/// fails, the first failure received is returned.
pub(crate) async fn first_session<R: LookupMx>(
    resolver: &R,
    ascii_domain: &str,
    settings: &DialSettings,
) -> Result<Session> {
    let hosts = mx::resolve(resolver, ascii_domain).await?;
    race(hosts, settings).await
}

pub(crate) async fn race(hosts: Vec<String>, settings: &DialSettings) -> Result<Session> {
    let total = hosts.len();
    if total == 0 {
        return Err(Error::DialAborted);
    }

    let (slot, mut winner) = WinnerSlot::new();
    let slot = Arc::new(slot);
    let (failure_sender, mut failures) = mpsc::channel(total);

    // Dropping the set on return aborts the participants still dialing
    let mut participants = JoinSet::new();
    for host in hosts {
        let slot = Arc::clone(&slot);
        let failure_sender = failure_sender.clone();
        let settings = settings.clone();

        participants.spawn(async move {
            let outcome: RaceOutcome = dial::dial(host.clone(), settings).await;
            match outcome {
                Ok(session) => {
                    if let Err(session) = slot.claim(session) {
                        tracing::debug!(%host, "lost the race, closing");
                        drop(session);
                    } else {
                        tracing::debug!(%host, "won the race");
                    }
                }
                Err(error) => {
                    tracing::warn!(%host, %error, "dial failed");
                    let _ = failure_sender.send(error).await;
                }
            }
        });
    }
    drop(slot);
    drop(failure_sender);

    let mut errors = Vec::with_capacity(total);
    loop {
        tokio::select! {
            won = &mut winner => match won {
                Ok(session) => return Ok(session),
                // every participant finished without a success
                Err(_) => break,
            },
            Some(error) = failures.recv() => {
                errors.push(error);
                if errors.len() == total {
                    break;
                }
            }
            else => break,
        }
    }

    // Failures sent before the slot closed are still buffered
    while errors.len() < total {
        match failures.recv().await {
            Some(error) => errors.push(error),
            None => break,
        }
    }

    Err(errors.into_iter().next().unwrap_or(Error::DialAborted))
}
