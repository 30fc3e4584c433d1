use std::collections::HashSet;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::provider::{PredictionProvider, load_upcoming_fights, predict};
use crate::state::{Delta, ProviderCommand};

/// Runs provider requests off the UI thread. Each command gets its own
/// thread so a slow prediction never holds up another card; results come
/// back as [`Delta`]s. The worker exits when the command sender is dropped.
pub fn spawn_provider(
    provider: Arc<dyn PredictionProvider>,
    tx: Sender<Delta>,
    cmd_rx: Receiver<ProviderCommand>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let inflight_predictions: Arc<Mutex<HashSet<String>>> =
            Arc::new(Mutex::new(HashSet::new()));

        while let Ok(cmd) = cmd_rx.recv() {
            match cmd {
                ProviderCommand::FetchFightCard { generation } => {
                    let provider = provider.clone();
                    let tx = tx.clone();
                    thread::spawn(move || {
                        let log_tx = tx.clone();
                        let result = load_upcoming_fights(provider.as_ref(), |line| {
                            let _ = log_tx.send(Delta::Log(line));
                        });
                        let delta = match result {
                            Ok(fights) => Delta::FightsLoaded { generation, fights },
                            Err(err) => Delta::FightsFailed {
                                generation,
                                error: err.to_string(),
                            },
                        };
                        let _ = tx.send(delta);
                    });
                }
                ProviderCommand::FetchPrediction { fight, seq } => {
                    {
                        let mut inflight = inflight_predictions
                            .lock()
                            .expect("inflight predictions lock poisoned");
                        // An earlier board may still be waiting on this fight.
                        if !inflight.insert(fight.id.clone()) {
                            let _ = tx.send(Delta::PredictionFailed {
                                fight_id: fight.id.clone(),
                                seq,
                                error: "a request for this fight is already in flight".to_string(),
                            });
                            continue;
                        }
                    }

                    let provider = provider.clone();
                    let tx = tx.clone();
                    let inflight_predictions = inflight_predictions.clone();
                    thread::spawn(move || {
                        let delta = match predict(provider.as_ref(), &fight) {
                            Ok(prediction) => Delta::PredictionReady {
                                fight_id: fight.id.clone(),
                                seq,
                                prediction,
                            },
                            Err(err) => Delta::PredictionFailed {
                                fight_id: fight.id.clone(),
                                seq,
                                error: err.to_string(),
                            },
                        };
                        inflight_predictions
                            .lock()
                            .expect("inflight predictions lock poisoned")
                            .remove(&fight.id);
                        let _ = tx.send(delta);
                    });
                }
            }
        }
    })
}
