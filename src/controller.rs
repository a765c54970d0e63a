// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::io;
use std::sync::Arc;

use tokio::sync::mpsc::{self, Sender};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tracing::{debug, error, info, info_span, Instrument};

use crate::clock::Clock;
use crate::coordinator::Coordinator;
use crate::rhythm::{TickEvent, TickListener};

pub mod keyboard;

/// Controller events that will trigger behavior in the mixer.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Assigns a sample to a slot, replacing whatever it was playing.
    Assign { slot: String, sample: String },

    /// Stops and empties a slot.
    Clear { slot: String },

    /// Changes the gain of the voice in a slot.
    Volume { slot: String, volume: f32 },

    /// Prints the mixer state.
    State,

    /// Stops everything and closes the controller.
    Quit,
}

pub trait Driver: Send + Sync + 'static {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>>;
}

/// Returns a tick listener that forwards ticks to a channel. Ticks are dropped rather than
/// waited on when the receiver falls behind.
pub fn tick_forwarder(ticks_tx: Sender<TickEvent>) -> TickListener {
    Box::new(move |event| {
        if let Err(e) = ticks_tx.try_send(*event) {
            debug!(err = %e, beat_index = event.beat_index, "Dropped tick notification");
        }
    })
}

/// Runs the mixer's event queue. Every assign, clear and beat tick is applied from a single
/// task.
pub struct Controller {
    handle: JoinHandle<()>,
}

impl Controller {
    /// Creates a new controller with the given driver. The controller owns the coordinator.
    pub fn new(
        coordinator: Coordinator,
        clock: Arc<dyn Clock>,
        driver: Arc<dyn Driver>,
    ) -> Controller {
        Controller {
            handle: tokio::spawn(
                Controller::run(coordinator, clock, driver).instrument(info_span!("controller")),
            ),
        }
    }

    /// Join will block until the controller finishes.
    pub async fn join(&mut self) -> Result<(), JoinError> {
        (&mut self.handle).await
    }

    async fn run(mut coordinator: Coordinator, clock: Arc<dyn Clock>, driver: Arc<dyn Driver>) {
        let (events_tx, mut events_rx) = mpsc::channel(16);
        let join_handle = driver.monitor_events(events_tx);

        info!("Controller started.");

        loop {
            let next_tick = coordinator
                .next_tick_at()
                .map(|at| Instant::now() + at.saturating_sub(clock.now()));
            let tick_deadline = next_tick.unwrap_or_else(Instant::now);

            tokio::select! {
                event = events_rx.recv() => {
                    let Some(event) = event else {
                        break;
                    };
                    info!(event = ?event, "Received event.");
                    if !Controller::handle_event(&mut coordinator, event) {
                        break;
                    }
                }
                _ = tokio::time::sleep_until(tick_deadline), if next_tick.is_some() => {
                    coordinator.tick();
                }
            }
        }

        info!("Controller closing.");
        coordinator.stop_all();
        drop(events_rx);
        match join_handle.await {
            Ok(Err(e)) => error!(err = %e, "Event monitor failed"),
            Err(e) => error!(err = %e, "Error waiting for event monitor to stop"),
            Ok(Ok(())) => {}
        }
    }

    /// Applies one event. Returns false when the controller should stop.
    fn handle_event(coordinator: &mut Coordinator, event: Event) -> bool {
        match event {
            Event::Assign { slot, sample } => coordinator.assign(&slot, &sample),
            Event::Clear { slot } => {
                coordinator.clear(&slot);
            }
            Event::Volume { slot, volume } => {
                if !coordinator.set_volume(&slot, volume) {
                    info!(slot, "Volume change for an empty slot ignored");
                }
            }
            Event::State => match serde_json::to_string_pretty(&coordinator.state()) {
                Ok(state) => println!("{}", state),
                Err(e) => error!(err = %e, "Unable to render mixer state"),
            },
            Event::Quit => return false,
        }
        true
    }
}
