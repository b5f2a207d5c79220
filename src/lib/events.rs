//! Songbird event handling.
//!
//! - On driver disconnect (e.g. kicked from the channel), everything playing is stopped.
//! - When a track fails mid-playback, the failure is logged. Users are not told.

use std::sync::Arc;

use async_trait::async_trait;
use songbird::Call;
use songbird::CoreEvent;
use songbird::Event;
use songbird::EventContext;
use songbird::EventHandler;
use songbird::TrackEvent;
use songbird::tracks::PlayMode;
use songbird::tracks::TrackHandle;
use tokio::sync::Mutex;

use crate::BotError;

/// Convenience type alias for [songbird::Call].
pub type CallRef = Arc<Mutex<Call>>;

/// Register the events every call gets. Must only be called once per call.
pub async fn register_global_events(call: &CallRef) {
    tracing::info!("Initializing global events.");
    StopOnDisconnect::new(call).register().await;
}

/// Register the events every track gets.
pub fn register_track_events(handle: &TrackHandle) -> Result<(), BotError> {
    tracing::debug!("Registering track error event for {}.", handle.uuid());
    handle.add_event(Event::Track(TrackEvent::Error), LogTrackError)?;
    Ok(())
}

/// Stop playback when the driver disconnects.
struct StopOnDisconnect {
    /// Reference to the call that will be stopped.
    call: CallRef,
}

impl StopOnDisconnect {
    /// Constructor for [StopOnDisconnect]
    fn new(call: &CallRef) -> Self {
        let call = call.clone();
        Self { call }
    }

    /// Register this as a global event.
    async fn register(self) {
        tracing::debug!("Registering stop on disconnect global event.");
        let call = self.call.clone();
        let mut call = call.lock().await;
        call.add_global_event(Event::Core(CoreEvent::DriverDisconnect), self);
    }
}

#[async_trait]
impl EventHandler for StopOnDisconnect {
    async fn act(&self, _ectx: &EventContext<'_>) -> Option<Event> {
        tracing::info!("Stopping on disconnect!");
        let mut call = self.call.lock().await;
        call.stop();
        None
    }
}

/// Log tracks that end because of an error.
struct LogTrackError;

#[async_trait]
impl EventHandler for LogTrackError {
    async fn act(&self, ectx: &EventContext<'_>) -> Option<Event> {
        if let EventContext::Track(tracks) = ectx {
            for (state, handle) in tracks.iter() {
                if let PlayMode::Errored(e) = &state.playing {
                    tracing::error!(track = %handle.uuid(), error = ?e, "Playback failed.");
                }
            }
        }
        None
    }
}
