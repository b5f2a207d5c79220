//! The playback controller.
//!
//! Every guild has one [PlaybackSession] holding at most one current track. A new `play`
//! replaces whatever is current. Each session owns at most one idle watcher. A `play`
//! cancels it while the request is in flight and arms a fresh one once it settles, however
//! it settles; `stop` cancels it for good. The watcher leaves the voice channel once the
//! session has stopped playing for a full timeout period.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serenity::ChannelId;
use serenity::GuildId;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::instrument;

use super::resolver::Resolve;
use super::resolver::Resolved;
use super::voice::PlayState;
use super::voice::Player;
use super::voice::VoiceGateway;
use crate::data::TrackMetadata;
use crate::error::UserError;
use crate::serenity;
use crate::BotError;

/// Tunables for playback.
#[derive(Debug, Clone)]
pub struct PlaybackSettings {
    /// How long a connection may sit without playing before it's dropped.
    pub idle_timeout: Duration,
    /// Volume multiplier every new track starts at.
    pub default_volume: f32,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(120),
            default_volume: 0.5,
        }
    }
}

/// Where a guild's playback is at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    /// Connected but not playing anything.
    Idle,
    Playing,
    Paused,
}

/// The track currently loaded in a guild.
struct NowPlaying<P> {
    metadata: TrackMetadata,
    player: P,
}

/// Per-guild playback state.
struct PlaybackSession<P> {
    current: Option<NowPlaying<P>>,
    idle_watcher: Option<JoinHandle<()>>,
    /// Bumped by every `play` and `stop`, so slow extractions can tell they were superseded.
    requests: u64,
}

impl<P> Default for PlaybackSession<P> {
    fn default() -> Self {
        Self {
            current: None,
            idle_watcher: None,
            requests: 0,
        }
    }
}

impl<P: Player> PlaybackSession<P> {
    async fn play_state(&self) -> PlayState {
        match &self.current {
            Some(now) => now.player.state().await,
            None => PlayState::Stopped,
        }
    }

    fn cancel_idle_watcher(&mut self) {
        if let Some(watcher) = self.idle_watcher.take() {
            watcher.abort();
        }
    }
}

/// Convenience type alias for a shared [PlaybackSession].
type SessionRef<P> = Arc<Mutex<PlaybackSession<P>>>;

/// Handles music commands for every guild. Cheap to clone.
pub struct Controller<V: VoiceGateway, R> {
    inner: Arc<Inner<V, R>>,
}

struct Inner<V: VoiceGateway, R> {
    voice: V,
    resolver: R,
    settings: PlaybackSettings,
    sessions: Mutex<HashMap<GuildId, SessionRef<V::Player>>>,
}

impl<V: VoiceGateway, R> Clone for Controller<V, R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<V, R> Controller<V, R>
where
    V: VoiceGateway,
    R: Resolve<Source = V::Source>,
{
    pub fn new(voice: V, resolver: R, settings: PlaybackSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                voice,
                resolver,
                settings,
                sessions: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Returns the session of `guild`, creating it if needed.
    async fn session(&self, guild: GuildId) -> SessionRef<V::Player> {
        let mut map = self.inner.sessions.lock().await;
        map.entry(guild).or_default().clone()
    }

    /// Returns the session of `guild` if one was ever started.
    async fn existing_session(&self, guild: GuildId) -> Option<SessionRef<V::Player>> {
        let map = self.inner.sessions.lock().await;
        map.get(&guild).cloned()
    }

    /// Join `requester`'s channel, resolve `query` and play it, replacing the current track.
    #[instrument(skip(self))]
    pub async fn play(
        &self,
        guild: GuildId,
        requester: Option<ChannelId>,
        query: &str,
    ) -> Result<TrackMetadata, BotError> {
        let channel = requester.ok_or(UserError::NotInVoiceChannel)?;

        let session_ref = self.session(guild).await;
        let ticket = {
            let mut session = session_ref.lock().await;
            // Nothing may time out under a request in flight.
            session.cancel_idle_watcher();
            session.requests += 1;
            session.requests
        };

        let prepared = self.connect_and_resolve(guild, channel, query).await;

        let mut session = session_ref.lock().await;
        if session.requests != ticket {
            // The newer request owns the session, watcher included.
            let dropped = prepared?;
            tracing::info!(
                "Dropping '{}', a newer request came in.",
                dropped.metadata.display_title()
            );
            return Err(UserError::Superseded.into());
        }

        let outcome = match prepared {
            Ok(resolved) => self.start_track(guild, &mut session, resolved).await,
            Err(e) => Err(e),
        };
        self.arm_idle_watcher(guild, &mut session, session_ref.clone());
        outcome
    }

    async fn connect_and_resolve(
        &self,
        guild: GuildId,
        channel: ChannelId,
        query: &str,
    ) -> Result<Resolved<V::Source>, BotError> {
        self.ensure_connection(guild, channel).await?;
        self.inner.resolver.resolve(query, true).await
    }

    /// Hand `resolved` to the voice connection and make it current.
    async fn start_track(
        &self,
        guild: GuildId,
        session: &mut PlaybackSession<V::Player>,
        resolved: Resolved<V::Source>,
    ) -> Result<TrackMetadata, BotError> {
        let Resolved { metadata, source } = resolved;

        let volume = self.inner.settings.default_volume;
        let player = self.inner.voice.play(guild, source, volume).await?;
        tracing::info!("Now playing '{}'.", metadata.display_title());

        session.current = Some(NowPlaying {
            metadata: metadata.clone(),
            player,
        });
        Ok(metadata)
    }

    /// Connect to `channel`, move there, or stay put if already there.
    async fn ensure_connection(&self, guild: GuildId, channel: ChannelId) -> Result<(), BotError> {
        let voice = &self.inner.voice;
        match voice.channel(guild).await {
            Some(current) if current == channel => {
                tracing::debug!("Already connected to {channel}.");
                Ok(())
            }
            Some(current) => {
                tracing::info!("Moving from {current} to {channel}.");
                voice.join(guild, channel).await
            }
            None => {
                tracing::info!("Connecting to {channel}.");
                voice.join(guild, channel).await
            }
        }
    }

    /// Stop playing and leave the voice channel.
    #[instrument(skip(self))]
    pub async fn stop(&self, guild: GuildId) -> Result<(), BotError> {
        if self.inner.voice.channel(guild).await.is_none() {
            Err(UserError::NotPlaying)?
        }

        if let Some(session_ref) = self.existing_session(guild).await {
            let mut session = session_ref.lock().await;
            session.cancel_idle_watcher();
            session.current = None;
            // Drops any extraction still in flight.
            session.requests += 1;
        }

        self.inner.voice.disconnect(guild).await?;
        tracing::info!("Stopped and disconnected.");
        Ok(())
    }

    /// Pause the current track. Returns what was paused.
    #[instrument(skip(self))]
    pub async fn pause(&self, guild: GuildId) -> Result<TrackMetadata, BotError> {
        self.require_connection(guild).await?;

        let session_ref = self
            .existing_session(guild)
            .await
            .ok_or(UserError::NothingPlaying)?;
        let session = session_ref.lock().await;
        let Some(now) = &session.current else {
            return Err(UserError::NothingPlaying.into());
        };

        if now.player.state().await != PlayState::Playing {
            return Err(UserError::NothingPlaying.into());
        }
        now.player.pause()?;
        Ok(now.metadata.clone())
    }

    /// Resume the current track. Returns what was resumed.
    #[instrument(skip(self))]
    pub async fn resume(&self, guild: GuildId) -> Result<TrackMetadata, BotError> {
        self.require_connection(guild).await?;

        let session_ref = self
            .existing_session(guild)
            .await
            .ok_or(UserError::NotPaused)?;
        let session = session_ref.lock().await;
        let Some(now) = &session.current else {
            return Err(UserError::NotPaused.into());
        };

        if now.player.state().await != PlayState::Paused {
            return Err(UserError::NotPaused.into());
        }
        now.player.resume()?;
        Ok(now.metadata.clone())
    }

    /// Set the volume of the current track to `level` percent (1 to 100).
    #[instrument(skip(self))]
    pub async fn volume(&self, guild: GuildId, level: i64) -> Result<(), BotError> {
        self.require_connection(guild).await?;

        if !(1..=100).contains(&level) {
            return Err(UserError::InvalidVolume { level }.into());
        }

        let session_ref = self
            .existing_session(guild)
            .await
            .ok_or(UserError::NothingPlaying)?;
        let session = session_ref.lock().await;
        let Some(now) = &session.current else {
            return Err(UserError::NothingPlaying.into());
        };

        now.player.set_volume(level as f32 / 100.0)?;
        Ok(())
    }

    /// Metadata of the current track in `guild`.
    pub async fn current(&self, guild: GuildId) -> Option<TrackMetadata> {
        let session_ref = self.existing_session(guild).await?;
        let session = session_ref.lock().await;
        session.current.as_ref().map(|now| now.metadata.clone())
    }

    pub async fn state(&self, guild: GuildId) -> SessionState {
        if self.inner.voice.channel(guild).await.is_none() {
            return SessionState::Disconnected;
        }

        let Some(session_ref) = self.existing_session(guild).await else {
            return SessionState::Idle;
        };
        let session = session_ref.lock().await;
        match session.play_state().await {
            PlayState::Playing => SessionState::Playing,
            PlayState::Paused => SessionState::Paused,
            PlayState::Stopped => SessionState::Idle,
        }
    }

    async fn require_connection(&self, guild: GuildId) -> Result<(), UserError> {
        match self.inner.voice.channel(guild).await {
            Some(_) => Ok(()),
            None => Err(UserError::NotConnected),
        }
    }

    /// Replace the idle watcher of `session` with a fresh one.
    fn arm_idle_watcher(
        &self,
        guild: GuildId,
        session: &mut PlaybackSession<V::Player>,
        session_ref: SessionRef<V::Player>,
    ) {
        session.cancel_idle_watcher();
        let watcher = self.clone().watch_idle(guild, session_ref);
        session.idle_watcher = Some(tokio::spawn(watcher));
    }

    /// Every timeout period, leave the channel if nothing is playing or paused.
    async fn watch_idle(self, guild: GuildId, session_ref: SessionRef<V::Player>) {
        let timeout = self.inner.settings.idle_timeout;
        loop {
            tokio::time::sleep(timeout).await;

            let mut session = session_ref.lock().await;
            if session.play_state().await.is_active() {
                tracing::debug!("Still in use after {timeout:?}, checking again later.");
                continue;
            }

            session.current = None;
            // Detaches this task; it ends right after.
            session.idle_watcher = None;

            if self.inner.voice.channel(guild).await.is_some() {
                tracing::info!("Idle for {timeout:?}! Disconnecting from voice channel.");
                if let Err(e) = self.inner.voice.disconnect(guild).await {
                    tracing::error!("Failed to leave idle channel: {e}");
                }
            }
            return;
        }
    }
}
