use std::sync::Arc;

use dashmap::DashMap;
use log::info;
use parking_lot::Mutex;
use thiserror::Error;

use crate::PrimaryKey;

/// Something that can be started and paused, like an audio element
pub trait Playable: Send + Sync {
    fn play(&self);
    fn pause(&self);
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("Track {0} is not registered")]
    NotRegistered(PrimaryKey),
}

/// Keeps track of playable tracks so that only one of them plays at a time
#[derive(Default)]
pub struct PlaybackRegistry {
    players: DashMap<PrimaryKey, Arc<dyn Playable>>,
    playing: Mutex<Option<PrimaryKey>>,
}

impl PlaybackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, track_id: PrimaryKey, playable: Arc<dyn Playable>) {
        self.players.insert(track_id, playable);
    }

    /// Removes a track, pausing it first if it was playing
    pub fn unregister(&self, track_id: PrimaryKey) {
        let mut playing = self.playing.lock();

        if let Some((_, playable)) = self.players.remove(&track_id) {
            if *playing == Some(track_id) {
                playable.pause();
                *playing = None;
            }
        }
    }

    /// Plays the track, pausing whatever was playing before
    pub fn play(&self, track_id: PrimaryKey) -> Result<(), PlaybackError> {
        let next = self
            .players
            .get(&track_id)
            .map(|p| p.clone())
            .ok_or(PlaybackError::NotRegistered(track_id))?;

        let mut playing = self.playing.lock();

        if let Some(previous) = playing.take() {
            if previous != track_id {
                if let Some(p) = self.players.get(&previous) {
                    p.pause();
                }
            }
        }

        next.play();
        *playing = Some(track_id);

        info!("Playing track {}", track_id);
        Ok(())
    }

    pub fn pause(&self, track_id: PrimaryKey) {
        let mut playing = self.playing.lock();

        if *playing == Some(track_id) {
            if let Some(p) = self.players.get(&track_id) {
                p.pause();
            }

            *playing = None;
        }
    }

    pub fn stop_all(&self) {
        let mut playing = self.playing.lock();

        if let Some(id) = playing.take() {
            if let Some(p) = self.players.get(&id) {
                p.pause();
            }
        }
    }

    /// The track currently playing, if any
    pub fn playing(&self) -> Option<PrimaryKey> {
        *self.playing.lock()
    }
}

#[cfg(test)]
mod test {
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    };

    use uuid::Uuid;

    use super::{Playable, PlaybackRegistry};

    #[derive(Default)]
    struct FakeAudio {
        playing: AtomicBool,
    }

    impl Playable for FakeAudio {
        fn play(&self) {
            self.playing.store(true, Ordering::SeqCst);
        }

        fn pause(&self) {
            self.playing.store(false, Ordering::SeqCst);
        }
    }

    fn is_playing(audio: &FakeAudio) -> bool {
        audio.playing.load(Ordering::SeqCst)
    }

    #[test]
    fn only_one_track_plays_at_a_time() {
        let registry = PlaybackRegistry::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let audio_a = Arc::new(FakeAudio::default());
        let audio_b = Arc::new(FakeAudio::default());

        registry.register(a, audio_a.clone());
        registry.register(b, audio_b.clone());

        registry.play(a).unwrap();
        assert!(is_playing(&audio_a));

        registry.play(b).unwrap();
        assert!(!is_playing(&audio_a));
        assert!(is_playing(&audio_b));
        assert_eq!(registry.playing(), Some(b));

        registry.stop_all();
        assert!(!is_playing(&audio_b));
        assert_eq!(registry.playing(), None);
    }

    #[test]
    fn unregistering_the_playing_track_pauses_it() {
        let registry = PlaybackRegistry::new();
        let id = Uuid::new_v4();
        let audio = Arc::new(FakeAudio::default());

        registry.register(id, audio.clone());
        registry.play(id).unwrap();
        registry.unregister(id);

        assert!(!is_playing(&audio));
        assert!(registry.playing().is_none());
        assert!(registry.play(id).is_err());
    }

    #[test]
    fn pausing_another_track_does_nothing() {
        let registry = PlaybackRegistry::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let audio_a = Arc::new(FakeAudio::default());

        registry.register(a, audio_a.clone());
        registry.register(b, Arc::new(FakeAudio::default()));
        registry.play(a).unwrap();
        registry.pause(b);

        assert!(is_playing(&audio_a));
        assert_eq!(registry.playing(), Some(a));
    }
}
