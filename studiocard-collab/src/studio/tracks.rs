use log::{error, info, warn};

use crate::{
    ensure_can_write, events::StudioEvent, recording_path, upload_with_retry, DatabaseError,
    NewTrack, PageAccess, PrimaryKey, SessionData, StudentData, StudioContext, TrackData,
};

use super::{object_name, StudioError};

pub struct Tracks {
    context: StudioContext,
}

impl Tracks {
    pub fn new(context: &StudioContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Stores a recording, then records it on the student's page.
    ///
    /// If the row can't be written the uploaded object is left behind.
    /// It is logged and reported as orphaned, but not removed.
    pub async fn upload(
        &self,
        session: &SessionData,
        student_id: PrimaryKey,
        title: String,
        bytes: &[u8],
    ) -> Result<TrackData, StudioError> {
        let student = self.context.database.student_by_id(student_id).await?;
        ensure_can_write(session, &student)?;

        if title.trim().is_empty() {
            return Err(StudioError::Invalid("Track title can't be empty"));
        }

        if bytes.is_empty() {
            return Err(StudioError::Invalid("Recording is empty"));
        }

        let path = recording_path(student.id, &object_name());
        let config = &self.context.config;

        upload_with_retry(
            self.context.storage.as_ref(),
            &path,
            bytes,
            "audio/webm",
            config.upload_attempts,
            config.upload_backoff,
        )
        .await?;

        let created = self
            .context
            .database
            .create_track(NewTrack {
                student_id: student.id,
                title,
                url: self.context.storage.public_url(&path),
                path: path.clone(),
                is_public: student.tracks_public_by_default,
            })
            .await;

        let track = match created {
            Ok(track) => track,
            Err(e) => {
                warn!("Recording {} was stored but not recorded: {}", path, e);

                self.context.emit(StudioEvent::Orphaned {
                    resource: "object",
                    identifier: path,
                });

                return Err(e.into());
            }
        };

        info!("Student {} uploaded track {}", student.id, track.id);

        self.context.emit(StudioEvent::TrackUploaded {
            student_id: student.id,
            track_id: track.id,
        });

        Ok(track)
    }

    /// Lists the tracks the access allows to see.
    /// Managers see everything, viewers see public tracks, and a locked page shows nothing.
    pub async fn list(&self, access: &PageAccess) -> Result<Vec<TrackData>, DatabaseError> {
        if !access.can_view() {
            return Ok(vec![]);
        }

        let mut tracks = self
            .context
            .database
            .tracks_by_student(access.student_id())
            .await?;

        if !access.can_manage() {
            tracks.retain(|t| t.is_public);
        }

        tracks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tracks)
    }

    pub async fn set_visibility(
        &self,
        session: &SessionData,
        track_id: PrimaryKey,
        is_public: bool,
    ) -> Result<TrackData, StudioError> {
        self.owned(session, track_id).await?;

        let track = self
            .context
            .database
            .update_track_visibility(track_id, is_public)
            .await?;

        Ok(track)
    }

    /// Deletes the track and its recording
    pub async fn delete(&self, session: &SessionData, track_id: PrimaryKey) -> Result<(), StudioError> {
        let (track, _) = self.owned(session, track_id).await?;

        self.context.database.delete_track(track.id).await?;

        if let Err(e) = self.context.storage.remove(&track.path).await {
            error!("Could not remove recording {}: {}", track.path, e);

            self.context.emit(StudioEvent::Orphaned {
                resource: "object",
                identifier: track.path,
            });
        }

        Ok(())
    }

    /// Returns the track if the session may change it
    async fn owned(
        &self,
        session: &SessionData,
        track_id: PrimaryKey,
    ) -> Result<(TrackData, StudentData), StudioError> {
        let track = self.context.database.track_by_id(track_id).await?;
        let student = self.context.database.student_by_id(track.student_id).await?;

        ensure_can_write(session, &student)?;

        Ok((track, student))
    }
}

#[cfg(test)]
mod test {
    use std::{sync::Arc, time::Duration};

    use async_trait::async_trait;

    use crate::{
        test_util::studio, ArcedDatabase, Config, GateError, MemoryDatabase, MemoryStorage,
        ObjectStorage, PageAccess, StorageError, Studio, StudioError, TeacherUpdate,
    };

    #[tokio::test]
    async fn uploads_follow_the_default_visibility() {
        let studio = studio();
        let (teacher, teacher_session) = studio.seed_teacher("rivera").await;
        let (student, session) = studio.seed_student("4821", Some(teacher.id)).await;

        let private = studio
            .tracks
            .upload(&session, student.id, "Minuet".to_string(), b"webm")
            .await
            .unwrap();

        assert!(!private.is_public);
        assert!(private.path.starts_with(&format!("{}/", student.id)));
        assert!(private.path.ends_with(".webm"));

        studio
            .students
            .update_by_teacher(
                &teacher_session,
                student.id,
                TeacherUpdate {
                    tracks_public_by_default: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let public = studio
            .tracks
            .upload(&teacher_session, student.id, "Gavotte".to_string(), b"webm")
            .await
            .unwrap();

        assert!(public.is_public);
    }

    #[tokio::test]
    async fn listing_depends_on_access() {
        let studio = studio();
        let mut signup = crate::test_util::student_signup("4821", None);
        signup.is_private = true;

        let student = studio.auth.register_student(signup).await.unwrap();
        let session = studio.auth.sign_in_student(student.id, "4821").await.unwrap();

        let hidden = studio
            .tracks
            .upload(&session, student.id, "Scales".to_string(), b"webm")
            .await
            .unwrap();
        let shown = studio
            .tracks
            .upload(&session, student.id, "Minuet".to_string(), b"webm")
            .await
            .unwrap();

        studio
            .tracks
            .set_visibility(&session, shown.id, true)
            .await
            .unwrap();

        let mut access = PageAccess::for_student(&student);
        assert!(studio.tracks.list(&access).await.unwrap().is_empty());

        access.unlock_read(&student, "2468").unwrap();
        let visible = studio.tracks.list(&access).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, shown.id);

        assert!(access.grant_session(session));
        let all = studio.tracks.list(&access).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|t| t.id == hidden.id));
    }

    #[tokio::test]
    async fn strangers_cannot_touch_tracks() {
        let studio = studio();
        let (student, session) = studio.seed_student("4821", None).await;
        let (_, stranger) = studio.seed_student("1357", None).await;

        let track = studio
            .tracks
            .upload(&session, student.id, "Minuet".to_string(), b"webm")
            .await
            .unwrap();

        let upload = studio
            .tracks
            .upload(&stranger, student.id, "Nope".to_string(), b"webm")
            .await;
        let visibility = studio.tracks.set_visibility(&stranger, track.id, true).await;
        let delete = studio.tracks.delete(&stranger, track.id).await;

        for result in [upload.map(|_| ()), visibility.map(|_| ()), delete] {
            assert!(matches!(
                result,
                Err(StudioError::Gate(GateError::Forbidden))
            ));
        }
    }

    #[tokio::test]
    async fn deleting_removes_the_recording() {
        let database: ArcedDatabase = Arc::new(MemoryDatabase::new());
        let storage = Arc::new(MemoryStorage::new());
        let studio =
            Studio::with_password_provider(Config::default(), database, storage.clone());

        let (student, session) = studio.seed_student("4821", None).await;
        let track = studio
            .tracks
            .upload(&session, student.id, "Minuet".to_string(), b"webm")
            .await
            .unwrap();

        assert!(storage.contains(&track.path));

        studio.tracks.delete(&session, track.id).await.unwrap();

        assert!(!storage.contains(&track.path));
        assert!(studio.database.track_by_id(track.id).await.is_err());
    }

    #[tokio::test]
    async fn simultaneous_uploads_keep_their_own_recordings() {
        let database: ArcedDatabase = Arc::new(MemoryDatabase::new());
        let storage = Arc::new(MemoryStorage::new());
        let studio =
            Studio::with_password_provider(Config::default(), database, storage.clone());

        let (student, session) = studio.seed_student("4821", None).await;

        let (first, second) = tokio::join!(
            studio
                .tracks
                .upload(&session, student.id, "Minuet".to_string(), b"first"),
            studio
                .tracks
                .upload(&session, student.id, "Gavotte".to_string(), b"second"),
        );
        let (first, second) = (first.unwrap(), second.unwrap());

        assert_ne!(first.path, second.path);
        assert_ne!(first.url, second.url);
        assert_eq!(storage.len(), 2);

        studio.tracks.delete(&session, first.id).await.unwrap();

        assert!(!storage.contains(&first.path));
        assert!(storage.contains(&second.path));
    }

    struct BrokenStorage;

    #[async_trait]
    impl ObjectStorage for BrokenStorage {
        async fn upload(&self, _: &str, _: &[u8], _: &str) -> Result<(), StorageError> {
            Err(StorageError::Other("bucket unavailable".to_string()))
        }

        async fn remove(&self, path: &str) -> Result<(), StorageError> {
            Err(StorageError::NotFound(path.to_string()))
        }

        fn public_url(&self, path: &str) -> String {
            path.to_string()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_uploads_leave_no_row() {
        let database: ArcedDatabase = Arc::new(MemoryDatabase::new());
        let config = Config {
            upload_backoff: Duration::from_millis(10),
            ..Default::default()
        };
        let studio = Studio::with_password_provider(config, database, Arc::new(BrokenStorage));

        let (student, session) = studio.seed_student("4821", None).await;
        let result = studio
            .tracks
            .upload(&session, student.id, "Minuet".to_string(), b"webm")
            .await;

        assert!(matches!(result, Err(StudioError::Storage(_))));
        assert!(studio
            .database
            .tracks_by_student(student.id)
            .await
            .unwrap()
            .is_empty());
    }
}
