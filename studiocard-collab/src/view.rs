use crate::{
    optimistic, GateError, PageAccess, PrimaryKey, StudentData, StudentProfile, Studio,
    StudioError, TrackData,
};

/// A student's page as one visitor sees it.
/// Access lives only as long as the view, nothing is remembered between views.
#[derive(Debug, Clone)]
pub struct ProfileView {
    student: StudentData,
    access: PageAccess,
    tracks: Vec<TrackData>,
}

impl ProfileView {
    pub async fn open(studio: &Studio, student_id: PrimaryKey) -> Result<Self, StudioError> {
        let student = studio.students.get(student_id).await?;
        let access = PageAccess::for_student(&student);
        let tracks = studio.tracks.list(&access).await?;

        Ok(Self {
            student,
            access,
            tracks,
        })
    }

    pub fn profile(&self) -> StudentProfile {
        StudentProfile::new(&self.student, &self.access)
    }

    pub fn tracks(&self) -> &[TrackData] {
        &self.tracks
    }

    pub fn access(&self) -> &PageAccess {
        &self.access
    }

    pub async fn unlock_read(&mut self, studio: &Studio, code: &str) -> Result<(), StudioError> {
        self.access.unlock_read(&self.student, code)?;
        self.refresh(studio).await
    }

    pub async fn unlock_manager(&mut self, studio: &Studio, passcode: &str) -> Result<(), StudioError> {
        self.access
            .unlock_manager(&studio.auth, &self.student, passcode)
            .await?;

        self.refresh(studio).await
    }

    /// Flips a track between public and private, showing the change before it's saved
    pub async fn toggle_visibility(
        &mut self,
        studio: &Studio,
        track_id: PrimaryKey,
    ) -> Result<(), StudioError> {
        let session = self.access.session().cloned().ok_or(GateError::NoSession)?;

        let is_public = self
            .tracks
            .iter()
            .find(|t| t.id == track_id)
            .map(|t| !t.is_public)
            .ok_or(StudioError::Invalid("Track is not on this page"))?;

        let set = |public: bool| {
            move |tracks: &mut Vec<TrackData>| {
                if let Some(track) = tracks.iter_mut().find(|t| t.id == track_id) {
                    track.is_public = public;
                }
            }
        };

        optimistic(
            &mut self.tracks,
            set(is_public),
            set(!is_public),
            studio.tracks.set_visibility(&session, track_id, is_public),
        )
        .await?;

        Ok(())
    }

    async fn refresh(&mut self, studio: &Studio) -> Result<(), StudioError> {
        self.student = studio.students.get(self.student.id).await?;
        self.tracks = studio.tracks.list(&self.access).await?;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::ProfileView;
    use crate::{test_util::student_signup, test_util::studio, StudioError};

    #[tokio::test]
    async fn viewing_a_private_page() {
        let studio = studio();
        let mut signup = student_signup("4821", None);
        signup.is_private = true;

        let student = studio.auth.register_student(signup).await.unwrap();
        let session = studio.auth.sign_in_student(student.id, "4821").await.unwrap();
        studio
            .tracks
            .upload(&session, student.id, "Minuet".to_string(), b"webm")
            .await
            .unwrap();

        let mut view = ProfileView::open(&studio, student.id).await.unwrap();
        assert!(view.profile().is_locked());
        assert!(view.tracks().is_empty());

        view.unlock_read(&studio, "2468").await.unwrap();
        assert!(!view.profile().is_locked());
        // The only track is private
        assert!(view.tracks().is_empty());

        view.unlock_manager(&studio, "4821").await.unwrap();
        assert_eq!(view.tracks().len(), 1);
    }

    #[tokio::test]
    async fn toggling_visibility_needs_a_manager() {
        let studio = studio();
        let (student, session) = studio.seed_student("4821", None).await;
        let track = studio
            .tracks
            .upload(&session, student.id, "Minuet".to_string(), b"webm")
            .await
            .unwrap();

        let mut view = ProfileView::open(&studio, student.id).await.unwrap();
        assert!(view.toggle_visibility(&studio, track.id).await.is_err());

        view.unlock_manager(&studio, "4821").await.unwrap();
        view.toggle_visibility(&studio, track.id).await.unwrap();

        assert!(view.tracks()[0].is_public);
        assert!(studio.database.track_by_id(track.id).await.unwrap().is_public);
    }

    #[tokio::test]
    async fn failed_toggle_is_reverted() {
        let studio = studio();
        let (student, session) = studio.seed_student("4821", None).await;
        let track = studio
            .tracks
            .upload(&session, student.id, "Minuet".to_string(), b"webm")
            .await
            .unwrap();

        let mut view = ProfileView::open(&studio, student.id).await.unwrap();
        view.unlock_manager(&studio, "4821").await.unwrap();

        // Gone on the server, but still shown locally
        studio.database.delete_track(track.id).await.unwrap();

        let result = view.toggle_visibility(&studio, track.id).await;

        assert!(matches!(result, Err(StudioError::Db(_))));
        assert!(!view.tracks()[0].is_public);
    }
}
