use crossbeam::channel::{Receiver, Sender};

use crate::{PrimaryKey, SubscriptionTier};

pub type EventSender = Sender<StudioEvent>;
pub type EventReceiver = Receiver<StudioEvent>;

/// Events emitted by the studio as things happen
#[derive(Debug, Clone)]
pub enum StudioEvent {
    /// A student account and profile were created
    StudentRegistered {
        student_id: PrimaryKey,
        teacher_id: Option<PrimaryKey>,
    },
    /// A license key was redeemed
    TeacherRegistered {
        teacher_id: PrimaryKey,
        tier: SubscriptionTier,
    },
    /// A principal signed in
    SignedIn { principal_id: PrimaryKey },
    /// A recording was stored
    TrackUploaded {
        student_id: PrimaryKey,
        track_id: PrimaryKey,
    },
    /// Every segment of a lesson was listened to
    LessonCompleted {
        student_id: PrimaryKey,
        lesson_id: PrimaryKey,
    },
    /// Something was left behind after a partial failure
    Orphaned {
        resource: &'static str,
        identifier: String,
    },
}
