use crate::{
    DatabaseError, GateError, NewScheduleSlot, PrimaryKey, ScheduleSlotData, StudioContext,
    TeacherData,
};

use super::StudioError;

const MINUTES_PER_DAY: u16 = 24 * 60;

/// A teacher's weekly lesson slots
pub struct Schedule {
    context: StudioContext,
}

#[derive(Debug, Clone)]
pub struct SlotRequest {
    pub student_id: PrimaryKey,
    /// 0 is Monday
    pub weekday: u8,
    pub start_minute: u16,
    pub duration_minutes: u16,
}

impl Schedule {
    pub fn new(context: &StudioContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// The week, in order
    pub async fn list(&self, teacher: &TeacherData) -> Result<Vec<ScheduleSlotData>, DatabaseError> {
        let mut slots = self.context.database.schedule_by_teacher(teacher.id).await?;
        slots.sort_by_key(|s| (s.weekday, s.start_minute));

        Ok(slots)
    }

    pub async fn create(
        &self,
        teacher: &TeacherData,
        request: SlotRequest,
    ) -> Result<ScheduleSlotData, StudioError> {
        if request.weekday > 6 {
            return Err(StudioError::Invalid("Weekday must be between 0 and 6"));
        }

        if request.start_minute >= MINUTES_PER_DAY {
            return Err(StudioError::Invalid("Start time must be within the day"));
        }

        if request.duration_minutes == 0 || request.duration_minutes > MINUTES_PER_DAY {
            return Err(StudioError::Invalid("Duration must be positive and at most a day"));
        }

        let student = self
            .context
            .database
            .student_by_id(request.student_id)
            .await?;

        if student.teacher_id != Some(teacher.id) {
            return Err(GateError::Forbidden.into());
        }

        let slot = self
            .context
            .database
            .create_schedule_slot(NewScheduleSlot {
                teacher_id: teacher.id,
                student_id: student.id,
                weekday: request.weekday,
                start_minute: request.start_minute,
                duration_minutes: request.duration_minutes,
            })
            .await?;

        Ok(slot)
    }

    pub async fn delete(&self, teacher: &TeacherData, slot_id: PrimaryKey) -> Result<(), StudioError> {
        let owned = self
            .context
            .database
            .schedule_by_teacher(teacher.id)
            .await?
            .iter()
            .any(|s| s.id == slot_id);

        if !owned {
            return Err(DatabaseError::NotFound {
                resource: "lesson schedule",
                identifier: "id",
            }
            .into());
        }

        self.context.database.delete_schedule_slot(slot_id).await?;
        Ok(())
    }
}
