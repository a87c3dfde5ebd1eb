use std::collections::HashSet;

use chrono::{DateTime, Utc};
use log::info;

use crate::{
    DatabaseError, GateError, NewPerformer, NewRecital, PerformerData, PerformerKind, PrimaryKey,
    RecitalData, StudioContext, TeacherData,
};

use super::StudioError;

pub struct Recitals {
    context: StudioContext,
}

/// Who or what to add to a recital program
#[derive(Debug, Clone)]
pub enum PerformerRequest {
    Student {
        student_id: PrimaryKey,
        piece: String,
        composer: String,
    },
    Manual {
        name: String,
        piece: String,
        composer: String,
    },
    Intermission,
}

impl Recitals {
    pub fn new(context: &StudioContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    pub async fn create(
        &self,
        teacher: &TeacherData,
        title: String,
        venue: Option<String>,
        date: Option<DateTime<Utc>>,
    ) -> Result<RecitalData, StudioError> {
        if title.trim().is_empty() {
            return Err(StudioError::Invalid("Recital title can't be empty"));
        }

        let recital = self
            .context
            .database
            .create_recital(NewRecital {
                teacher_id: teacher.id,
                title,
                venue,
                date,
            })
            .await?;

        Ok(recital)
    }

    pub async fn list(&self, teacher: &TeacherData) -> Result<Vec<RecitalData>, DatabaseError> {
        self.context.database.recitals_by_teacher(teacher.id).await
    }

    /// A recital program, performers in order
    pub async fn get(&self, recital_id: PrimaryKey) -> Result<RecitalData, DatabaseError> {
        self.context.database.recital_by_id(recital_id).await
    }

    /// Appends a performer to the end of the program.
    /// A student's name and image are copied in as they are right now.
    pub async fn add_performer(
        &self,
        teacher: &TeacherData,
        recital_id: PrimaryKey,
        request: PerformerRequest,
    ) -> Result<PerformerData, StudioError> {
        let recital = self.owned(teacher, recital_id).await?;

        let kind = match request {
            PerformerRequest::Student {
                student_id,
                piece,
                composer,
            } => {
                let student = self.context.database.student_by_id(student_id).await?;

                if student.teacher_id != Some(teacher.id) {
                    return Err(GateError::Forbidden.into());
                }

                PerformerKind::Student {
                    student_id: student.id,
                    name: student.display_name,
                    image_url: student.image_url,
                    piece,
                    composer,
                }
            }
            PerformerRequest::Manual {
                name,
                piece,
                composer,
            } => {
                if name.trim().is_empty() {
                    return Err(StudioError::Invalid("Performer name can't be empty"));
                }

                PerformerKind::Manual {
                    name,
                    piece,
                    composer,
                }
            }
            PerformerRequest::Intermission => PerformerKind::Intermission,
        };

        let sort_order = recital
            .performers
            .iter()
            .map(|p| p.sort_order)
            .max()
            .map_or(0, |max| max + 1);

        let performer = self
            .context
            .database
            .create_performer(NewPerformer {
                recital_id: recital.id,
                sort_order,
                kind,
            })
            .await?;

        Ok(performer)
    }

    /// Removes a performer and closes the gap it leaves
    pub async fn remove_performer(
        &self,
        teacher: &TeacherData,
        recital_id: PrimaryKey,
        performer_id: PrimaryKey,
    ) -> Result<RecitalData, StudioError> {
        let recital = self.owned(teacher, recital_id).await?;

        if !recital.performers.iter().any(|p| p.id == performer_id) {
            return Err(DatabaseError::NotFound {
                resource: "recital performer",
                identifier: "id",
            }
            .into());
        }

        self.context.database.delete_performer(performer_id).await?;

        let remaining = recital
            .performers
            .iter()
            .filter(|p| p.id != performer_id)
            .map(|p| p.id)
            .collect();

        self.write_order(recital.id, remaining).await
    }

    /// Persists a new order of the whole program.
    /// The order must name every performer of the recital exactly once.
    pub async fn reorder(
        &self,
        teacher: &TeacherData,
        recital_id: PrimaryKey,
        order: Vec<PrimaryKey>,
    ) -> Result<RecitalData, StudioError> {
        let recital = self.owned(teacher, recital_id).await?;

        let current: HashSet<_> = recital.performers.iter().map(|p| p.id).collect();
        let requested: HashSet<_> = order.iter().copied().collect();

        if order.len() != current.len() || requested != current {
            return Err(StudioError::Invalid(
                "The new order must contain every performer exactly once",
            ));
        }

        self.write_order(recital.id, order).await
    }

    async fn write_order(
        &self,
        recital_id: PrimaryKey,
        order: Vec<PrimaryKey>,
    ) -> Result<RecitalData, StudioError> {
        let order = order
            .into_iter()
            .enumerate()
            .map(|(index, id)| (id, index as i32))
            .collect();

        self.context
            .database
            .set_performer_order(recital_id, order)
            .await?;

        info!("Recital {} program reordered", recital_id);
        Ok(self.get(recital_id).await?)
    }

    async fn owned(
        &self,
        teacher: &TeacherData,
        recital_id: PrimaryKey,
    ) -> Result<RecitalData, StudioError> {
        let recital = self.get(recital_id).await?;

        if recital.teacher_id != teacher.id {
            return Err(GateError::Forbidden.into());
        }

        Ok(recital)
    }
}
