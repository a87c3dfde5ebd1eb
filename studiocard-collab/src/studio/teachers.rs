use crate::{
    DatabaseError, StudioContext, TeacherCardData, TeacherData, UpdatedTeacher,
};

use super::StudioError;

const MAX_INSTRUMENTS: usize = 12;

pub struct Teachers {
    context: StudioContext,
}

/// The public face of a teacher's studio
#[derive(Debug, Clone)]
pub struct TeacherCard {
    pub teacher: TeacherData,
    /// None until the teacher fills it in
    pub card: Option<TeacherCardData>,
}

#[derive(Debug, Default)]
pub struct CardUpdate {
    pub headline: String,
    pub bio: String,
    pub instruments: Vec<String>,
    pub image_url: Option<String>,
}

impl Teachers {
    pub fn new(context: &StudioContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Changes the display name. The username never changes.
    pub async fn update_settings(
        &self,
        teacher: &TeacherData,
        display_name: String,
    ) -> Result<TeacherData, StudioError> {
        if display_name.trim().is_empty() {
            return Err(StudioError::Invalid("Name can't be empty"));
        }

        let teacher = self
            .context
            .database
            .update_teacher(UpdatedTeacher {
                id: teacher.id,
                display_name: Some(display_name),
                ..Default::default()
            })
            .await?;

        Ok(teacher)
    }

    pub async fn card(&self, username: &str) -> Result<TeacherCard, DatabaseError> {
        let teacher = self.context.database.teacher_by_username(username).await?;

        let card = match self.context.database.card_by_teacher(teacher.id).await {
            Ok(card) => Some(card),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };

        Ok(TeacherCard { teacher, card })
    }

    pub async fn update_card(
        &self,
        teacher: &TeacherData,
        update: CardUpdate,
    ) -> Result<TeacherCardData, StudioError> {
        if update.instruments.len() > MAX_INSTRUMENTS {
            return Err(StudioError::Invalid("Too many instruments"));
        }

        let instruments = update
            .instruments
            .into_iter()
            .map(|i| i.trim().to_string())
            .filter(|i| !i.is_empty())
            .collect();

        let card = self
            .context
            .database
            .upsert_card(TeacherCardData {
                teacher_id: teacher.id,
                headline: update.headline,
                bio: update.bio,
                instruments,
                image_url: update.image_url,
            })
            .await?;

        Ok(card)
    }
}
