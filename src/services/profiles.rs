use crate::{
    entities::{profile, Profile},
    errors::ServiceError,
    events::{Event, EventSender},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, NotSet, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Contact details for authenticated users. Copied onto orders at
/// creation time; everything else about the user lives in the external
/// identity provider.
#[derive(Clone)]
pub struct ProfileService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl ProfileService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    pub async fn get(&self, user_id: i32) -> Result<ProfileView, ServiceError> {
        let record = Profile::find()
            .filter(profile::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Profile for user {} not found", user_id))
            })?;

        Ok(ProfileView::from(record))
    }

    /// Overwrite contact fields, creating the profile on first write.
    pub async fn update(
        &self,
        user_id: i32,
        input: ProfileInput,
    ) -> Result<ProfileView, ServiceError> {
        let existing = Profile::find()
            .filter(profile::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?;

        let saved = match existing {
            Some(record) => {
                let mut update: profile::ActiveModel = record.into();
                update.full_name = Set(input.full_name);
                update.email = Set(input.email);
                update.phone = Set(input.phone);
                update.update(&*self.db).await?
            }
            None => {
                profile::ActiveModel {
                    id: NotSet,
                    user_id: Set(user_id),
                    full_name: Set(input.full_name),
                    email: Set(input.email),
                    phone: Set(input.phone),
                }
                .insert(&*self.db)
                .await?
            }
        };

        self.event_sender
            .send_or_log(Event::ProfileUpdated(user_id))
            .await;

        Ok(ProfileView::from(saved))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileInput {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl From<profile::Model> for ProfileView {
    fn from(model: profile::Model) -> Self {
        Self {
            full_name: model.full_name,
            email: model.email,
            phone: model.phone,
        }
    }
}
