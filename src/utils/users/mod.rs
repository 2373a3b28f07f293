pub mod errors;
pub mod models;

use tracing::{debug, info};

use crate::store::Store;
use crate::validation::{ValidateContent, ValidateContentError};

use self::errors::UserError;
use self::models::{Role, User, UserPreferences};

#[derive(Clone)]
pub struct UserDirectory {
    store: Store,
}

impl UserDirectory {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Returns the stored user, creating an entrant on first sight.
    pub async fn ensure(&self, user_id: &str) -> Result<User, UserError> {
        if user_id.trim().is_empty() {
            return Err(UserError::Unidentified);
        }
        if let Some(user) = self.store.fetch_user(user_id).await? {
            return Ok(user);
        }

        let user = User::entrant(user_id);
        self.store.upsert_user(&user).await?;
        debug!("Registered new installation {user_id} as {}", user.name);
        Ok(user)
    }

    pub async fn get(&self, user_id: &str) -> Result<User, UserError> {
        self.store
            .fetch_user(user_id)
            .await?
            .ok_or(UserError::NotFound)
    }

    pub async fn update_preferences(
        &self,
        user_id: &str,
        preferences: UserPreferences,
    ) -> Result<User, UserError> {
        preferences.validate_content().map_err(|e| match e {
            ValidateContentError::Expected(reason) => UserError::InvalidArgument(reason),
            ValidateContentError::Unexpected(e) => UserError::Store(e.into()),
        })?;

        let mut user = self.ensure(user_id).await?;
        if let Some(name) = preferences.name {
            user.name = name.trim().to_string();
        }
        if let Some(enabled) = preferences.system_notifications {
            user.system_notifications = enabled;
        }
        if let Some(enabled) = preferences.organizer_notifications {
            user.organizer_notifications = enabled;
        }
        if let Some(token) = preferences.device_token {
            user.device_token = Some(token).filter(|token| !token.is_empty());
        }

        self.store.upsert_user(&user).await?;
        Ok(user)
    }

    pub async fn promote(&self, actor: &User, target_id: &str) -> Result<User, UserError> {
        require_role(actor, Role::Admin)?;
        let user = self.get(target_id).await?.promote();
        self.store.upsert_user(&user).await?;
        info!("{} promoted {target_id} to {}", actor.user_id, user.role.as_str());
        Ok(user)
    }

    pub async fn demote(&self, actor: &User, target_id: &str) -> Result<User, UserError> {
        require_role(actor, Role::Admin)?;
        let user = self.get(target_id).await?.demote();
        self.store.upsert_user(&user).await?;
        info!("{} demoted {target_id} to {}", actor.user_id, user.role.as_str());
        Ok(user)
    }
}

pub fn require_role(user: &User, role: Role) -> Result<(), UserError> {
    if user.has_abilities_of_role(role) {
        Ok(())
    } else {
        Err(UserError::Forbidden)
    }
}
