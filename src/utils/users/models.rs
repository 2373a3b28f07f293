use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Authority levels, ordered from least to most privileged.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[default]
    Entrant,
    Organizer,
    Admin,
}

impl Role {
    pub fn promoted(self) -> Self {
        match self {
            Role::Entrant => Role::Organizer,
            Role::Organizer | Role::Admin => Role::Admin,
        }
    }

    pub fn demoted(self) -> Self {
        match self {
            Role::Admin => Role::Organizer,
            Role::Organizer | Role::Entrant => Role::Entrant,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Entrant => "ENTRANT",
            Role::Organizer => "ORGANIZER",
            Role::Admin => "ADMIN",
        }
    }
}

impl TryFrom<&str> for Role {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_uppercase().as_str() {
            "ENTRANT" => Ok(Role::Entrant),
            "ORGANIZER" => Ok(Role::Organizer),
            "ADMIN" => Ok(Role::Admin),
            other => Err(format!("{other} is not a known role")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub struct User {
    /// Opaque installation identifier, never interpreted.
    pub user_id: String,
    pub name: String,
    pub role: Role,
    /// Sticky once set.
    pub demoted: bool,
    pub system_notifications: bool,
    pub organizer_notifications: bool,
    pub device_token: Option<String>,
}

impl User {
    pub fn entrant(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            name: format!("Untitled_{}", rand::random::<u16>() % 9000 + 1000),
            role: Role::Entrant,
            demoted: false,
            system_notifications: true,
            organizer_notifications: true,
            device_token: None,
        }
    }

    pub fn has_abilities_of_role(&self, role: Role) -> bool {
        self.role >= role
    }

    pub fn promote(self) -> Self {
        Self {
            role: self.role.promoted(),
            ..self
        }
    }

    pub fn demote(self) -> Self {
        let role = self.role.demoted();
        Self {
            demoted: self.demoted || role != self.role,
            role,
            ..self
        }
    }

    /// Whether a push for this kind of notification should reach the device.
    pub fn wants_push(&self, from_organizer: bool) -> bool {
        if from_organizer {
            self.organizer_notifications
        } else {
            self.system_notifications
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema, Validate)]
pub struct UserPreferences {
    #[validate(length(min = 1, max = 64))]
    pub name: Option<String>,
    pub system_notifications: Option<bool>,
    pub organizer_notifications: Option<bool>,
    pub device_token: Option<String>,
}

#[cfg(test)]
mod role_tests {
    use super::*;

    #[test]
    fn admin_has_every_ability() {
        let user = User {
            role: Role::Admin,
            ..User::entrant("admin")
        };
        assert!(user.has_abilities_of_role(Role::Entrant));
        assert!(user.has_abilities_of_role(Role::Organizer));
        assert!(user.has_abilities_of_role(Role::Admin));
    }

    #[test]
    fn entrant_lacks_organizer_abilities() {
        let user = User::entrant("someone");
        assert!(user.has_abilities_of_role(Role::Entrant));
        assert!(!user.has_abilities_of_role(Role::Organizer));
    }

    #[test]
    fn promotion_climbs_and_saturates() {
        let user = User::entrant("u").promote();
        assert_eq!(user.role, Role::Organizer);
        let user = user.promote().promote();
        assert_eq!(user.role, Role::Admin);
        assert!(!user.demoted);
    }

    #[test]
    fn demotion_is_sticky() {
        let user = User::entrant("u").promote().demote();
        assert_eq!(user.role, Role::Entrant);
        assert!(user.demoted);

        let user = user.promote();
        assert_eq!(user.role, Role::Organizer);
        assert!(user.demoted);
    }

    #[test]
    fn demoting_an_entrant_changes_nothing() {
        let user = User::entrant("u").demote();
        assert_eq!(user.role, Role::Entrant);
        assert!(!user.demoted);
    }

    #[test]
    fn role_parsing() {
        assert_eq!(Role::try_from("organizer"), Ok(Role::Organizer));
        assert!(Role::try_from("owner").is_err());
    }
}
