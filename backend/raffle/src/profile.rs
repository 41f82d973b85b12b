use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{affiliate::looks_like_email, error::ValidationErrors};

pub const NAME_MAX: usize = 100;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

impl Profile {
    pub fn new(
        id: Uuid,
        name: &str,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationErrors> {
        let mut profile = Self {
            id,
            name: String::new(),
            email: email.trim().to_lowercase(),
            avatar_url: None,
            is_admin: false,
            created_at: now,
            updated_at: now,
        };

        let mut errors = ValidationErrors::default();
        if !looks_like_email(&profile.email) {
            errors.push("email", "Invalid email");
        }
        if let Err(e) = profile.set_name(name) {
            errors.0.extend(e.0);
        }
        errors.into_result()?;

        Ok(profile)
    }

    fn set_name(&mut self, name: &str) -> Result<(), ValidationErrors> {
        let name = name.trim();
        let mut errors = ValidationErrors::default();

        if name.is_empty() {
            errors.push("name", "Name is required");
        } else if name.chars().count() > NAME_MAX {
            errors.push("name", format!("Name must have at most {NAME_MAX} characters"));
        } else {
            self.name = name.to_string();
        }

        errors.into_result()
    }

    pub fn apply(
        &mut self,
        update: ProfileUpdate,
        now: DateTime<Utc>,
    ) -> Result<(), ValidationErrors> {
        if let Some(name) = update.name {
            self.set_name(&name)?;
        }
        if let Some(url) = update.avatar_url {
            self.avatar_url = Some(url).filter(|u| !u.trim().is_empty());
        }
        self.updated_at = now;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::tests::now;

    #[test]
    fn test_new_profile() {
        let profile =
            Profile::new(Uuid::new_v4(), " Gilson ", "Gilson@Example.com", now()).unwrap();

        assert_eq!(profile.name, "Gilson");
        assert_eq!(profile.email, "gilson@example.com");
        assert!(!profile.is_admin);
    }

    #[test]
    fn test_new_profile_errors() {
        let errors = Profile::new(Uuid::new_v4(), "  ", "bad", now()).unwrap_err();

        assert!(errors.has("name"));
        assert!(errors.has("email"));
    }

    #[test]
    fn test_apply_update() {
        let mut profile = Profile::new(Uuid::new_v4(), "Gilson", "g@example.com", now()).unwrap();
        let update = ProfileUpdate {
            name: Some("Gil".to_string()),
            avatar_url: Some("https://cdn.example.com/a.png".to_string()),
        };

        profile.apply(update, now()).unwrap();
        assert_eq!(profile.name, "Gil");
        assert_eq!(profile.avatar_url.as_deref(), Some("https://cdn.example.com/a.png"));

        let update = ProfileUpdate {
            name: Some(String::new()),
            avatar_url: None,
        };
        assert!(profile.apply(update, now()).is_err());
        assert_eq!(profile.name, "Gil");
    }
}
