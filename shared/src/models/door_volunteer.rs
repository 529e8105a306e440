//! Door Volunteer Model
//!
//! Door volunteers are the members of one DanceCloud team; membership is
//! what grants access to the point-of-sale app on the door.

use serde::{Deserialize, Serialize};

/// Member of the door volunteers team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoorVolunteer {
    /// Team membership id (not the member's own id)
    pub volunteer_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Add door volunteer payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoorVolunteerAdd {
    pub email: String,
}

impl DoorVolunteerAdd {
    /// The email must belong to an existing DanceCloud account; only the
    /// shape is checked here.
    pub fn validate(&self) -> Result<(), String> {
        let email = self.email.trim();
        let Some((local, domain)) = email.split_once('@') else {
            return Err("email must contain '@'".to_string());
        };
        if local.is_empty() || domain.is_empty() || domain.contains('@') {
            return Err(format!("{email:?} is not an email address"));
        }
        if email.chars().any(char::is_whitespace) {
            return Err("email must not contain spaces".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(email: &str) -> DoorVolunteerAdd {
        DoorVolunteerAdd {
            email: email.to_string(),
        }
    }

    #[test]
    fn test_validate() {
        assert!(add("door@esds.org.uk").validate().is_ok());
        assert!(add("  door@esds.org.uk ").validate().is_ok());
        assert!(add("door").validate().is_err());
        assert!(add("@esds.org.uk").validate().is_err());
        assert!(add("door@").validate().is_err());
        assert!(add("a@b@c").validate().is_err());
        assert!(add("do or@esds.org.uk").validate().is_err());
    }
}
