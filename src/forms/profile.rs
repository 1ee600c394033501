use serde::{Deserialize, Serialize};

use super::{FormGroup, PROFILE_PHONE, Rule, ValidationErrors};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone_number: String,
}

pub struct ProfileForm {
    group: FormGroup,
}

impl ProfileForm {
    pub fn new() -> Self {
        Self {
            group: FormGroup::new("Please correct the highlighted profile fields.")
                .field("username", vec![Rule::Required, Rule::MinLength(3)])
                .field("full_name", vec![Rule::Required])
                .field("phone_number", vec![Rule::Pattern(&PROFILE_PHONE)]),
        }
    }

    pub fn submit(&mut self, input: &ProfileUpdate) -> Result<ProfileUpdate, ValidationErrors> {
        self.group.set("username", input.username.trim());
        self.group.set("full_name", input.full_name.trim());
        self.group.set("phone_number", input.phone_number.trim());
        self.group.validate()?;

        Ok(ProfileUpdate {
            username: self.group.value("username").to_string(),
            full_name: self.group.value("full_name").to_string(),
            phone_number: self.group.value("phone_number").to_string(),
        })
    }
}

impl Default for ProfileForm {
    fn default() -> Self {
        Self::new()
    }
}
