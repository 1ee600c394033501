use serde::Deserialize;

use super::{EMAIL, FormGroup, Rule, ValidationErrors};

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoginInput {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

pub struct LoginForm {
    group: FormGroup,
}

impl LoginForm {
    pub fn new() -> Self {
        Self {
            group: FormGroup::new("Please enter a valid email and password.")
                .field("email", vec![Rule::Required, Rule::Pattern(&EMAIL)])
                .field("password", vec![Rule::Required]),
        }
    }

    pub fn submit(&mut self, input: &LoginInput) -> Result<LoginInput, ValidationErrors> {
        self.group.set("email", input.email.trim());
        self.group.set("password", input.password.as_str());
        self.group.validate()?;

        Ok(LoginInput {
            email: self.group.value("email").to_string(),
            password: self.group.value("password").to_string(),
        })
    }
}

impl Default for LoginForm {
    fn default() -> Self {
        Self::new()
    }
}
