use serde::Deserialize;

use super::{
    EMAIL, FULL_NAME, FormGroup, LICENSE, PHONE, PLATE, Rule, USERNAME, VEHICLE_MODEL,
    ValidationErrors, strong_password,
};
use crate::models::{ProfileMetadata, Role};

const DRIVER_FIELDS: [&str; 3] = ["licenseNumber", "vehicleModel", "vehiclePlate"];

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SignupInput {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub license_number: String,
    #[serde(default)]
    pub vehicle_model: String,
    #[serde(default)]
    pub vehicle_plate: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DriverRegistration {
    pub license_number: String,
    pub vehicle_model: String,
    pub vehicle_plate: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub metadata: ProfileMetadata,
    pub driver: Option<DriverRegistration>,
}

pub struct SignupForm {
    group: FormGroup,
    role: Role,
}

impl SignupForm {
    pub fn new() -> Self {
        let group = FormGroup::new(
            "Validation Error: Please ensure all fields match the required formats.",
        )
        .field("fullName", vec![Rule::Required, Rule::Pattern(&FULL_NAME)])
        .field("username", vec![Rule::Required, Rule::Pattern(&USERNAME)])
        .field("email", vec![Rule::Required, Rule::Pattern(&EMAIL)])
        .field("phoneNumber", vec![Rule::Required, Rule::Pattern(&PHONE)])
        .field(
            "password",
            vec![Rule::Required, Rule::Custom("pattern", strong_password)],
        )
        .field("licenseNumber", Vec::new())
        .field("vehicleModel", Vec::new())
        .field("vehiclePlate", Vec::new());

        Self {
            group,
            role: Role::Customer,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn group(&self) -> &FormGroup {
        &self.group
    }

    /// Attaches the driver-only validators, or clears and detaches them.
    pub fn select_role(&mut self, role: Role) {
        self.role = role;

        if role == Role::Driver {
            self.group.set_rules(
                "licenseNumber",
                vec![Rule::Required, Rule::Pattern(&LICENSE)],
            );
            self.group.set_rules(
                "vehicleModel",
                vec![Rule::Required, Rule::Pattern(&VEHICLE_MODEL)],
            );
            self.group
                .set_rules("vehiclePlate", vec![Rule::Required, Rule::Pattern(&PLATE)]);
        } else {
            for name in DRIVER_FIELDS {
                self.group.clear_rules(name);
                self.group.set(name, "");
            }
        }
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.group.set(name, value);
    }

    pub fn is_valid(&self) -> bool {
        self.group.is_valid()
    }

    pub fn fill(&mut self, input: &SignupInput) {
        self.select_role(input.role);
        self.set("fullName", input.full_name.as_str());
        self.set("username", input.username.as_str());
        self.set("email", input.email.as_str());
        self.set("phoneNumber", input.phone_number.as_str());
        self.set("password", input.password.as_str());

        if self.role == Role::Driver {
            self.set("licenseNumber", input.license_number.as_str());
            self.set("vehicleModel", input.vehicle_model.as_str());
            self.set("vehiclePlate", input.vehicle_plate.as_str());
        }
    }

    pub fn submit(&mut self) -> Result<SignupRequest, ValidationErrors> {
        self.group.validate()?;

        let value = |name: &str| self.group.value(name).to_string();
        let driver = (self.role == Role::Driver).then(|| DriverRegistration {
            license_number: value("licenseNumber").to_uppercase(),
            vehicle_model: value("vehicleModel"),
            vehicle_plate: value("vehiclePlate").to_uppercase(),
        });

        Ok(SignupRequest {
            email: value("email"),
            password: value("password"),
            metadata: ProfileMetadata {
                full_name: value("fullName"),
                username: value("username"),
                phone_number: value("phoneNumber"),
                role: self.role,
            },
            driver,
        })
    }
}

impl Default for SignupForm {
    fn default() -> Self {
        Self::new()
    }
}
