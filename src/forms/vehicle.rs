use serde::Deserialize;

use super::{FormGroup, Rule, ValidationErrors, positive_number};

pub const DEFAULT_CLASS: &str = "Premium Sedan (4 Seater)";
pub const DEFAULT_MIN_PACKAGE_KM: f64 = 300.0;

#[derive(Debug, Clone, Deserialize)]
pub struct VehicleInput {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_class", rename = "type")]
    pub class: String,
    #[serde(default)]
    pub rate: Option<f64>,
    #[serde(default = "default_min_package", rename = "minPkg")]
    pub min_package_km: f64,
    #[serde(default)]
    pub desc: String,
}

fn default_class() -> String {
    DEFAULT_CLASS.to_string()
}

fn default_min_package() -> f64 {
    DEFAULT_MIN_PACKAGE_KM
}

impl Default for VehicleInput {
    fn default() -> Self {
        Self {
            name: String::new(),
            class: default_class(),
            rate: None,
            min_package_km: DEFAULT_MIN_PACKAGE_KM,
            desc: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VehicleDraft {
    pub name: String,
    pub class: String,
    pub rate_per_km: f64,
    pub min_package_km: f64,
    pub description: String,
}

/// Fleet entry draft; the image is a field so a missing upload blocks submission.
pub struct VehicleForm {
    group: FormGroup,
}

impl VehicleForm {
    pub fn new() -> Self {
        Self {
            group: FormGroup::new(
                "SYSTEM ERROR: Please fill in all required fields and select an image.",
            )
            .field("name", vec![Rule::Required])
            .field("rate", vec![Rule::Required, Rule::Custom("min", positive_number)])
            .field("image", vec![Rule::Required]),
        }
    }

    pub fn submit(
        &mut self,
        input: &VehicleInput,
        image_name: Option<&str>,
    ) -> Result<VehicleDraft, ValidationErrors> {
        self.group.set("name", input.name.trim());
        self.group.set(
            "rate",
            input.rate.map(|rate| rate.to_string()).unwrap_or_default(),
        );
        self.group.set("image", image_name.unwrap_or_default());
        self.group.validate()?;

        Ok(VehicleDraft {
            name: self.group.value("name").to_string(),
            class: input.class.clone(),
            rate_per_km: input.rate.unwrap_or_default(),
            min_package_km: input.min_package_km,
            description: input.desc.trim().to_string(),
        })
    }
}

impl Default for VehicleForm {
    fn default() -> Self {
        Self::new()
    }
}
