use serde::Deserialize;

use super::{FormGroup, Rule, ValidationErrors};
use crate::models::NewRoute;

fn whole_rupees(value: &str) -> bool {
    value.trim().parse::<u32>().is_ok_and(|price| price > 0)
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RouteInput {
    #[serde(default)]
    pub dest: String,
    #[serde(default)]
    pub km: String,
    #[serde(default)]
    pub price4: Option<u32>,
    #[serde(default)]
    pub price6: Option<u32>,
}

pub struct RouteForm {
    group: FormGroup,
}

impl RouteForm {
    pub fn new() -> Self {
        let price = || vec![Rule::Required, Rule::Custom("min", whole_rupees)];
        Self {
            group: FormGroup::new(
                "Mission parameters incomplete: Destination, KM, and both prices are required.",
            )
            .field("dest", vec![Rule::Required])
            .field("km", vec![Rule::Required])
            .field("price4", price())
            .field("price6", price()),
        }
    }

    pub fn submit(&mut self, input: &RouteInput) -> Result<NewRoute, ValidationErrors> {
        let price_text = |price: Option<u32>| price.map(|p| p.to_string()).unwrap_or_default();

        self.group.set("dest", input.dest.trim());
        self.group.set("km", input.km.trim());
        self.group.set("price4", price_text(input.price4));
        self.group.set("price6", price_text(input.price6));
        self.group.validate()?;

        Ok(NewRoute {
            dest: self.group.value("dest").to_string(),
            km: self.group.value("km").to_string(),
            price4: input.price4.unwrap_or_default(),
            price6: input.price6.unwrap_or_default(),
        })
    }
}

impl Default for RouteForm {
    fn default() -> Self {
        Self::new()
    }
}
