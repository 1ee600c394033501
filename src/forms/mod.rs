//! Declarative field validation shared by every form the screens accept.
//!
//! A [`FormGroup`] holds named [`Field`]s. Each field carries its raw text
//! value, its [`Rule`]s and an enabled flag; disabled fields are skipped when
//! computing validity and omitted from [`FormGroup::values`]. Rules can be
//! attached and detached at runtime, which is how the sign-up form switches
//! driver-only requirements on and off.

pub mod booking;
pub mod login;
pub mod profile;
pub mod route;
pub mod signup;
pub mod vehicle;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

pub use booking::BookingForm;
pub use login::LoginForm;
pub use profile::ProfileForm;
pub use route::RouteForm;
pub use signup::SignupForm;
pub use vehicle::VehicleForm;

pub static FULL_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z\s\-']{3,50}$").expect("valid regex"));
pub static USERNAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_]{3,20}$").expect("valid regex"));
pub static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid regex")
});
pub static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9]{10}$").expect("valid regex"));
pub static PROFILE_PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9+ ]+$").expect("valid regex"));
static PASSWORD_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z\d@$!%*#?&_\-]{6,}$").expect("valid regex"));
pub static LICENSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[A-Z0-9\-]{6,20}$").expect("valid regex"));
pub static VEHICLE_MODEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9\s\.\-]{2,30}$").expect("valid regex"));
pub static PLATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[A-Z]{2}[\s\-]?[0-9]{1,2}[\s\-]?[A-Z]{1,3}[\s\-]?[0-9]{4}$")
        .expect("valid regex")
});

/// At least six allowed characters with one letter and one digit.
pub fn strong_password(value: &str) -> bool {
    PASSWORD_CHARS.is_match(value)
        && value.chars().any(|c| c.is_ascii_alphabetic())
        && value.chars().any(|c| c.is_ascii_digit())
}

pub fn positive_number(value: &str) -> bool {
    value.trim().parse::<f64>().is_ok_and(|n| n > 0.0)
}

#[derive(Clone)]
pub enum Rule {
    Required,
    Pattern(&'static LazyLock<Regex>),
    MinLength(usize),
    Custom(&'static str, fn(&str) -> bool),
}

impl Rule {
    /// Error code when `value` breaks this rule. Empty values only fail `Required`.
    fn check(&self, value: &str) -> Option<&'static str> {
        match self {
            Rule::Required => value.is_empty().then_some("required"),
            _ if value.is_empty() => None,
            Rule::Pattern(regex) => (!regex.is_match(value)).then_some("pattern"),
            Rule::MinLength(min) => (value.chars().count() < *min).then_some("minlength"),
            Rule::Custom(code, accepts) => (!accepts(value)).then_some(*code),
        }
    }
}

#[derive(Clone)]
pub struct Field {
    pub name: &'static str,
    pub value: String,
    pub rules: Vec<Rule>,
    pub enabled: bool,
    pub touched: bool,
}

impl Field {
    pub fn errors(&self) -> Vec<&'static str> {
        if !self.enabled {
            return Vec::new();
        }
        self.rules.iter().filter_map(|rule| rule.check(&self.value)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    #[serde(skip)]
    message: String,
    #[serde(flatten)]
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn single(message: &str, field: &str, code: &str) -> Self {
        Self {
            message: message.to_string(),
            fields: BTreeMap::from([(field.to_string(), vec![code.to_string()])]),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn fields(&self) -> &BTreeMap<String, Vec<String>> {
        &self.fields
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.fields.keys().map(String::as_str).collect();
        write!(f, "{} [{}]", self.message, names.join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

#[derive(Clone)]
pub struct FormGroup {
    fields: Vec<Field>,
    invalid_message: &'static str,
}

impl FormGroup {
    pub fn new(invalid_message: &'static str) -> Self {
        Self {
            fields: Vec::new(),
            invalid_message,
        }
    }

    pub fn field(mut self, name: &'static str, rules: Vec<Rule>) -> Self {
        self.fields.push(Field {
            name,
            value: String::new(),
            rules,
            enabled: true,
            touched: false,
        });
        self
    }

    pub fn disabled_field(self, name: &'static str, rules: Vec<Rule>) -> Self {
        let mut group = self.field(name, rules);
        if let Some(last) = group.fields.last_mut() {
            last.enabled = false;
        }
        group
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|field| field.name == name)
    }

    pub fn value(&self, name: &str) -> &str {
        self.get(name).map(|field| field.value.as_str()).unwrap_or("")
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        if let Some(field) = self.get_mut(name) {
            field.value = value.into();
        }
    }

    pub fn set_rules(&mut self, name: &str, rules: Vec<Rule>) {
        if let Some(field) = self.get_mut(name) {
            field.rules = rules;
        }
    }

    pub fn clear_rules(&mut self, name: &str) {
        self.set_rules(name, Vec::new());
    }

    pub fn enable(&mut self, name: &str) {
        if let Some(field) = self.get_mut(name) {
            field.enabled = true;
        }
    }

    pub fn disable(&mut self, name: &str) {
        if let Some(field) = self.get_mut(name) {
            field.enabled = false;
        }
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.get(name).is_some_and(|field| field.enabled)
    }

    pub fn is_valid(&self) -> bool {
        self.fields.iter().all(|field| field.errors().is_empty())
    }

    pub fn mark_all_touched(&mut self) {
        for field in &mut self.fields {
            field.touched = true;
        }
    }

    pub fn errors(&self) -> BTreeMap<String, Vec<String>> {
        self.fields
            .iter()
            .filter_map(|field| {
                let errors = field.errors();
                (!errors.is_empty()).then(|| {
                    (
                        field.name.to_string(),
                        errors.into_iter().map(str::to_string).collect(),
                    )
                })
            })
            .collect()
    }

    /// Blocks submission on any failure and marks every field touched.
    pub fn validate(&mut self) -> Result<(), ValidationErrors> {
        if self.is_valid() {
            return Ok(());
        }

        self.mark_all_touched();
        Err(ValidationErrors {
            message: self.invalid_message.to_string(),
            fields: self.errors(),
        })
    }

    /// Values of enabled fields only.
    pub fn values(&self) -> BTreeMap<&'static str, String> {
        self.fields
            .iter()
            .filter(|field| field.enabled)
            .map(|field| (field.name, field.value.clone()))
            .collect()
    }
}
