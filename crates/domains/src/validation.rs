//! # Request Validation
//!
//! Raw request payloads arrive here with every field optional and every enum
//! as a plain string. `validate` turns them into the typed models, collecting
//! every field failure at once rather than stopping at the first.
//!
//! Entity bodies travel as [`RawBody`] until the caller has been cleared to act
//! on the target, so a wrongly typed field cannot surface before a 404 or 403.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{AppError, Result, ValidationErrors};
use crate::models::{
    AdChanges, AdId, Condition, NewAd, NewProposal, ParseEnumError, ProposalStatus,
};

pub const TITLE_MAX_LENGTH: usize = 200;
pub const CATEGORY_MAX_LENGTH: usize = 100;
pub const IMAGE_URL_MAX_LENGTH: usize = 200;
pub const USERNAME_MAX_LENGTH: usize = 150;
pub const PASSWORD_MIN_LENGTH: usize = 8;

const REQUIRED: &str = "This field is required.";
const BLANK: &str = "This field may not be blank.";
const INCORRECT_TYPE: &str = "Incorrect type.";

/// A JSON request body that has not been checked against any shape yet.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct RawBody(Value);

impl From<Value> for RawBody {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl RawBody {
    /// Reads the body as `T`. Each field of the wrong JSON type is reported
    /// under its own name.
    pub fn decode<T: FromBody>(self) -> Result<T> {
        let Value::Object(map) = self.0 else {
            return Err(AppError::invalid("body", "Expected a JSON object."));
        };
        let mut fields = BodyFields {
            map,
            errors: ValidationErrors::default(),
        };
        let decoded = T::from_fields(&mut fields);
        fields.errors.into_result(decoded)
    }
}

/// Payloads that can be read field by field out of a JSON object.
pub trait FromBody: Sized {
    fn from_fields(fields: &mut BodyFields) -> Self;
}

/// The members of a body object, consumed as they are read.
#[derive(Debug)]
pub struct BodyFields {
    map: Map<String, Value>,
    errors: ValidationErrors,
}

impl BodyFields {
    /// `null` and an absent key both read as `None`.
    pub fn optional<T: DeserializeOwned>(&mut self, name: &str) -> Option<T> {
        self.optional_aliased(name, &[])
    }

    pub fn optional_aliased<T: DeserializeOwned>(
        &mut self,
        name: &str,
        aliases: &[&str],
    ) -> Option<T> {
        match self.take(name, aliases)? {
            Value::Null => None,
            value => self.typed(name, value),
        }
    }

    /// `Some(None)` when the client sent an explicit `null`.
    pub fn nullable<T: DeserializeOwned>(&mut self, name: &str) -> Option<Option<T>> {
        match self.take(name, &[])? {
            Value::Null => Some(None),
            value => self.typed(name, value).map(Some),
        }
    }

    fn take(&mut self, name: &str, aliases: &[&str]) -> Option<Value> {
        std::iter::once(name)
            .chain(aliases.iter().copied())
            .find_map(|key| self.map.remove(key))
    }

    fn typed<T: DeserializeOwned>(&mut self, name: &str, value: Value) -> Option<T> {
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(_) => {
                self.errors.push(name, INCORRECT_TYPE);
                None
            }
        }
    }
}

/// Body of an ad create or full update.
#[derive(Debug, Clone, Default)]
pub struct AdInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub condition: Option<String>,
}

impl FromBody for AdInput {
    fn from_fields(fields: &mut BodyFields) -> Self {
        Self {
            title: fields.optional("title"),
            description: fields.optional("description"),
            image_url: fields.optional("image_url"),
            category: fields.optional("category"),
            condition: fields.optional("condition"),
        }
    }
}

impl AdInput {
    pub fn validate(self) -> Result<NewAd> {
        let mut errors = ValidationErrors::default();

        let title = required_text(&mut errors, "title", self.title, Some(TITLE_MAX_LENGTH));
        let description = required_text(&mut errors, "description", self.description, None);
        let image_url = image_url(&mut errors, self.image_url);
        let category = required_text(
            &mut errors,
            "category",
            self.category,
            Some(CATEGORY_MAX_LENGTH),
        );
        let condition = match self.condition {
            None => {
                errors.push("condition", REQUIRED);
                None
            }
            Some(raw) => condition(&mut errors, &raw),
        };

        match (title, description, category, condition) {
            (Some(title), Some(description), Some(category), Some(condition))
                if errors.is_empty() =>
            {
                Ok(NewAd {
                    title,
                    description,
                    image_url,
                    category,
                    condition,
                })
            }
            _ => Err(AppError::ValidationError(errors)),
        }
    }
}

/// Body of an ad partial update. Absent fields stay as they are.
#[derive(Debug, Clone, Default)]
pub struct AdPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    /// `Some(None)` when the client sent an explicit `null`
    pub image_url: Option<Option<String>>,
    pub category: Option<String>,
    pub condition: Option<String>,
}

impl FromBody for AdPatch {
    fn from_fields(fields: &mut BodyFields) -> Self {
        Self {
            title: fields.optional("title"),
            description: fields.optional("description"),
            image_url: fields.nullable("image_url"),
            category: fields.optional("category"),
            condition: fields.optional("condition"),
        }
    }
}

impl AdPatch {
    pub fn validate(self) -> Result<AdChanges> {
        let mut errors = ValidationErrors::default();
        let changes = AdChanges {
            title: self
                .title
                .and_then(|v| required_text(&mut errors, "title", Some(v), Some(TITLE_MAX_LENGTH))),
            description: self
                .description
                .and_then(|v| required_text(&mut errors, "description", Some(v), None)),
            image_url: self.image_url.map(|v| image_url(&mut errors, v)),
            category: self.category.and_then(|v| {
                required_text(&mut errors, "category", Some(v), Some(CATEGORY_MAX_LENGTH))
            }),
            condition: self
                .condition
                .and_then(|raw| condition(&mut errors, &raw)),
        };
        errors.into_result(changes)
    }
}

/// Body of a proposal create. `ad_sender`/`ad_receiver` are accepted as
/// aliases of the id fields.
#[derive(Debug, Clone, Default)]
pub struct ProposalInput {
    pub ad_sender_id: Option<AdId>,
    pub ad_receiver_id: Option<AdId>,
    pub comment: Option<String>,
}

impl FromBody for ProposalInput {
    fn from_fields(fields: &mut BodyFields) -> Self {
        Self {
            ad_sender_id: fields.optional_aliased("ad_sender_id", &["ad_sender"]),
            ad_receiver_id: fields.optional_aliased("ad_receiver_id", &["ad_receiver"]),
            comment: fields.optional("comment"),
        }
    }
}

impl ProposalInput {
    pub fn validate(self) -> Result<NewProposal> {
        let mut errors = ValidationErrors::default();
        if self.ad_sender_id.is_none() {
            errors.push("ad_sender_id", REQUIRED);
        }
        if self.ad_receiver_id.is_none() {
            errors.push("ad_receiver_id", REQUIRED);
        }
        let comment = required_text(&mut errors, "comment", self.comment, None);

        match (self.ad_sender_id, self.ad_receiver_id, comment) {
            (Some(ad_sender_id), Some(ad_receiver_id), Some(comment)) if errors.is_empty() => {
                Ok(NewProposal {
                    ad_sender_id,
                    ad_receiver_id,
                    comment,
                })
            }
            _ => Err(AppError::ValidationError(errors)),
        }
    }
}

/// Body of a proposal update. Only the status is writable; any other keys a
/// client sends along are ignored.
#[derive(Debug, Clone, Default)]
pub struct StatusUpdate {
    pub status: Option<String>,
}

impl FromBody for StatusUpdate {
    fn from_fields(fields: &mut BodyFields) -> Self {
        Self {
            status: fields.optional("status"),
        }
    }
}

impl StatusUpdate {
    pub fn validate(self) -> Result<ProposalStatus> {
        let raw = self.status.ok_or_else(|| AppError::invalid("status", REQUIRED))?;
        raw.trim()
            .parse()
            .map_err(|e: ParseEnumError| AppError::invalid("status", format!("{e}.")))
    }
}

/// Username and password, used for both registration and login.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    /// Login only needs both fields present.
    pub fn require(self) -> Result<(String, String)> {
        let mut errors = ValidationErrors::default();
        let username = required_text(&mut errors, "username", self.username, None);
        if self.password.as_deref().map_or(true, str::is_empty) {
            errors.push("password", REQUIRED);
        }
        match (username, self.password) {
            (Some(username), Some(password)) if errors.is_empty() => Ok((username, password)),
            _ => Err(AppError::ValidationError(errors)),
        }
    }

    /// Registration applies the username alphabet and password length rules.
    pub fn validate_new(self) -> Result<(String, String)> {
        let mut errors = ValidationErrors::default();
        let username = required_text(
            &mut errors,
            "username",
            self.username,
            Some(USERNAME_MAX_LENGTH),
        );
        if let Some(name) = &username {
            if !name
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
            {
                errors.push(
                    "username",
                    "Enter a valid username. It may contain only letters, digits and @/./+/-/_.",
                );
            }
        }
        match &self.password {
            None => errors.push("password", REQUIRED),
            Some(p) if p.chars().count() < PASSWORD_MIN_LENGTH => errors.push(
                "password",
                format!("Ensure this field has at least {PASSWORD_MIN_LENGTH} characters."),
            ),
            Some(_) => {}
        }
        match (username, self.password) {
            (Some(username), Some(password)) if errors.is_empty() => Ok((username, password)),
            _ => Err(AppError::ValidationError(errors)),
        }
    }
}

/// Trims the value and checks presence, blankness and length in characters.
fn required_text(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<String>,
    max: Option<usize>,
) -> Option<String> {
    let Some(value) = value else {
        errors.push(field, REQUIRED);
        return None;
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.push(field, BLANK);
        return None;
    }
    if let Some(max) = max {
        if trimmed.chars().count() > max {
            errors.push(
                field,
                format!("Ensure this field has no more than {max} characters."),
            );
            return None;
        }
    }
    Some(trimmed.to_string())
}

/// Empty means "no image"; anything else must be an absolute http(s) URL.
fn image_url(errors: &mut ValidationErrors, value: Option<String>) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.chars().count() > IMAGE_URL_MAX_LENGTH {
        errors.push(
            "image_url",
            format!("Ensure this field has no more than {IMAGE_URL_MAX_LENGTH} characters."),
        );
        return None;
    }
    match url::Url::parse(trimmed) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => {
            Some(trimmed.to_string())
        }
        _ => {
            errors.push("image_url", "Enter a valid URL.");
            None
        }
    }
}

fn condition(errors: &mut ValidationErrors, raw: &str) -> Option<Condition> {
    match raw.trim().parse::<Condition>() {
        Ok(condition) => Some(condition),
        Err(e) => {
            errors.push("condition", format!("{e}."));
            None
        }
    }
}
