//! Request validation: field rules that collect [`SubError`]s, and extractors
//! that deserialize then validate a body or query string.

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    Json,
};
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use time::{macros::format_description, Date};
use uuid::Uuid;

use crate::error::{AppError, Reason, SubError, BAD_REQUEST_MSG};

/// Amounts are stored as NUMERIC(12,2).
const AMOUNT_SCALE: u32 = 2;
const AMOUNT_INTEGER_DIGITS: u32 = 10;

fn max_amount() -> Decimal {
    Decimal::from(10_i64.pow(AMOUNT_INTEGER_DIGITS))
}

pub trait Validate {
    fn validate(&self) -> Result<(), Vec<SubError>>;
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn parse_date(value: &str) -> Result<Date, time::error::Parse> {
    Date::parse(value, format_description!("[year]-[month]-[day]"))
}

#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<SubError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rules for a field that must be present.
    pub fn field<'a>(&'a mut self, name: &'static str, value: &'a str) -> StrField<'a> {
        StrField {
            errors: &mut self.errors,
            name,
            value,
            done: false,
        }
    }

    /// Rules for a field where an empty value means "not provided".
    pub fn optional<'a>(&'a mut self, name: &'static str, value: &'a str) -> StrField<'a> {
        StrField {
            errors: &mut self.errors,
            name,
            value,
            done: value.is_empty(),
        }
    }

    pub fn amount(&mut self, name: &'static str, value: Option<Decimal>, required: bool) {
        match value {
            None if required => self.push(SubError::new(name, serde_json::Value::Null, Reason::Required)),
            Some(v) if v <= Decimal::ZERO => {
                self.push(SubError::new(name, v.to_string(), Reason::GreaterThan))
            }
            Some(v) if v.normalize().scale() > AMOUNT_SCALE || v >= max_amount() => {
                self.push(SubError::new(name, v.to_string(), Reason::TooLong))
            }
            _ => {}
        }
    }

    pub fn range(&mut self, name: &'static str, value: i64, min: i64, max: i64) {
        if value < min {
            self.push(SubError::new(name, value, Reason::TooShort));
        } else if value > max {
            self.push(SubError::new(name, value, Reason::TooLong));
        }
    }

    pub fn push(&mut self, error: SubError) {
        self.errors.push(error);
    }

    pub fn finish(self) -> Result<(), Vec<SubError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// Chain of checks on one string field; only the first failure is reported.
pub struct StrField<'a> {
    errors: &'a mut Vec<SubError>,
    name: &'static str,
    value: &'a str,
    done: bool,
}

impl<'a> StrField<'a> {
    fn check(mut self, ok: bool, reason: Reason) -> Self {
        if !self.done && !ok {
            self.errors.push(SubError::new(self.name, self.value, reason));
            self.done = true;
        }
        self
    }

    pub fn required(self) -> Self {
        let ok = !self.value.trim().is_empty();
        self.check(ok, Reason::Required)
    }

    pub fn max_len(self, max: usize) -> Self {
        let ok = self.value.chars().count() <= max;
        self.check(ok, Reason::TooLong)
    }

    pub fn min_len(self, min: usize) -> Self {
        let ok = self.value.chars().count() >= min;
        self.check(ok, Reason::TooShort)
    }

    pub fn email(self) -> Self {
        let ok = is_valid_email(self.value.trim());
        self.check(ok, Reason::EmailFormat)
    }

    pub fn alpha(self) -> Self {
        let ok = self.value.chars().all(|c| c.is_ascii_alphabetic());
        self.check(ok, Reason::MustAlpha)
    }

    /// Letters with single words separated by spaces, e.g. a city name.
    pub fn alpha_spaced(self) -> Self {
        let ok = self
            .value
            .chars()
            .all(|c| c.is_ascii_alphabetic() || c == ' ');
        self.check(ok, Reason::MustAlpha)
    }

    pub fn numeric(self) -> Self {
        let ok = self.value.chars().all(|c| c.is_ascii_digit());
        self.check(ok, Reason::MustNumeric)
    }

    pub fn uuid(self) -> Self {
        let ok = Uuid::parse_str(self.value).is_ok();
        self.check(ok, Reason::MustUuid)
    }

    pub fn date(self) -> Self {
        let ok = parse_date(self.value).is_ok();
        self.check(ok, Reason::DateFormat)
    }

    pub fn one_of(self, allowed: &[&str]) -> Self {
        let ok = allowed.contains(&self.value);
        self.check(ok, Reason::OneOf)
    }
}

/// Validate a path id and return it parsed.
pub fn parse_id(name: &'static str, raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw)
        .map_err(|_| AppError::validation(vec![SubError::new(name, raw, Reason::MustUuid)]))
}

/// JSON body that has passed [`Validate`].
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|rejection| {
            AppError::bad_request(BAD_REQUEST_MSG).with_cause(anyhow::anyhow!(rejection.body_text()))
        })?;
        value.validate().map_err(AppError::validation)?;
        Ok(Self(value))
    }
}

/// Query string that has passed [`Validate`].
pub struct ValidQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                AppError::bad_request(BAD_REQUEST_MSG)
                    .with_cause(anyhow::anyhow!(rejection.body_text()))
            })?;
        value.validate().map_err(AppError::validation)?;
        Ok(Self(value))
    }
}
