//! Per-step validation rules.
//!
//! This is the single canonical validator for step data. The session's
//! coarse "is this step complete" check, autosave gating and submission all
//! go through [`validate_step`].
//!
//! Field rules run first. Cross-field rules (WhatsApp number, price range,
//! both ID sides, payout details) only run once every field rule of the step
//! has passed.

use std::sync::LazyLock;

use regex::Regex;

use super::model::{
    BasicInfo, Experience, FormData, Identity, Location, MAX_PORTFOLIO_IMAGES,
    MIN_PORTFOLIO_IMAGES, PaymentMethod, Payout, Portfolio, Review, ServiceDetails, Specialties,
};
use super::step::StepKey;
use crate::error::{FieldError, ValidationError};

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[+]?[1-9]\d{9,14}$").unwrap());

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_'+\-.]*[A-Za-z0-9_+-]@([A-Za-z0-9][A-Za-z0-9\-]*\.)+[A-Za-z]{2,}$")
        .unwrap()
});

static PINCODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[1-9][0-9]{5}$").unwrap());

static IFSC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z]{4}0[A-Z0-9]{6}$").unwrap());

static UPI_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\w.-]+@[\w.-]+$").unwrap());

/// Email check: the local part may not start with a dot and no dots may
/// repeat; the top-level domain is at least two letters.
fn is_valid_email(value: &str) -> bool {
    !value.starts_with('.') && !value.contains("..") && EMAIL_RE.is_match(value)
}

/// Collects field errors for one step.
#[derive(Default)]
struct Checker {
    errors: Vec<FieldError>,
}

impl Checker {
    fn fail(&mut self, field: &str, message: &str) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    fn length(&mut self, field: &str, value: &str, min: usize, max: usize, short: &str, long: &str) {
        let len = value.chars().count();
        if len < min {
            self.fail(field, short);
        } else if len > max {
            self.fail(field, long);
        }
    }

    fn range(&mut self, field: &str, value: i64, min: i64, max: i64, low: &str, high: &str) {
        if value < min {
            self.fail(field, low);
        } else if value > max {
            self.fail(field, high);
        }
    }

    fn pattern(&mut self, field: &str, value: &str, re: &Regex, message: &str) {
        if !re.is_match(value) {
            self.fail(field, message);
        }
    }

    fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    fn finish(self, step: StepKey) -> Result<(), ValidationError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                step: step.to_string(),
                errors: self.errors,
            })
        }
    }
}

/// Validate one step's record.
pub fn validate_step(step: StepKey, data: &FormData) -> Result<(), ValidationError> {
    let mut c = Checker::default();
    match step {
        StepKey::BasicInfo => check_basic_info(&mut c, &data.basic_info),
        StepKey::Location => check_location(&mut c, &data.location),
        StepKey::Specialties => check_specialties(&mut c, &data.specialties),
        StepKey::Experience => check_experience(&mut c, &data.experience),
        StepKey::Portfolio => check_portfolio(&mut c, &data.portfolio),
        StepKey::ServiceDetails => check_service_details(&mut c, &data.service_details),
        StepKey::Identity => check_identity(&mut c, &data.identity),
        StepKey::Payout => check_payout(&mut c, &data.payout),
        StepKey::Review => check_review(&mut c, &data.review),
    }
    c.finish(step)
}

/// Whether the step's record currently passes its rules.
pub fn is_step_valid(step: StepKey, data: &FormData) -> bool {
    validate_step(step, data).is_ok()
}

/// Validate every step. Field names are prefixed with the step key,
/// e.g. `payout.upiId`.
pub fn validate_all(data: &FormData) -> Result<(), ValidationError> {
    let errors: Vec<FieldError> = StepKey::ALL
        .into_iter()
        .filter_map(|step| validate_step(step, data).err())
        .flat_map(|err| {
            let step = err.step;
            err.errors.into_iter().map(move |e| FieldError {
                field: format!("{step}.{}", e.field),
                message: e.message,
            })
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError {
            step: "onboarding".to_string(),
            errors,
        })
    }
}

fn check_basic_info(c: &mut Checker, d: &BasicInfo) {
    c.length(
        "fullName",
        &d.full_name,
        2,
        50,
        "Full name must be at least 2 characters",
        "Full name must be less than 50 characters",
    );
    c.length(
        "shopName",
        &d.shop_name,
        2,
        100,
        "Shop name must be at least 2 characters",
        "Shop name must be less than 100 characters",
    );
    c.pattern("phone", &d.phone, &PHONE_RE, "Please enter a valid phone number");
    if !is_valid_email(&d.email) {
        c.fail("email", "Please enter a valid email address");
    }

    if c.is_clean()
        && !d.whatsapp_same_as_phone
        && !PHONE_RE.is_match(&d.whatsapp_number)
    {
        c.fail("whatsappNumber", "Please provide a valid WhatsApp number");
    }
}

fn check_location(c: &mut Checker, d: &Location) {
    c.length(
        "address1",
        &d.address1,
        10,
        200,
        "Address must be at least 10 characters",
        "Address too long",
    );
    c.length("address2", &d.address2, 0, 200, "", "Address too long");
    c.length(
        "city",
        &d.city,
        2,
        50,
        "City name must be at least 2 characters",
        "City name too long",
    );
    c.pattern(
        "pincode",
        &d.pincode,
        &PINCODE_RE,
        "Please enter a valid 6-digit pincode",
    );
}

fn check_specialties(c: &mut Checker, d: &Specialties) {
    if d.specialties.is_empty() {
        c.fail("specialties", "Please select at least one specialty");
    }
    c.length(
        "customSpecialty",
        &d.custom_specialty,
        0,
        50,
        "",
        "Custom specialty too long",
    );
}

fn check_experience(c: &mut Checker, d: &Experience) {
    c.range(
        "yearsOfExperience",
        d.years_of_experience,
        0,
        50,
        "Experience cannot be negative",
        "Experience seems too high",
    );
    c.range(
        "maxOrdersPerWeek",
        d.max_orders_per_week,
        1,
        100,
        "Must handle at least 1 order per week",
        "Maximum 100 orders per week",
    );
    c.range(
        "maxOrdersPerMonth",
        d.max_orders_per_month,
        1,
        500,
        "Must handle at least 1 order per month",
        "Maximum 500 orders per month",
    );
}

fn check_portfolio(c: &mut Checker, d: &Portfolio) {
    let count = d.portfolio_images.len();
    if count < MIN_PORTFOLIO_IMAGES {
        c.fail("portfolioImages", "Please upload at least 3 portfolio images");
    } else if count > MAX_PORTFOLIO_IMAGES {
        c.fail("portfolioImages", "Maximum 10 images allowed");
    }
}

fn check_service_details(c: &mut Checker, d: &ServiceDetails) {
    if d.price_min < 1 {
        c.fail("priceMin", "Minimum price must be at least ₹1");
    }
    if d.price_max < 1 {
        c.fail("priceMax", "Maximum price must be at least ₹1");
    }
    c.range(
        "turnaroundTime",
        d.turnaround_time,
        1,
        60,
        "Turnaround time must be at least 1 day",
        "Maximum 60 days",
    );

    if c.is_clean() && d.price_min > d.price_max {
        c.fail("priceMax", "Maximum price cannot be less than minimum price");
    }
}

fn check_identity(c: &mut Checker, d: &Identity) {
    if d.id_front.is_none() || d.id_back.is_none() {
        c.fail("idBack", "Please upload both front and back images of your ID");
    }
}

fn check_payout(c: &mut Checker, d: &Payout) {
    let ok = match d.payment_method {
        PaymentMethod::Bank => {
            !d.account_holder_name.is_empty()
                && !d.bank_name.is_empty()
                && !d.account_number.is_empty()
                && IFSC_RE.is_match(&d.ifsc_code)
        }
        PaymentMethod::Upi => UPI_RE.is_match(&d.upi_id),
    };
    if !ok {
        c.fail("upiId", "Please provide valid payment details");
    }
}

fn check_review(c: &mut Checker, d: &Review) {
    if !d.accept_terms {
        c.fail("acceptTerms", "You must accept the terms and conditions");
    }
}
