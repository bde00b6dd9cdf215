//! Step records and form data models.
//!
//! Every step owns a flat record of primitives, string lists or upload
//! descriptors. Records serialize with camelCase field names, which is also
//! the shape sent to the draft backend and written to durable storage.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::step::StepKey;
use crate::error::FormDataError;

/// Minimum number of portfolio images for a complete portfolio step.
pub const MIN_PORTFOLIO_IMAGES: usize = 3;

/// Maximum number of portfolio images.
pub const MAX_PORTFOLIO_IMAGES: usize = 10;

/// Specialties offered as one-click choices.
pub const PREDEFINED_SPECIALTIES: &[&str] = &[
    "Blouse",
    "Salwar Suit",
    "Kurta Pajama",
    "Shirts",
    "Pants",
    "Lehenga",
    "Saree Alteration",
    "Western Dress",
    "Traditional Wear",
    "Formal Wear",
    "Casual Wear",
    "Wedding Outfits",
    "Children's Clothing",
    "Embroidery Work",
    "Patching & Repairs",
];

/// A file accepted by the upload service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedAsset {
    pub url: String,
    pub name: String,
}

/// Step 1: who the tailor is and how to reach them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BasicInfo {
    pub full_name: String,
    pub shop_name: String,
    pub phone: String,
    pub email: String,
    pub whatsapp_same_as_phone: bool,
    pub whatsapp_number: String,
}

impl Default for BasicInfo {
    fn default() -> Self {
        Self {
            full_name: String::new(),
            shop_name: String::new(),
            phone: String::new(),
            email: String::new(),
            whatsapp_same_as_phone: true,
            whatsapp_number: String::new(),
        }
    }
}

/// Step 2: shop address.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Location {
    pub address1: String,
    pub address2: String,
    pub city: String,
    pub pincode: String,
}

/// Step 3: garments the tailor works on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Specialties {
    pub specialties: Vec<String>,
    pub custom_specialty: String,
}

impl Specialties {
    /// Select `specialty` if absent, deselect it if present. Blank names are
    /// ignored. Returns whether the selection changed.
    pub fn toggle(&mut self, specialty: &str) -> bool {
        let trimmed = specialty.trim();
        if trimmed.is_empty() {
            return false;
        }
        if !self.remove(trimmed) {
            self.specialties.push(trimmed.to_string());
        }
        true
    }

    /// Append a free-text specialty. Blank or duplicate entries are ignored.
    pub fn add_custom(&mut self, specialty: &str) -> bool {
        let trimmed = specialty.trim();
        if trimmed.is_empty() || self.specialties.iter().any(|s| s == trimmed) {
            return false;
        }
        self.specialties.push(trimmed.to_string());
        true
    }

    /// Remove a specialty by value. Returns whether anything was removed.
    pub fn remove(&mut self, specialty: &str) -> bool {
        let before = self.specialties.len();
        self.specialties.retain(|s| s != specialty);
        self.specialties.len() != before
    }
}

/// Step 4: experience and weekly/monthly capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Experience {
    pub years_of_experience: i64,
    pub max_orders_per_week: i64,
    pub max_orders_per_month: i64,
}

impl Default for Experience {
    fn default() -> Self {
        Self {
            years_of_experience: 0,
            max_orders_per_week: 1,
            max_orders_per_month: 1,
        }
    }
}

/// Step 5: photos of previous work.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Portfolio {
    pub portfolio_images: Vec<UploadedAsset>,
}

impl Portfolio {
    /// Remove an image by value. Returns whether anything was removed.
    pub fn remove_image(&mut self, asset: &UploadedAsset) -> bool {
        let before = self.portfolio_images.len();
        self.portfolio_images.retain(|a| a != asset);
        self.portfolio_images.len() != before
    }
}

/// Step 6: pricing, turnaround and logistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceDetails {
    pub price_min: i64,
    pub price_max: i64,
    pub turnaround_time: i64,
    pub home_pickup: bool,
    pub home_delivery: bool,
}

impl Default for ServiceDetails {
    fn default() -> Self {
        Self {
            price_min: 100,
            price_max: 1000,
            turnaround_time: 7,
            home_pickup: false,
            home_delivery: false,
        }
    }
}

/// Government ID kinds accepted for verification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdType {
    #[default]
    Aadhaar,
    Voter,
    Other,
}

/// Step 7: identity document images.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Identity {
    pub id_type: IdType,
    pub id_front: Option<UploadedAsset>,
    pub id_back: Option<UploadedAsset>,
}

/// Which side of an ID document an upload belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdSide {
    Front,
    Back,
}

/// How the tailor wants to be paid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Bank,
    Upi,
}

/// Step 8: bank account or UPI payout details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Payout {
    pub payment_method: PaymentMethod,
    pub account_holder_name: String,
    pub bank_name: String,
    pub account_number: String,
    pub ifsc_code: String,
    pub upi_id: String,
}

/// Step 9: terms acceptance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Review {
    pub accept_terms: bool,
}

/// All nine step records. Every key is always present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormData {
    pub basic_info: BasicInfo,
    pub location: Location,
    pub specialties: Specialties,
    pub experience: Experience,
    pub portfolio: Portfolio,
    pub service_details: ServiceDetails,
    pub identity: Identity,
    pub payout: Payout,
    pub review: Review,
}

impl FormData {
    /// Serialize a single step record.
    pub fn step_value(&self, step: StepKey) -> Value {
        let value = match step {
            StepKey::BasicInfo => serde_json::to_value(&self.basic_info),
            StepKey::Location => serde_json::to_value(&self.location),
            StepKey::Specialties => serde_json::to_value(&self.specialties),
            StepKey::Experience => serde_json::to_value(&self.experience),
            StepKey::Portfolio => serde_json::to_value(&self.portfolio),
            StepKey::ServiceDetails => serde_json::to_value(&self.service_details),
            StepKey::Identity => serde_json::to_value(&self.identity),
            StepKey::Payout => serde_json::to_value(&self.payout),
            StepKey::Review => serde_json::to_value(&self.review),
        };
        // Plain structs of strings, numbers and bools always serialize.
        value.unwrap_or(Value::Null)
    }

    /// Build a one-field partial for `step` from typed text. String fields
    /// take the text as is; other fields parse it as JSON, falling back to a
    /// string so the merge reports the mismatch.
    pub fn field_patch(
        &self,
        step: StepKey,
        field: &str,
        raw: &str,
    ) -> Result<Value, FormDataError> {
        let record = self.step_value(step);
        let current = record
            .get(field)
            .ok_or_else(|| FormDataError::UnknownField {
                step: step.to_string(),
                field: field.to_string(),
            })?;
        let value = match current {
            Value::String(_) => Value::String(raw.to_string()),
            _ => serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())),
        };

        let mut patch = Map::new();
        patch.insert(field.to_string(), value);
        Ok(Value::Object(patch))
    }

    /// Shallow-merge `partial` into the record at `step`.
    ///
    /// Fields absent from `partial` keep their current values. If the merged
    /// object does not deserialize into the step's record the form data is
    /// left untouched.
    pub fn merge_step(&mut self, step: StepKey, partial: &Value) -> Result<(), FormDataError> {
        match step {
            StepKey::BasicInfo => {
                merge_record(&mut self.basic_info, step, partial)?;
                self.basic_info.sync_whatsapp(partial);
            }
            StepKey::Location => merge_record(&mut self.location, step, partial)?,
            StepKey::Specialties => merge_record(&mut self.specialties, step, partial)?,
            StepKey::Experience => merge_record(&mut self.experience, step, partial)?,
            StepKey::Portfolio => merge_record(&mut self.portfolio, step, partial)?,
            StepKey::ServiceDetails => merge_record(&mut self.service_details, step, partial)?,
            StepKey::Identity => merge_record(&mut self.identity, step, partial)?,
            StepKey::Payout => merge_record(&mut self.payout, step, partial)?,
            StepKey::Review => merge_record(&mut self.review, step, partial)?,
        }
        Ok(())
    }
}

impl BasicInfo {
    /// Mirror the phone into the WhatsApp number while the two are linked.
    /// Unlinking clears the number unless the same update supplies one.
    fn sync_whatsapp(&mut self, partial: &Value) {
        if self.whatsapp_same_as_phone {
            self.whatsapp_number = self.phone.clone();
        } else if partial.get("whatsappSameAsPhone") == Some(&Value::Bool(false))
            && partial.get("whatsappNumber").is_none()
        {
            self.whatsapp_number.clear();
        }
    }
}

fn merge_record<T>(record: &mut T, step: StepKey, partial: &Value) -> Result<(), FormDataError>
where
    T: Serialize + DeserializeOwned,
{
    let patch = partial.as_object().ok_or_else(|| FormDataError::NotAnObject {
        step: step.to_string(),
    })?;

    let mut merged = match serde_json::to_value(&*record) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    if let Some(unknown) = patch.keys().find(|key| !merged.contains_key(*key)) {
        return Err(FormDataError::UnknownField {
            step: step.to_string(),
            field: unknown.clone(),
        });
    }
    for (key, value) in patch {
        merged.insert(key.clone(), value.clone());
    }

    *record = serde_json::from_value(Value::Object(merged)).map_err(|source| {
        FormDataError::Shape {
            step: step.to_string(),
            source,
        }
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_match_wire_shape() {
        let value = serde_json::to_value(FormData::default()).unwrap();
        assert_eq!(value["basicInfo"]["whatsappSameAsPhone"], true);
        assert_eq!(value["experience"]["maxOrdersPerWeek"], 1);
        assert_eq!(value["serviceDetails"]["priceMax"], 1000);
        assert_eq!(value["identity"]["idType"], "aadhaar");
        assert!(value["identity"]["idFront"].is_null());
        assert_eq!(value["payout"]["paymentMethod"], "bank");
        assert_eq!(value["review"]["acceptTerms"], false);
        assert_eq!(value.as_object().unwrap().len(), 9);
    }

    #[test]
    fn merge_keeps_sibling_fields() {
        let mut data = FormData::default();
        data.merge_step(StepKey::BasicInfo, &json!({ "fullName": "X" }))
            .unwrap();
        data.merge_step(StepKey::BasicInfo, &json!({ "shopName": "Y" }))
            .unwrap();
        assert_eq!(data.basic_info.full_name, "X");
        assert_eq!(data.basic_info.shop_name, "Y");
    }

    #[test]
    fn merge_rejects_non_object() {
        let mut data = FormData::default();
        let err = data
            .merge_step(StepKey::Location, &json!("Pune"))
            .unwrap_err();
        assert!(matches!(err, FormDataError::NotAnObject { .. }));
    }

    #[test]
    fn merge_with_wrong_type_leaves_record_untouched() {
        let mut data = FormData::default();
        data.merge_step(StepKey::Experience, &json!({ "yearsOfExperience": 4 }))
            .unwrap();
        let err = data
            .merge_step(StepKey::Experience, &json!({ "maxOrdersPerWeek": "lots" }))
            .unwrap_err();
        assert!(matches!(err, FormDataError::Shape { .. }));
        assert_eq!(data.experience.years_of_experience, 4);
        assert_eq!(data.experience.max_orders_per_week, 1);
    }

    #[test]
    fn merge_rejects_unknown_fields() {
        let mut data = FormData::default();
        let err = data
            .merge_step(StepKey::BasicInfo, &json!({ "fullname": "Asha", "shopName": "A" }))
            .unwrap_err();
        match err {
            FormDataError::UnknownField { step, field } => {
                assert_eq!(step, "basicInfo");
                assert_eq!(field, "fullname");
            }
            other => panic!("expected UnknownField, got {other:?}"),
        }
        assert_eq!(data, FormData::default());
    }

    #[test]
    fn typed_text_keeps_digits_in_string_fields() {
        let mut data = FormData::default();
        for (step, field, raw) in [
            (StepKey::BasicInfo, "phone", "9876543210"),
            (StepKey::Location, "pincode", "411001"),
            (StepKey::Payout, "accountNumber", "123456789012"),
        ] {
            let patch = data.field_patch(step, field, raw).unwrap();
            assert_eq!(patch[field], raw);
            data.merge_step(step, &patch).unwrap();
        }
        assert_eq!(data.basic_info.phone, "9876543210");
        assert_eq!(data.basic_info.whatsapp_number, "9876543210");
        assert_eq!(data.location.pincode, "411001");
        assert_eq!(data.payout.account_number, "123456789012");

        let years = data
            .field_patch(StepKey::Experience, "yearsOfExperience", "12")
            .unwrap();
        data.merge_step(StepKey::Experience, &years).unwrap();
        assert_eq!(data.experience.years_of_experience, 12);

        let toggle = data
            .field_patch(StepKey::ServiceDetails, "homePickup", "true")
            .unwrap();
        data.merge_step(StepKey::ServiceDetails, &toggle).unwrap();
        assert!(data.service_details.home_pickup);

        let method = data.field_patch(StepKey::Payout, "paymentMethod", "upi").unwrap();
        data.merge_step(StepKey::Payout, &method).unwrap();
        assert_eq!(data.payout.payment_method, PaymentMethod::Upi);

        assert!(matches!(
            data.field_patch(StepKey::Location, "zip", "411001"),
            Err(FormDataError::UnknownField { .. })
        ));
    }

    #[test]
    fn whatsapp_mirrors_phone_while_linked() {
        let mut data = FormData::default();
        data.merge_step(StepKey::BasicInfo, &json!({ "phone": "9876543210" }))
            .unwrap();
        assert_eq!(data.basic_info.whatsapp_number, "9876543210");

        data.merge_step(StepKey::BasicInfo, &json!({ "whatsappSameAsPhone": false }))
            .unwrap();
        assert!(data.basic_info.whatsapp_number.is_empty());

        data.merge_step(StepKey::BasicInfo, &json!({ "whatsappNumber": "9123456780" }))
            .unwrap();
        assert_eq!(data.basic_info.whatsapp_number, "9123456780");
    }

    #[test]
    fn specialties_toggle_and_custom() {
        let mut s = Specialties::default();
        s.toggle("Blouse");
        s.toggle("Lehenga");
        s.toggle("Blouse");
        assert_eq!(s.specialties, vec!["Lehenga".to_string()]);

        assert!(!s.toggle(""));
        assert!(!s.toggle("   "));
        assert_eq!(s.specialties, vec!["Lehenga".to_string()]);

        assert!(s.add_custom("  Sherwani "));
        assert!(!s.add_custom("Sherwani"));
        assert!(!s.add_custom("   "));
        assert_eq!(s.specialties.len(), 2);
        assert!(s.remove("Sherwani"));
        assert!(!s.remove("Sherwani"));
    }

    #[test]
    fn portfolio_removes_by_value() {
        let a = UploadedAsset {
            url: "https://example.test/a.jpg".to_string(),
            name: "a.jpg".to_string(),
        };
        let b = UploadedAsset {
            url: "https://example.test/b.jpg".to_string(),
            name: "b.jpg".to_string(),
        };
        let mut p = Portfolio {
            portfolio_images: vec![a.clone(), b.clone()],
        };
        assert!(p.remove_image(&a));
        assert_eq!(p.portfolio_images, vec![b]);
        assert!(!p.remove_image(&a));
    }

    #[test]
    fn step_value_uses_camel_case() {
        let data = FormData::default();
        let v = data.step_value(StepKey::ServiceDetails);
        assert_eq!(v["turnaroundTime"], 7);
        assert_eq!(v["homePickup"], false);
    }

    #[test]
    fn partial_persisted_form_fills_defaults() {
        let data: FormData =
            serde_json::from_value(json!({ "location": { "city": "Pune" } })).unwrap();
        assert_eq!(data.location.city, "Pune");
        assert_eq!(data.service_details.price_min, 100);
    }
}
