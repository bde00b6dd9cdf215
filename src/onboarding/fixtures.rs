//! Shared form fixtures for unit tests.

use super::model::{
    BasicInfo, FormData, IdType, Identity, Location, PaymentMethod, Payout, UploadedAsset,
};

pub(crate) fn asset(name: &str) -> UploadedAsset {
    UploadedAsset {
        url: format!("https://mock.test/{name}"),
        name: name.to_string(),
    }
}

/// A form that passes every step.
pub(crate) fn complete_form() -> FormData {
    let mut data = FormData::default();
    data.basic_info = BasicInfo {
        full_name: "Asha Verma".to_string(),
        shop_name: "Asha Tailors".to_string(),
        phone: "9876543210".to_string(),
        email: "asha@example.com".to_string(),
        whatsapp_same_as_phone: true,
        whatsapp_number: "9876543210".to_string(),
    };
    data.location = Location {
        address1: "123 Long Enough Street Name".to_string(),
        address2: String::new(),
        city: "Pune".to_string(),
        pincode: "411001".to_string(),
    };
    data.specialties.specialties = vec!["Blouse".to_string()];
    data.portfolio.portfolio_images = vec![asset("1.jpg"), asset("2.jpg"), asset("3.jpg")];
    data.identity = Identity {
        id_type: IdType::Voter,
        id_front: Some(asset("front.jpg")),
        id_back: Some(asset("back.jpg")),
    };
    data.payout = Payout {
        payment_method: PaymentMethod::Upi,
        upi_id: "asha.tailor@okbank".to_string(),
        ..Default::default()
    };
    data.review.accept_terms = true;
    data
}
