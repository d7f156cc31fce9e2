//! Test factories for generating test data
//!
//! Names and addresses come from `fake`; phone numbers are drawn from a
//! counter so two payloads never collide on the unique phone column.

use std::sync::atomic::{AtomicU64, Ordering};

use fake::faker::address::en::{CityName, StreetName};
use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;
use serde_json::{json, Value};

use hr_onboarding::models::CreateEmployeeRequest;

use super::fixtures::{DEPARTMENT_CODE, EMPLOYEE_TYPE_CODE, JOB_TITLE};

static PHONE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A phone number no other factory call has returned
pub fn unique_phone_number() -> String {
    let n = PHONE_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("+2557{:08}", n)
}

/// Builder for `POST /employees` payloads
#[derive(Debug, Clone)]
pub struct EmployeePayload {
    body: Value,
}

impl EmployeePayload {
    pub fn new(email: &str) -> Self {
        let first_name: String = FirstName().fake();
        let middle_name: String = FirstName().fake();
        let last_name: String = LastName().fake();
        let street: String = StreetName().fake();
        let city: String = CityName().fake();

        Self {
            body: json!({
                "user": { "email": email },
                "first_name": first_name,
                "middle_name": middle_name,
                "last_name": last_name,
                "gender": "Female",
                "date_of_birth": "1990-05-17",
                "marital_status": "Single",
                "religion": "Others",
                "nationality": "TZ",
                "phone_number": unique_phone_number(),
                "address": format!("{}, {}", street, city),
                "job": JOB_TITLE,
                "department": DEPARTMENT_CODE,
                "employee_type": EMPLOYEE_TYPE_CODE,
                "employment_date": "2024-03-01",
                "send_invite": true,
            }),
        }
    }

    pub fn send_invite(self, send: bool) -> Self {
        self.with("send_invite", json!(send))
    }

    /// Override any top-level field
    pub fn with(mut self, field: &str, value: Value) -> Self {
        self.body[field] = value;
        self
    }

    /// Drop a field, e.g. to exercise its default
    pub fn without(mut self, field: &str) -> Self {
        if let Some(object) = self.body.as_object_mut() {
            object.remove(field);
        }
        self
    }

    pub fn json(&self) -> Value {
        self.body.clone()
    }

    pub fn into_request(self) -> CreateEmployeeRequest {
        serde_json::from_value(self.body).expect("factory payload deserializes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_numbers_are_unique() {
        let a = unique_phone_number();
        let b = unique_phone_number();
        assert_ne!(a, b);
        assert!(a.starts_with("+2557"));
    }

    #[test]
    fn test_payload_overrides() {
        let payload = EmployeePayload::new("x@example.com")
            .send_invite(false)
            .with("gender", json!("Male"))
            .without("employment_date");
        let json = payload.json();
        assert_eq!(json["send_invite"], false);
        assert_eq!(json["gender"], "Male");
        assert!(json.get("employment_date").is_none());

        let request = payload.into_request();
        assert!(!request.send_invite);
        assert!(request.employment_date.is_none());
    }
}
