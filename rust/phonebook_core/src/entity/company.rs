use serde::{Deserialize, Serialize};

use super::{int_field, text_field, Entity, FieldDescriptor};
use crate::types::EntityKind;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Company {
    pub co_code: i64,
    pub legal_name: String,
    pub common_name: String,
    pub address: String,
    pub address2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub phone: String,
    pub fax: String,
    pub email: String,
    pub designation: String,
    pub active: i64,
    pub employs_personnel: i64,
}

impl Company {
    /// Defaults for a company that is being added: active, no personnel
    /// yet, based in the USA.
    pub fn blank() -> Self {
        Self {
            active: 1,
            employs_personnel: 0,
            country: "USA".to_string(),
            ..Default::default()
        }
    }
}

static COMPANY_FIELDS: &[FieldDescriptor<Company>] = &[
    int_field!("CoCode", co_code, true, "Company code."),
    text_field!("LegalName", legal_name, true, "Registered legal name."),
    text_field!("CommonName", common_name, true, "Name in everyday use."),
    text_field!("Address", address, true, "Street address."),
    text_field!("Address2", address2, true, "Street address, second line."),
    text_field!("City", city, true, "City."),
    text_field!("State", state, true, "State or province."),
    text_field!("PostalCode", postal_code, true, "Postal code."),
    text_field!("Country", country, true, "Country."),
    text_field!("Phone", phone, true, "Main telephone number."),
    text_field!("Fax", fax, true, "Fax number."),
    text_field!("Email", email, true, "Contact email."),
    text_field!("Designation", designation, true, "Short designation code."),
    int_field!("Active", active, true, "Whether the company is active."),
    int_field!("EmploysPersonnel", employs_personnel, true, "Whether the company employs people."),
];

impl Entity for Company {
    const KIND: EntityKind = EntityKind::Company;
    const KEY_FIELD: &'static str = "CoCode";

    fn fields() -> &'static [FieldDescriptor<Self>] {
        COMPANY_FIELDS
    }

    fn key(&self) -> i64 {
        self.co_code
    }

    fn set_key(&mut self, key: i64) {
        self.co_code = key;
    }
}
