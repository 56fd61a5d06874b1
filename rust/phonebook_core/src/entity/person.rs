use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{date_field, int_field, text_field, Entity, FieldDescriptor};
use crate::types::{EntityKind, Uid};

/// Directory entry for one person. Field names on the wire match the names
/// used in role permission tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Person {
    #[serde(rename = "UID")]
    pub uid: Uid,
    pub status: i64,
    pub eligible_for_rehire: i64,
    pub salutation: String,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub preferred_name: String,
    pub primary_email: String,
    pub secondary_email: String,
    pub office_phone: String,
    pub office_fax: String,
    pub cell_phone: String,
    pub emergency_contact_name: String,
    pub emergency_contact_phone: String,
    pub home_street_address: String,
    pub home_street_address2: String,
    pub home_city: String,
    pub home_state: String,
    pub home_postal_code: String,
    pub home_country: String,
    pub birth_month: i64,
    #[serde(rename = "BirthDOM")]
    pub birth_dom: i64,
    pub co_code: i64,
    pub job_code: i64,
    pub class_code: i64,
    pub dept_code: i64,
    pub position_control_number: String,
    #[serde(rename = "MgrUID")]
    pub mgr_uid: Uid,
    #[serde(rename = "Accepted401K")]
    pub accepted_401k: i64,
    pub accepted_dental_insurance: i64,
    pub accepted_health_insurance: i64,
    pub hire: Option<NaiveDate>,
    pub termination: Option<NaiveDate>,
    pub last_review: Option<NaiveDate>,
    pub next_review: Option<NaiveDate>,
    pub state_of_employment: String,
    pub country_of_employment: String,
    #[serde(rename = "RID")]
    pub rid: i64,
}

impl Person {
    /// Name shown in headers and session banners.
    pub fn display_name(&self) -> &str {
        if self.preferred_name.is_empty() {
            &self.first_name
        } else {
            &self.preferred_name
        }
    }
}

static PERSON_FIELDS: &[FieldDescriptor<Person>] = &[
    int_field!("UID", uid, false, "Unique identifier; never changes once created."),
    int_field!("Status", status, false, "Whether the person is an active employee."),
    int_field!("EligibleForRehire", eligible_for_rehire, false, "Whether a past employee can be rehired."),
    text_field!("Salutation", salutation, false, "'Mr.', 'Mrs.', 'Ms.', etc."),
    text_field!("FirstName", first_name, false, "The person's common name."),
    text_field!("MiddleName", middle_name, false, "The person's middle name."),
    text_field!("LastName", last_name, false, "The person's surname."),
    text_field!("PreferredName", preferred_name, false, "Less formal name in common use."),
    text_field!("PrimaryEmail", primary_email, false, "Primary email address."),
    text_field!("SecondaryEmail", secondary_email, true, "Secondary email address."),
    text_field!("OfficePhone", office_phone, false, "Office telephone number."),
    text_field!("OfficeFax", office_fax, true, "Office fax number."),
    text_field!("CellPhone", cell_phone, false, "Cellphone number."),
    text_field!("EmergencyContactName", emergency_contact_name, true, "Who to contact in an emergency."),
    text_field!("EmergencyContactPhone", emergency_contact_phone, true, "Phone number for the emergency contact."),
    text_field!("HomeStreetAddress", home_street_address, true, "Home street address."),
    text_field!("HomeStreetAddress2", home_street_address2, true, "Home street address, second line."),
    text_field!("HomeCity", home_city, true, "Home city."),
    text_field!("HomeState", home_state, true, "Home state or province."),
    text_field!("HomePostalCode", home_postal_code, true, "Home postal code."),
    text_field!("HomeCountry", home_country, true, "Home country."),
    int_field!("BirthMonth", birth_month, true, "Birth month, 1-12."),
    int_field!("BirthDOM", birth_dom, true, "Birth day of month."),
    int_field!("CoCode", co_code, true, "Company code of the employer."),
    int_field!("JobCode", job_code, true, "Job title code."),
    int_field!("ClassCode", class_code, true, "Class code."),
    int_field!("DeptCode", dept_code, true, "Department code."),
    text_field!("PositionControlNumber", position_control_number, true, "Position control number."),
    int_field!("MgrUID", mgr_uid, true, "UID of this person's manager."),
    int_field!("Accepted401K", accepted_401k, true, "401K acceptance code."),
    int_field!("AcceptedDentalInsurance", accepted_dental_insurance, true, "Dental insurance acceptance code."),
    int_field!("AcceptedHealthInsurance", accepted_health_insurance, true, "Health insurance acceptance code."),
    date_field!("Hire", hire, true, "Hire date."),
    date_field!("Termination", termination, true, "Termination date."),
    date_field!("LastReview", last_review, true, "Date of the last review."),
    date_field!("NextReview", next_review, true, "Date of the next review."),
    text_field!("StateOfEmployment", state_of_employment, false, "State of employment."),
    text_field!("CountryOfEmployment", country_of_employment, false, "Country of employment."),
    int_field!("RID", rid, true, "Security role assigned to this person."),
];

impl Entity for Person {
    const KIND: EntityKind = EntityKind::Person;
    const KEY_FIELD: &'static str = "UID";

    fn fields() -> &'static [FieldDescriptor<Self>] {
        PERSON_FIELDS
    }

    fn key(&self) -> i64 {
        self.uid
    }

    fn set_key(&mut self, key: i64) {
        self.uid = key;
    }

    fn owner(&self) -> Option<Uid> {
        (self.uid > 0).then_some(self.uid)
    }
}
