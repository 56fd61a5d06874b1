use serde::{Deserialize, Serialize};

use super::{int_field, text_field, Entity, FieldDescriptor};
use crate::types::EntityKind;

/// Cost class (business unit) people are assigned to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Class {
    pub class_code: i64,
    pub name: String,
    pub designation: String,
    pub description: String,
}

static CLASS_FIELDS: &[FieldDescriptor<Class>] = &[
    int_field!("ClassCode", class_code, true, "Class code."),
    text_field!("Name", name, true, "Class name."),
    text_field!("Designation", designation, true, "Short designation code."),
    text_field!("Description", description, true, "Free-form description."),
];

impl Entity for Class {
    const KIND: EntityKind = EntityKind::Class;
    const KEY_FIELD: &'static str = "ClassCode";

    fn fields() -> &'static [FieldDescriptor<Self>] {
        CLASS_FIELDS
    }

    fn key(&self) -> i64 {
        self.class_code
    }

    fn set_key(&mut self, key: i64) {
        self.class_code = key;
    }
}
