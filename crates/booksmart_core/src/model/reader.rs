//! Library reader (account holder).

use uuid::Uuid;

pub type ReaderId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reader {
    pub id: ReaderId,
    pub full_name: String,
    /// Login identifier; unique per reader by convention of the callers.
    pub phone_number: String,
    pub age: u32,
    /// Credential as handed over by the caller (already hashed upstream).
    pub password: String,
    pub role: String,
}

impl Reader {
    pub fn new(full_name: impl Into<String>, phone_number: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            full_name: full_name.into(),
            phone_number: phone_number.into(),
            age: 0,
            password: String::new(),
            role: String::new(),
        }
    }
}
