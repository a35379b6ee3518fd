//! Account profile: personal details shown on the account summary page
//!
//! Dates of birth are typed and displayed as `dd/mm/yyyy` but travel to the
//! service as `YYYY-MM-DD`.

use chrono::NaiveDate;
use finance_core::records::parse_record_date;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const DOB_INPUT_FORMAT: &str = "%d/%m/%Y";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub dob: Option<NaiveDate>,
    pub address: String,
    pub office_name: String,
    pub profile_pic: Option<String>,
}

/// Every field may be absent, null, or a number where text is expected
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProfile {
    name: Option<Value>,
    email: Option<Value>,
    phone: Option<Value>,
    dob: Option<Value>,
    address: Option<Value>,
    office_name: Option<Value>,
    profile_pic: Option<Value>,
}

fn text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl Profile {
    /// Normalize an account summary or profile response
    pub fn from_value(value: Value) -> Self {
        let raw: RawProfile = serde_json::from_value(value).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "unexpected profile response");
            RawProfile::default()
        });

        Self {
            name: text(raw.name).unwrap_or_default(),
            email: text(raw.email).unwrap_or_default(),
            phone: text(raw.phone).unwrap_or_default(),
            dob: text(raw.dob).as_deref().and_then(parse_record_date),
            address: text(raw.address).unwrap_or_default(),
            office_name: text(raw.office_name).unwrap_or_default(),
            profile_pic: text(raw.profile_pic),
        }
    }

    pub fn dob_display(&self) -> String {
        self.dob
            .map(|d| d.format(DOB_INPUT_FORMAT).to_string())
            .unwrap_or_default()
    }
}

/// Body of a profile update; the email cannot be changed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: String,
    pub phone: String,
    /// `YYYY-MM-DD`, empty when unset
    pub dob: String,
    pub address: String,
    pub office_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    #[error("nothing to update")]
    EmptyUpdate,

    #[error("name is required")]
    MissingName,

    #[error("date of birth '{0}' is not a valid dd/mm/yyyy date")]
    InvalidBirthDate(String),
}

/// Requested changes; `None` keeps the current value
#[derive(Debug, Clone, Default)]
pub struct ProfileDraft {
    pub name: Option<String>,
    pub phone: Option<String>,
    /// `dd/mm/yyyy`; empty clears it
    pub dob: Option<String>,
    pub address: Option<String>,
    pub office_name: Option<String>,
    /// Empty means keep the current password
    pub new_password: Option<String>,
}

impl ProfileDraft {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.phone.is_none()
            && self.dob.is_none()
            && self.address.is_none()
            && self.office_name.is_none()
            && self.new_password.is_none()
    }

    /// Merge the changes into the current profile and build the update body
    pub fn apply(&self, current: &Profile) -> Result<ProfileUpdate, ProfileError> {
        if self.is_empty() {
            return Err(ProfileError::EmptyUpdate);
        }

        let pick = |change: &Option<String>, existing: &str| {
            change.as_deref().map(str::trim).unwrap_or(existing).to_string()
        };

        let name = pick(&self.name, &current.name);
        if name.is_empty() {
            return Err(ProfileError::MissingName);
        }

        let dob = match self.dob.as_deref().map(str::trim) {
            None => current.dob,
            Some("") => None,
            Some(raw) => Some(
                NaiveDate::parse_from_str(raw, DOB_INPUT_FORMAT)
                    .map_err(|_| ProfileError::InvalidBirthDate(raw.to_string()))?,
            ),
        };

        Ok(ProfileUpdate {
            name,
            phone: pick(&self.phone, &current.phone),
            dob: dob.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
            address: pick(&self.address, &current.address),
            office_name: pick(&self.office_name, &current.office_name),
            new_password: self.new_password.clone().filter(|p| !p.is_empty()),
        })
    }
}
