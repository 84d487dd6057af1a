//! Core record types for tagmykid.
//!
//! These structs double as the persisted and transported shapes: field names
//! serialize in camelCase so stored account documents and the JSON inside
//! printed tag payloads stay readable by every version of the app.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// School label shown for accounts created before the school field existed.
pub const NO_SCHOOL_SELECTED: &str = "No school selected";

/// School label used when neither a tag nor its owner records a school.
pub const SCHOOL_NOT_SPECIFIED: &str = "School not specified";

/// A registered parent or guardian, keyed by phone number in the store.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Credential, compared verbatim.
    #[serde(rename = "password")]
    pub secret: String,
    /// Given name.
    pub name: String,
    /// Family name.
    pub surname: String,
    /// School, absent on accounts that predate the field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,
    /// Owned tags in creation order.
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Account {
    /// Create an account with no tags.
    #[must_use]
    pub fn new(
        secret: impl Into<String>,
        name: impl Into<String>,
        surname: impl Into<String>,
        school: impl Into<String>,
    ) -> Self {
        Self {
            secret: secret.into(),
            name: name.into(),
            surname: surname.into(),
            school: Some(school.into()),
            tags: Vec::new(),
        }
    }

    /// The account's school, if one was recorded and is non-empty.
    #[must_use]
    pub fn school(&self) -> Option<&str> {
        self.school.as_deref().filter(|s| !s.is_empty())
    }

    /// Find an owned tag by code, ignoring case.
    #[must_use]
    pub fn find_tag(&self, code: &str) -> Option<&Tag> {
        self.tags.iter().find(|tag| tag.code.eq_ignore_ascii_case(code))
    }
}

// The credential never reaches logs.
impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("secret", &"<redacted>")
            .field("name", &self.name)
            .field("surname", &self.surname)
            .field("school", &self.school)
            .field("tags", &self.tags)
            .finish()
    }
}

/// A child's lost-and-found tag.
///
/// Field order matches the payload JSON emitted by earlier releases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    /// Child's full name.
    pub name: String,
    /// Grade, 0 to 12.
    pub grade: String,
    /// Single uppercase class letter.
    pub class_name: String,
    /// Parent contact number as entered.
    pub parent_phone: String,
    /// School copied from the owning account. Empty on legacy tags.
    #[serde(default)]
    pub school: String,
    /// Six-character uppercase code.
    #[serde(rename = "tagId")]
    pub code: String,
}

impl Tag {
    /// Whether this tag carries its own school.
    #[must_use]
    pub fn has_school(&self) -> bool {
        !self.school.is_empty()
    }
}

/// The public profile of the signed-in account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Account key.
    pub phone: String,
    /// Given name.
    pub name: String,
    /// Family name.
    pub surname: String,
    /// School, or [`NO_SCHOOL_SELECTED`] for legacy accounts.
    pub school: String,
    /// When the session was established.
    #[serde(default = "Utc::now")]
    pub established_at: DateTime<Utc>,
}

impl Session {
    /// Materialize a session from an account's public fields.
    #[must_use]
    pub fn for_account(phone: impl Into<String>, account: &Account) -> Self {
        Self {
            phone: phone.into(),
            name: account.name.clone(),
            surname: account.surname.clone(),
            school: account.school().unwrap_or(NO_SCHOOL_SELECTED).to_string(),
            established_at: Utc::now(),
        }
    }
}

/// What a finder learns about a tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinderView {
    /// Child's full name.
    pub name: String,
    /// Grade.
    pub grade: String,
    /// Class letter.
    pub class_name: String,
    /// Parent contact number. Carried for the messaging link only.
    pub parent_phone: String,
    /// Resolved school.
    pub school: String,
    /// Tag code.
    #[serde(rename = "tagId")]
    pub code: String,
}

impl FinderView {
    /// The tag this view was projected from, with the school resolved.
    #[must_use]
    pub fn to_tag(&self) -> Tag {
        Tag {
            name: self.name.clone(),
            grade: self.grade.clone(),
            class_name: self.class_name.clone(),
            parent_phone: self.parent_phone.clone(),
            school: self.school.clone(),
            code: self.code.clone(),
        }
    }
}

impl From<Tag> for FinderView {
    fn from(tag: Tag) -> Self {
        Self {
            name: tag.name,
            grade: tag.grade,
            class_name: tag.class_name,
            parent_phone: tag.parent_phone,
            school: tag.school,
            code: tag.code,
        }
    }
}

/// Raw input for a new tag, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagDraft {
    /// Child's full name.
    pub name: String,
    /// Grade as typed.
    pub grade: String,
    /// Class letter as typed.
    pub class_name: String,
    /// Parent contact number as typed.
    pub parent_phone: String,
}

impl TagDraft {
    /// Build a draft from its four fields.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        grade: impl Into<String>,
        class_name: impl Into<String>,
        parent_phone: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            grade: grade.into(),
            class_name: class_name.into(),
            parent_phone: parent_phone.into(),
        }
    }
}

/// Raw input for a new account.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SignupRequest {
    /// Phone number, becomes the account key.
    pub phone: String,
    /// Credential.
    pub secret: String,
    /// Given name.
    pub name: String,
    /// Family name.
    pub surname: String,
    /// School name.
    pub school: String,
}

impl fmt::Debug for SignupRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupRequest")
            .field("phone", &self.phone)
            .field("secret", &"<redacted>")
            .field("name", &self.name)
            .field("surname", &self.surname)
            .field("school", &self.school)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tag() -> Tag {
        Tag {
            name: "Thandi Dlamini".to_string(),
            grade: "5".to_string(),
            class_name: "B".to_string(),
            parent_phone: "0827654321".to_string(),
            school: "Greenside High School".to_string(),
            code: "Q7X2PL".to_string(),
        }
    }

    #[test]
    fn test_tag_serializes_legacy_field_names() {
        let json = serde_json::to_string(&sample_tag()).unwrap();
        assert_eq!(
            json,
            r#"{"name":"Thandi Dlamini","grade":"5","className":"B","parentPhone":"0827654321","school":"Greenside High School","tagId":"Q7X2PL"}"#
        );
    }

    #[test]
    fn test_tag_without_school_deserializes() {
        let json = r#"{"tagId":"Q7X2PL","name":"Thandi","grade":"5","className":"B","parentPhone":"0827654321"}"#;
        let tag: Tag = serde_json::from_str(json).unwrap();
        assert!(!tag.has_school());
        assert_eq!(tag.code, "Q7X2PL");
    }

    #[test]
    fn test_legacy_account_deserializes() {
        let json = r#"{"password":"abc123","name":"Jane","surname":"Doe"}"#;
        let account: Account = serde_json::from_str(json).unwrap();
        assert!(account.school().is_none());
        assert!(account.tags.is_empty());
    }

    #[test]
    fn test_account_serializes_password_key() {
        let account = Account::new("abc123", "Jane", "Doe", "Greenside High School");
        let json = serde_json::to_value(&account).unwrap();
        assert_eq!(json["password"], "abc123");
        assert_eq!(json["tags"], serde_json::json!([]));
    }

    #[test]
    fn test_account_debug_redacts_secret() {
        let account = Account::new("abc123", "Jane", "Doe", "Greenside High School");
        let debug_str = format!("{account:?}");
        assert!(!debug_str.contains("abc123"));
        assert!(debug_str.contains("<redacted>"));
    }

    #[test]
    fn test_signup_request_debug_redacts_secret() {
        let request = SignupRequest {
            phone: "0821234567".to_string(),
            secret: "hunter22".to_string(),
            ..SignupRequest::default()
        };
        assert!(!format!("{request:?}").contains("hunter22"));
    }

    #[test]
    fn test_account_find_tag_ignores_case() {
        let mut account = Account::new("abc123", "Jane", "Doe", "Greenside High School");
        account.tags.push(sample_tag());
        assert!(account.find_tag("q7x2pl").is_some());
        assert!(account.find_tag("Q7X2PM").is_none());
    }

    #[test]
    fn test_empty_school_counts_as_missing() {
        let mut account = Account::new("abc123", "Jane", "Doe", "");
        assert!(account.school().is_none());
        account.school = None;
        assert!(account.school().is_none());
    }

    #[test]
    fn test_session_for_legacy_account() {
        let mut account = Account::new("abc123", "Jane", "Doe", "x");
        account.school = None;
        let session = Session::for_account("0821234567", &account);
        assert_eq!(session.school, NO_SCHOOL_SELECTED);
        assert_eq!(session.phone, "0821234567");
    }

    #[test]
    fn test_session_never_serializes_secret() {
        let account = Account::new("abc123", "Jane", "Doe", "Greenside High School");
        let session = Session::for_account("0821234567", &account);
        let json = serde_json::to_string(&session).unwrap();
        assert!(!json.contains("abc123"));
    }

    #[test]
    fn test_finder_view_round_trips_through_tag() {
        let tag = sample_tag();
        let view = FinderView::from(tag.clone());
        assert_eq!(view.to_tag(), tag);
    }
}
