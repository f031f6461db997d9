use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Education {
    pub university: String,
    pub graduation_year: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Work {
    pub company: String,
    pub responsibilities: String,
}

/// A roster member as returned by the users API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct User {
    // The create endpoint echoes the id back as a string
    #[serde(deserialize_with = "flexible_id::deserialize")]
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "flexible_date")]
    #[cfg_attr(feature = "ts", ts(type = "string | null"))]
    pub birth_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education: Option<Education>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work: Option<Work>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// "Last First", the label used by the user picker
    pub fn display_name(&self) -> String {
        format!("{} {}", self.last_name, self.first_name)
    }

    /// Take whatever `other` actually carries: non-empty strings and present
    /// optionals. Used to lay a partial server echo over a known record.
    pub fn overlay(&mut self, other: &User) {
        for (dst, src) in [
            (&mut self.first_name, &other.first_name),
            (&mut self.last_name, &other.last_name),
            (&mut self.email, &other.email),
        ] {
            if !src.is_empty() {
                *dst = src.clone();
            }
        }
        if other.avatar.is_some() {
            self.avatar = other.avatar.clone();
        }
        if other.birth_date.is_some() {
            self.birth_date = other.birth_date;
        }
        if other.education.is_some() {
            self.education = other.education.clone();
        }
        if other.work.is_some() {
            self.work = other.work.clone();
        }
    }

    /// Apply a partial update locally, leaving absent fields untouched.
    pub fn apply(&mut self, changes: &UserChanges) {
        if let Some(ref v) = changes.first_name {
            self.first_name = v.clone();
        }
        if let Some(ref v) = changes.last_name {
            self.last_name = v.clone();
        }
        if let Some(ref v) = changes.email {
            self.email = v.clone();
        }
        if let Some(ref v) = changes.avatar {
            self.avatar = Some(v.clone());
        }
        if let Some(v) = changes.birth_date {
            self.birth_date = Some(v);
        }
        if let Some(ref v) = changes.education {
            self.education = Some(v.clone());
        }
        if let Some(ref v) = changes.work {
            self.work = Some(v.clone());
        }
    }
}

/// Payload for creating a user; the server assigns the id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "flexible_date")]
    #[cfg_attr(feature = "ts", ts(type = "string | null"))]
    pub birth_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education: Option<Education>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work: Option<Work>,
}

/// Partial update payload. Absent fields are left out of the request body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct UserChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "flexible_date")]
    #[cfg_attr(feature = "ts", ts(type = "string | null"))]
    pub birth_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education: Option<Education>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work: Option<Work>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Parse a date typed by a user or sent by a browser date picker.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    flexible_date::parse(s)
}

/// Wire form of an update: the changed fields plus the target id.
#[derive(Debug, Serialize)]
pub(crate) struct UserPatch<'a> {
    #[serde(flatten)]
    pub changes: &'a UserChanges,
    pub id: i64,
}

mod flexible_id {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        match RawId::deserialize(deserializer)? {
            RawId::Number(n) => Ok(n),
            RawId::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| serde::de::Error::custom(format!("invalid user id: {:?}", s))),
        }
    }
}

/// Dates arrive either as `YYYY-MM-DD` or as a full RFC 3339 timestamp
/// (what a browser date picker serializes). Always written as `YYYY-MM-DD`.
mod flexible_date {
    use super::*;
    use serde::Serializer;

    const FORMAT: &str = "%Y-%m-%d";

    pub fn parse(s: &str) -> Option<NaiveDate> {
        let s = s.trim();
        NaiveDate::parse_from_str(s, FORMAT)
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
    }

    pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(d) => serializer.serialize_str(&d.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => parse(s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid date: {:?}", s))),
        }
    }
}
