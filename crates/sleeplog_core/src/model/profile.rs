//! User profile, profile patch and application-state snapshot.
//!
//! # Responsibility
//! - Define the profile shape shared by the current-user slot and the
//!   all-users collection.
//! - Provide last-write-wins merge of a `ProfilePatch`.
//!
//! # Invariants
//! - Identity is `id` when present, otherwise `email`.
//! - Unknown JSON fields survive a load/store round-trip through `extra`.
//! - A patch never changes `id` or `updatedAt` directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::model::sleep_record::SleepStats;

/// JSON names of fields owned by `UserProfile` itself.
///
/// Pass-through keys with these names are dropped during a merge so the
/// flattened `extra` map never shadows a typed field.
pub const PROFILE_FIELD_NAMES: &[&str] = &[
    "id",
    "email",
    "displayName",
    "avatarToken",
    "averageScore",
    "averageSleepHours",
    "totalDays",
    "updatedAt",
];

/// Profile record stored under `user` and inside `users`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Stable identity. Older clients wrote numeric ids, so numbers are
    /// accepted and kept in string form.
    #[serde(
        default,
        deserialize_with = "identity_from_json",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Short avatar marker, usually one emoji.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_sleep_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Fields this build does not know about.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    /// Returns the key the all-users collection is indexed by.
    pub fn identity_key(&self) -> Option<&str> {
        self.id.as_deref().or(self.email.as_deref())
    }

    /// Whether `other` describes the same person.
    ///
    /// Ids are compared when both sides carry one; otherwise emails are
    /// compared when both sides carry one. Anything else is not a match.
    pub fn same_identity(&self, other: &UserProfile) -> bool {
        match (self.id.as_deref(), other.id.as_deref()) {
            (Some(left), Some(right)) => left == right,
            _ => match (self.email.as_deref(), other.email.as_deref()) {
                (Some(left), Some(right)) => left == right,
                _ => false,
            },
        }
    }

    /// Reads only the identity fields of a stored profile entry.
    ///
    /// Works on entries whose other fields no longer parse, so a damaged
    /// entry can still be matched and replaced.
    pub fn identity_of(entry: &Value) -> Option<UserProfile> {
        let object = entry.as_object()?;
        let id = match object.get("id") {
            Some(Value::String(value)) => Some(value.clone()),
            Some(Value::Number(value)) => Some(value.to_string()),
            _ => None,
        };
        let email = object
            .get("email")
            .and_then(Value::as_str)
            .map(str::to_string);
        Some(UserProfile {
            id,
            email,
            ..UserProfile::default()
        })
    }

    /// Merges `patch` over this profile and stamps `updated_at`.
    ///
    /// Unspecified patch fields keep their current value.
    pub fn merged_with(&self, patch: &ProfilePatch, now: DateTime<Utc>) -> UserProfile {
        let mut merged = self.clone();
        if let Some(email) = &patch.email {
            merged.email = Some(email.clone());
        }
        if let Some(display_name) = &patch.display_name {
            merged.display_name = Some(display_name.clone());
        }
        if let Some(avatar_token) = &patch.avatar_token {
            merged.avatar_token = Some(avatar_token.clone());
        }
        if let Some(average_score) = patch.average_score {
            merged.average_score = Some(average_score);
        }
        if let Some(average_sleep_hours) = patch.average_sleep_hours {
            merged.average_sleep_hours = Some(average_sleep_hours);
        }
        if let Some(total_days) = patch.total_days {
            merged.total_days = Some(total_days);
        }
        for (key, value) in &patch.extra {
            if is_profile_field(key) {
                continue;
            }
            merged.extra.insert(key.clone(), value.clone());
        }
        merged.updated_at = Some(now);
        merged
    }
}

/// Partial profile update.
///
/// Known fields are typed; anything else rides along in `extra` and is merged
/// verbatim.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_sleep_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_days: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProfilePatch {
    pub fn display_name(value: impl Into<String>) -> Self {
        Self {
            display_name: Some(value.into()),
            ..Self::default()
        }
    }

    /// Patch that writes derived sleep stats onto the profile.
    pub fn from_stats(stats: &SleepStats) -> Self {
        Self {
            average_sleep_hours: Some(stats.average_sleep_hours),
            total_days: Some(stats.total_days),
            ..Self::default()
        }
    }

    /// Pass-through keys that collide with typed profile fields.
    ///
    /// These are ignored by `UserProfile::merged_with`.
    pub fn reserved_extra_keys(&self) -> Vec<&str> {
        self.extra
            .keys()
            .map(String::as_str)
            .filter(|key| is_profile_field(key))
            .collect()
    }
}

/// In-memory application state handed over by the UI layer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AppStateSnapshot {
    #[serde(default)]
    pub auth: AuthState,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AuthState {
    #[serde(default)]
    pub user: Option<UserProfile>,
}

impl AppStateSnapshot {
    pub fn with_user(user: UserProfile) -> Self {
        Self {
            auth: AuthState { user: Some(user) },
        }
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.auth.user.as_ref()
    }
}

fn is_profile_field(key: &str) -> bool {
    PROFILE_FIELD_NAMES.contains(&key)
}

fn identity_from_json<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(value) => Ok(Some(value)),
        Value::Number(value) => Ok(Some(value.to_string())),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number for profile id, got {other}"
        ))),
    }
}
