use crate::error::{OciLogsError, Result};
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::fmt;

/// Number of indexed profile slots (`_0` through `_5`) a settings blob can carry.
pub const MAX_PROFILE_SLOTS: usize = 6;

/// One credential profile for a tenancy.
#[derive(Clone, PartialEq, Eq)]
pub struct TenancyProfile {
    pub profile_key: String,
    pub tenancy_ocid: String,
    pub user_ocid: String,
    pub region: String,
    pub fingerprint: String,
    pub private_key_pem: String,
    pub private_key_passphrase: Option<String>,
}

impl fmt::Debug for TenancyProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenancyProfile")
            .field("profile_key", &self.profile_key)
            .field("tenancy_ocid", &self.tenancy_ocid)
            .field("user_ocid", &self.user_ocid)
            .field("region", &self.region)
            .field("fingerprint", &self.fingerprint)
            .field("private_key_pem", &"<redacted>")
            .field(
                "private_key_passphrase",
                &self.private_key_passphrase.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Field families that make up a profile slot. Each appears in the settings
/// blob as `<name>_<index>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileField {
    Profile,
    Tenancy,
    Region,
    User,
    Fingerprint,
    PrivateKey,
    Passphrase,
}

impl ProfileField {
    pub const ALL: [ProfileField; 7] = [
        ProfileField::Profile,
        ProfileField::Tenancy,
        ProfileField::Region,
        ProfileField::User,
        ProfileField::Fingerprint,
        ProfileField::PrivateKey,
        ProfileField::Passphrase,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ProfileField::Profile => "profile",
            ProfileField::Tenancy => "tenancy",
            ProfileField::Region => "region",
            ProfileField::User => "user",
            ProfileField::Fingerprint => "fingerprint",
            ProfileField::PrivateKey => "privkey",
            ProfileField::Passphrase => "privkeypass",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Settings key for this field at a slot index, e.g. `tenancy_2`.
    pub fn key(&self, index: usize) -> String {
        format!("{}_{}", self.name(), index)
    }
}

/// Raw contents of one indexed slot, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileSlot {
    pub index: usize,
    pub profile: String,
    pub tenancy: String,
    pub region: String,
    pub user: String,
    pub fingerprint: String,
    pub privkey: String,
    pub privkey_pass: String,
}

impl ProfileSlot {
    fn new(index: usize) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    fn set(&mut self, field: ProfileField, value: String) {
        let target = match field {
            ProfileField::Profile => &mut self.profile,
            ProfileField::Tenancy => &mut self.tenancy,
            ProfileField::Region => &mut self.region,
            ProfileField::User => &mut self.user,
            ProfileField::Fingerprint => &mut self.fingerprint,
            ProfileField::PrivateKey => &mut self.privkey,
            ProfileField::Passphrase => &mut self.privkey_pass,
        };
        *target = value;
    }

    fn into_profile(self) -> TenancyProfile {
        TenancyProfile {
            profile_key: self.profile,
            tenancy_ocid: self.tenancy,
            user_ocid: self.user,
            region: self.region,
            fingerprint: self.fingerprint,
            private_key_pem: self.privkey,
            private_key_passphrase: Some(self.privkey_pass).filter(|p| !p.is_empty()),
        }
    }
}

/// Split a settings key into a profile field and a slot index.
///
/// Returns `Ok(None)` for keys outside the profile field families.
fn split_field_key(key: &str) -> Result<Option<(ProfileField, usize)>> {
    let Some((name, suffix)) = key.rsplit_once('_') else {
        if ProfileField::from_name(key).is_some() {
            return Err(OciLogsError::Config(format!(
                "Malformed profile field name '{}': expected <name>_<index>",
                key
            )));
        }
        return Ok(None);
    };

    let Some(field) = ProfileField::from_name(name) else {
        return Ok(None);
    };

    let index: usize = suffix.parse().map_err(|_| {
        OciLogsError::Config(format!(
            "Malformed profile field name '{}': index '{}' is not numeric",
            key, suffix
        ))
    })?;

    if index >= MAX_PROFILE_SLOTS {
        return Err(OciLogsError::Config(format!(
            "Profile field '{}' uses index {}, max is {}",
            key,
            index,
            MAX_PROFILE_SLOTS - 1
        )));
    }

    Ok(Some((field, index)))
}

/// Lay the merged settings out as the ordered sequence of slot descriptors.
pub fn decode_slots(merged: &BTreeMap<String, String>) -> Result<Vec<ProfileSlot>> {
    let mut slots: Vec<ProfileSlot> = (0..MAX_PROFILE_SLOTS).map(ProfileSlot::new).collect();
    for (key, value) in merged {
        if let Some((field, index)) = split_field_key(key)? {
            slots[index].set(field, value.trim().to_string());
        }
    }
    Ok(slots)
}

/// Parse the merged settings view into profiles, keyed by profile name in
/// slot order.
///
/// Slots are walked from index 0. The first slot with an empty profile name
/// ends the walk: later slots are never examined, populated or not.
pub fn parse_profiles(merged: &BTreeMap<String, String>) -> Result<IndexMap<String, TenancyProfile>> {
    let slots = decode_slots(merged)?;
    let mut profiles: IndexMap<String, TenancyProfile> = IndexMap::new();

    for slot in slots {
        if slot.profile.is_empty() {
            tracing::debug!("Profile slot {} is empty, stopping profile walk", slot.index);
            break;
        }
        if profiles.contains_key(&slot.profile) {
            return Err(OciLogsError::Config(format!(
                "Duplicate profile name '{}' at slot {}",
                slot.profile, slot.index
            )));
        }
        let profile = slot.into_profile();
        profiles.insert(profile.profile_key.clone(), profile);
    }

    Ok(profiles)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot_entries(index: usize, profile: &str) -> Vec<(String, String)> {
        vec![
            (ProfileField::Profile.key(index), profile.to_string()),
            (
                ProfileField::Tenancy.key(index),
                format!("ocid1.tenancy.oc1..{}", index),
            ),
            (ProfileField::Region.key(index), "us-ashburn-1".to_string()),
            (
                ProfileField::User.key(index),
                format!("ocid1.user.oc1..{}", index),
            ),
            (ProfileField::Fingerprint.key(index), "aa:bb".to_string()),
            (ProfileField::PrivateKey.key(index), "PEM".to_string()),
        ]
    }

    fn blob(profiles: &[(usize, &str)]) -> BTreeMap<String, String> {
        profiles
            .iter()
            .flat_map(|(i, p)| slot_entries(*i, p))
            .collect()
    }

    #[test]
    fn test_dense_slots_yield_every_profile() {
        let merged = blob(&[(0, "DEFAULT"), (1, "EU"), (2, "APAC")]);
        let profiles = parse_profiles(&merged).unwrap();
        let keys: Vec<&str> = profiles.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["DEFAULT", "EU", "APAC"]);
        assert_eq!(profiles["EU"].tenancy_ocid, "ocid1.tenancy.oc1..1");
    }

    #[test]
    fn test_all_six_slots() {
        let merged = blob(&[(0, "a"), (1, "b"), (2, "c"), (3, "d"), (4, "e"), (5, "f")]);
        assert_eq!(parse_profiles(&merged).unwrap().len(), 6);
    }

    #[test]
    fn test_empty_profile_name_terminates_walk() {
        let mut merged = blob(&[(0, "a"), (1, "b"), (3, "d"), (4, "e")]);
        // Slot 2 present but with an empty name.
        merged.insert(ProfileField::Profile.key(2), String::new());
        merged.insert(ProfileField::Tenancy.key(2), "ocid1.tenancy.oc1..2".to_string());

        let profiles = parse_profiles(&merged).unwrap();
        assert_eq!(profiles.len(), 2);
        assert!(!profiles.contains_key("d"));
    }

    #[test]
    fn test_missing_first_slot_yields_no_profiles() {
        let merged = blob(&[(1, "b"), (2, "c")]);
        assert!(parse_profiles(&merged).unwrap().is_empty());
    }

    #[test]
    fn test_unrelated_keys_ignored() {
        let mut merged = blob(&[(0, "a")]);
        merged.insert("environment".to_string(), "local".to_string());
        merged.insert("tenancyMode".to_string(), "multitenancy".to_string());
        merged.insert("some_other_0".to_string(), "x".to_string());
        assert_eq!(parse_profiles(&merged).unwrap().len(), 1);
    }

    #[test]
    fn test_field_without_index_is_config_error() {
        let mut merged = blob(&[(0, "a")]);
        merged.insert("privkey".to_string(), "PEM".to_string());
        let err = parse_profiles(&merged).unwrap_err();
        assert!(matches!(err, OciLogsError::Config(ref m) if m.contains("privkey")));
    }

    #[test]
    fn test_non_numeric_index_is_config_error() {
        let mut merged = blob(&[(0, "a")]);
        merged.insert("region_x".to_string(), "us-ashburn-1".to_string());
        assert!(matches!(
            parse_profiles(&merged),
            Err(OciLogsError::Config(_))
        ));
    }

    #[test]
    fn test_out_of_range_index_is_config_error() {
        let mut merged = blob(&[(0, "a")]);
        merged.insert("tenancy_6".to_string(), "ocid1".to_string());
        assert!(matches!(
            parse_profiles(&merged),
            Err(OciLogsError::Config(_))
        ));
    }

    #[test]
    fn test_duplicate_profile_name_is_config_error() {
        let merged = blob(&[(0, "same"), (1, "same")]);
        assert!(matches!(
            parse_profiles(&merged),
            Err(OciLogsError::Config(ref m)) if m.contains("Duplicate")
        ));
    }

    #[test]
    fn test_passphrase_is_optional() {
        let mut merged = blob(&[(0, "a"), (1, "b")]);
        merged.insert(ProfileField::Passphrase.key(1), "secret".to_string());
        let profiles = parse_profiles(&merged).unwrap();
        assert_eq!(profiles["a"].private_key_passphrase, None);
        assert_eq!(profiles["b"].private_key_passphrase.as_deref(), Some("secret"));
    }

    #[test]
    fn test_debug_redacts_key_material() {
        let merged = blob(&[(0, "a")]);
        let profiles = parse_profiles(&merged).unwrap();
        let rendered = format!("{:?}", profiles["a"]);
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("PEM"));
    }
}
