use std::collections::BTreeMap;

use super::proto::ReplySentence;

/// One key-value row as reported by the device.
///
/// The device does not guarantee which keys a row carries (a disabled secret
/// may omit `profile`, an active session has no `password`, and so on), so
/// the well-known fields are exposed as optional accessors over the residual
/// map rather than as struct fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceRecord {
    fields: BTreeMap<String, String>,
}

impl DeviceRecord {
    pub fn from_reply(reply: &ReplySentence) -> Self {
        Self {
            fields: reply
                .attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// The internal row id (`.id`), required for set/remove commands.
    pub fn id(&self) -> Option<&str> {
        self.get(".id")
    }

    pub fn name(&self) -> Option<&str> {
        self.get("name")
    }

    pub fn profile(&self) -> Option<&str> {
        self.get("profile")
    }

    #[cfg(test)]
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            fields: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routeros::proto::{ReplyKind, ReplySentence};

    #[test]
    fn accessors_tolerate_missing_keys() {
        let reply = ReplySentence {
            kind: ReplyKind::Re,
            attributes: vec![
                (".id".to_string(), "*A1".to_string()),
                ("name".to_string(), "siti".to_string()),
            ],
        };
        let record = DeviceRecord::from_reply(&reply);
        assert_eq!(record.id(), Some("*A1"));
        assert_eq!(record.name(), Some("siti"));
        assert_eq!(record.profile(), None);
        assert_eq!(record.get("uptime"), None);
    }
}
