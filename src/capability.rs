//! Capabilities: the rights a UCAN delegates.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::{collections::BTreeMap, ops::Deref, slice::Iter};
use url::Url;

/// A single delegated capability: a resource (`with`), an ability (`can`)
/// and optional caveats (`nb`).
///
/// Capabilities are open records: keys other than `with`/`can`/`nb` found in
/// a token are preserved verbatim so that re-encoding does not drop
/// extensions this library does not understand.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Capability {
    with: String,
    can: String,
    nb: Option<Value>,
    extra: BTreeMap<String, Value>,
}

impl Capability {
    pub fn new(with: impl Into<String>, can: impl Into<String>) -> Self {
        Capability {
            with: with.into(),
            can: can.into(),
            nb: None,
            extra: BTreeMap::new(),
        }
    }

    /// Attach caveats to this capability
    pub fn with_caveats(mut self, nb: Value) -> Self {
        self.nb = Some(nb);
        self
    }

    /// The resource this capability applies to
    pub fn with(&self) -> &str {
        &self.with
    }

    /// The delegated ability
    pub fn can(&self) -> &str {
        &self.can
    }

    /// Caveats constraining the ability, if any
    pub fn caveats(&self) -> Option<&Value> {
        self.nb.as_ref()
    }

    /// Fields of the capability record beyond `with`/`can`/`nb`
    pub fn extra(&self) -> &BTreeMap<String, Value> {
        &self.extra
    }
}

impl From<(&str, &str)> for Capability {
    fn from((with, can): (&str, &str)) -> Self {
        Capability::new(with, can)
    }
}

impl From<(&str, &str, Value)> for Capability {
    fn from((with, can, nb): (&str, &str, Value)) -> Self {
        Capability::new(with, can).with_caveats(nb)
    }
}

impl From<&Capability> for Capability {
    fn from(value: &Capability) -> Self {
        value.to_owned()
    }
}

impl Serialize for Capability {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // A sorted map gives the deterministic key order the canonical
        // encodings require
        let mut map: BTreeMap<&str, Value> = BTreeMap::new();
        map.insert("with", Value::String(self.with.clone()));
        map.insert("can", Value::String(self.can.clone()));

        if let Some(nb) = &self.nb {
            map.insert("nb", nb.clone());
        }

        for (key, value) in &self.extra {
            map.insert(key.as_str(), value.clone());
        }

        map.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Capability {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut map = BTreeMap::<String, Value>::deserialize(deserializer)?;

        let with = match map.remove("with") {
            Some(Value::String(with)) => with,
            other => {
                return Err(serde::de::Error::custom(format!(
                    "capability requires a 'with' string, instead got {}",
                    other.unwrap_or(Value::Null)
                )))
            }
        };

        let can = match map.remove("can") {
            Some(Value::String(can)) => can,
            other => {
                return Err(serde::de::Error::custom(format!(
                    "capability requires a 'can' string, instead got {}",
                    other.unwrap_or(Value::Null)
                )))
            }
        };

        let nb = map.remove("nb");

        Ok(Capability {
            with,
            can,
            nb,
            extra: map,
        })
    }
}

/// The non-empty, ordered capability list of a UCAN payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Capabilities(Vec<Capability>);

impl Capabilities {
    pub fn iter(&self) -> Iter<'_, Capability> {
        self.0.iter()
    }

    pub fn to_vec(&self) -> Vec<Capability> {
        self.0.clone()
    }
}

impl Deref for Capabilities {
    type Target = [Capability];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Validates the capability list as a whole: it must be non-empty, every
/// ability must be well-formed (and is normalized to lower case), every
/// resource must be a URI, and wildcard resources may only delegate the
/// wildcard ability.
impl TryFrom<Vec<Capability>> for Capabilities {
    type Error = anyhow::Error;

    fn try_from(value: Vec<Capability>) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(anyhow!(
                "Payload has invalid 'att: []', a UCAN must delegate at least one capability"
            ));
        }

        let capabilities = value
            .into_iter()
            .enumerate()
            .map(|(index, capability)| read_capability(capability, &format!("att[{index}]")))
            .collect::<Result<Vec<Capability>>>()?;

        Ok(Capabilities(capabilities))
    }
}

// Resources that delegate everything the issuer owns or was delegated, per
// <https://github.com/ucan-wg/spec/tree/0.9.1#521-subdelegation>
fn delegates_all_rights(with: &str) -> bool {
    with.ends_with('*') && (with.starts_with("my:") || with.starts_with("as:did:"))
}

fn is_ability(can: &str) -> bool {
    if can == "*" {
        return true;
    }

    let mut segments = can.split('/');
    matches!(
        (segments.next(), segments.next()),
        (Some(namespace), Some(segment)) if !namespace.is_empty() && !segment.is_empty()
    ) && !can.ends_with('/')
        && !can.contains("//")
}

pub(crate) fn read_capability(capability: Capability, at: &str) -> Result<Capability> {
    // The 'can' field is lower-cased on read; 'with' is left untouched so
    // that re-encoding a foreign token cannot change its resource
    let can = capability.can.to_lowercase();

    if !is_ability(&can) {
        return Err(anyhow!(
            "Payload has invalid '{at}.can: {}', value must be formatted as '<namespace>/<ability>'",
            Value::String(capability.can)
        ));
    }

    if Url::parse(&capability.with).is_err() {
        return Err(anyhow!(
            "Payload has invalid '{at}.with: {}', value must be a valid URI",
            Value::String(capability.with)
        ));
    }

    if delegates_all_rights(&capability.with) && can != "*" {
        return Err(anyhow!(
            "Payload has invalid '{at}.can: {}', for all 'my:*' or 'as:<did>:*' it must be '*'",
            Value::String(capability.can)
        ));
    }

    Ok(Capability { can, ..capability })
}
