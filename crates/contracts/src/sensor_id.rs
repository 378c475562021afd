//! SensorId - cheap-to-clone sensor identifier
//!
//! Every frame carries the id of the sensor that produced it, so the id is
//! cloned once per tick. `Arc<str>` keeps that a refcount bump.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Sensor identifier with O(1) clone.
///
/// # Examples
/// ```
/// use contracts::SensorId;
///
/// let id: SensorId = "roof_lidar".into();
/// let copy = id.clone();
/// assert_eq!(id, copy);
/// assert_eq!(copy.as_str(), "roof_lidar");
/// ```
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SensorId(Arc<str>);

impl SensorId {
    #[inline]
    pub fn new(s: &str) -> Self {
        Self(Arc::from(s))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for SensorId {
    type Target = str;

    #[inline]
    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for SensorId {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SensorId {
    #[inline]
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SensorId {
    #[inline]
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl fmt::Debug for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for SensorId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SensorId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_clone_shares_allocation() {
        let id = SensorId::new("roof_lidar");
        let copy = id.clone();
        assert!(Arc::ptr_eq(&id.0, &copy.0));
    }

    #[test]
    fn test_hashmap_lookup_by_str() {
        let mut map = HashMap::new();
        map.insert(SensorId::new("front"), 7);
        assert_eq!(map.get("front"), Some(&7));
    }

    #[test]
    fn test_serde_as_plain_string() {
        let id = SensorId::new("lidar_top");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"lidar_top\"");
        let back: SensorId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
