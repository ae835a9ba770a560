use std::fmt::{self, Debug, Display, Formatter};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Wraps values that must not reach the logs, such as request filters or
/// headers. Formatting and serialization print a placeholder; use
/// [`Sensitive::expose`] to get at the value.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct Sensitive<T>(T);

impl<T> Sensitive<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Debug for Sensitive<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl<T> Display for Sensitive<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl<T: Serialize> Serialize for Sensitive<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("***")
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Sensitive<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(Sensitive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filters_are_redacted_when_logged() {
        let filters = Sensitive::new(Some(json!({ "email": "someone@example.com" })));
        assert_eq!(format!("{filters:?}"), "[REDACTED]");
        assert_eq!(filters.to_string(), "[REDACTED]");
        assert_eq!(serde_json::to_string(&filters).unwrap(), "\"***\"");
        assert_eq!(
            filters.expose().as_ref().unwrap()["email"],
            json!("someone@example.com")
        );
    }

    #[test]
    fn deserializes_inner_value() {
        let headers: Sensitive<String> = serde_json::from_str("\"Bearer abc\"").unwrap();
        assert_eq!(headers.into_inner(), "Bearer abc");
    }
}
