use serde::{Deserialize, Deserializer};
use std::time::Duration;

pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Duration::from_millis(Deserialize::deserialize(deserializer)?))
}

/// Same as the parent module, for fields that may be `null` or missing. Pair with `#[serde(default)]`.
pub(crate) mod option {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis: Option<u64> = Deserialize::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}
