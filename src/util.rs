pub(crate) mod duration_millis;
pub(crate) mod redact;
