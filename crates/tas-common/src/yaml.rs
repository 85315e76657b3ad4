//! YAML helpers for template loading and `render` output

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::Error;

/// Separator written before every document of a rendered stream
pub const DOCUMENT_SEPARATOR: &str = "---\n";

/// Parse a single YAML document into a typed value.
///
/// `what` names the document in error messages (e.g. "topology-updater DaemonSet").
pub fn from_yaml<T: DeserializeOwned>(what: &str, input: &str) -> Result<T, Error> {
    if input.trim().is_empty() {
        return Err(Error::serialization_for_kind(what, "empty document"));
    }
    serde_yaml::from_str(input)
        .map_err(|e| Error::serialization_for_kind(what, format!("invalid YAML for {what}: {e}")))
}

/// Serialize a value as a YAML document (without separator)
pub fn to_yaml<T: Serialize>(value: &T) -> Result<String, Error> {
    serde_yaml::to_string(value)
        .map_err(|e| Error::serialization(format!("failed to serialize to YAML: {e}")))
}

/// Join documents into a multi-document stream, each preceded by `---`
pub fn join_documents<I, S>(docs: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for doc in docs {
        out.push_str(DOCUMENT_SEPARATOR);
        out.push_str(doc.as_ref());
        if !doc.as_ref().ends_with('\n') {
            out.push('\n');
        }
    }
    out
}
