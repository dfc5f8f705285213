use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::PluginError;

/// Where a plugin definition comes from. Provenance decides whether an
/// explicit permission check runs before the store is read: personal plugins
/// are guarded per team member, platform plugins are globally readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PluginSource {
    Personal,
    Platform,
}

impl PluginSource {
    pub fn tag(&self) -> &'static str {
        match self {
            PluginSource::Personal => "personal",
            PluginSource::Platform => "platform",
        }
    }
}

/// A parsed combined plugin identifier: provenance plus the key the store is
/// queried with. The lookup key is always the caller's full identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PluginIdentity {
    pub source: PluginSource,
    pub lookup_key: String,
}

/// Split a combined identifier into `(source, lookup key)`.
///
/// A bare identifier (no `-` separator) is a personally owned plugin keyed by
/// its raw id. A prefixed identifier `"<tag>-<key>"` must carry a known
/// provenance tag and a non-empty key.
pub fn split_plugin_id(combined: &str) -> Result<PluginIdentity, PluginError> {
    if combined.is_empty() {
        return Err(PluginError::MalformedIdentifier("empty identifier".to_string()));
    }
    match combined.split_once('-') {
        None => Ok(PluginIdentity {
            source: PluginSource::Personal,
            lookup_key: combined.to_string(),
        }),
        Some((tag, key)) => {
            if key.is_empty() {
                return Err(PluginError::MalformedIdentifier(format!(
                    "`{}` has no key after its source tag",
                    combined
                )));
            }
            let source = match tag {
                "personal" => PluginSource::Personal,
                "platform" => PluginSource::Platform,
                other => {
                    return Err(PluginError::MalformedIdentifier(format!(
                        "unknown plugin source `{}`",
                        other
                    )));
                }
            };
            Ok(PluginIdentity {
                source,
                lookup_key: combined.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_id_is_personal() {
        let id = split_plugin_id("64f1a2b3c4").unwrap();
        assert_eq!(id.source, PluginSource::Personal);
        assert_eq!(id.lookup_key, "64f1a2b3c4");
    }

    #[test]
    fn prefixed_ids_keep_the_full_key() {
        let id = split_plugin_id("platform-weather").unwrap();
        assert_eq!(id.source, PluginSource::Platform);
        assert_eq!(id.lookup_key, "platform-weather");

        let id = split_plugin_id("personal-abc").unwrap();
        assert_eq!(id.source, PluginSource::Personal);
        assert_eq!(id.lookup_key, "personal-abc");
    }

    #[test]
    fn unknown_tag_is_malformed() {
        let err = split_plugin_id("bogus-abc").unwrap_err();
        assert!(matches!(err, PluginError::MalformedIdentifier(_)));
    }

    #[test]
    fn empty_key_is_malformed() {
        assert!(matches!(
            split_plugin_id("personal-"),
            Err(PluginError::MalformedIdentifier(_))
        ));
        assert!(matches!(
            split_plugin_id(""),
            Err(PluginError::MalformedIdentifier(_))
        ));
    }
}
