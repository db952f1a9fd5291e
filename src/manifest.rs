//! Manifest documents that pin image tags
//!
//! A manifest is a YAML mapping with an `imageTags` list, in the shape used
//! by kustomize image overrides:
//!
//! ```yaml
//! imageTags:
//!   - name: registry.example.com/app
//!     newTag: v1.4.2
//! ```
//!
//! Only the `name` and `newTag` fields are interpreted. Every other key, at
//! document or entry level, is carried through re-encoding untouched.

use crate::domain::ImageVersion;
use crate::error::{PromoteError, Result};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use tracing::{debug, info, warn};

/// Key of the image tag list inside a manifest
pub const IMAGE_TAGS_KEY: &str = "imageTags";

/// A decoded manifest that carries an image tag list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestDocument {
    #[serde(flatten)]
    pub other: Mapping,

    #[serde(rename = "imageTags")]
    pub image_tags: Vec<ImageTagEntry>,
}

/// One `imageTags` entry
///
/// `name` and `newTag` stay untyped so entries for other images decode
/// whatever they hold; only entries for the promoted image are interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageTagEntry {
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub name: Value,

    #[serde(rename = "newTag", default, skip_serializing_if = "Option::is_none")]
    pub new_tag: Option<Value>,

    #[serde(flatten)]
    pub other: Mapping,
}

impl ImageTagEntry {
    /// True when this entry pins `image`
    pub fn is_for(&self, image: &str) -> bool {
        self.name.as_str() == Some(image)
    }
}

impl ManifestDocument {
    /// Point every entry for `image` at `candidate` where that is an upgrade.
    ///
    /// An entry without a tag is always set. An entry with a tag is only
    /// overwritten when the candidate is strictly newer; a recorded tag that
    /// does not parse under the candidate's scheme leaves the entry alone.
    /// Returns true when at least one entry changed.
    pub fn promote(&mut self, image: &str, candidate: &ImageVersion) -> bool {
        let mut changed = false;

        for entry in self.image_tags.iter_mut().filter(|e| e.is_for(image)) {
            match entry.new_tag.as_ref() {
                None => {
                    info!(image, new_tag = candidate.tag(), "no recorded tag, creating it");
                }
                Some(Value::String(current)) => match candidate.is_newer_than(current) {
                    Ok(true) => {}
                    Ok(false) => {
                        debug!(current = %current, candidate = candidate.tag(), "recorded tag is not older");
                        continue;
                    }
                    Err(e) => {
                        warn!(current = %current, candidate = candidate.tag(), error = %e, "cannot compare with recorded tag, entry skipped");
                        continue;
                    }
                },
                Some(other) => {
                    warn!(current = ?other, candidate = candidate.tag(), "recorded tag is not a string, entry skipped");
                    continue;
                }
            }

            entry.new_tag = Some(Value::from(candidate.tag()));
            changed = true;
        }

        changed
    }

    #[cfg(test)]
    fn tags_for<'a>(&'a self, image: &'a str) -> impl Iterator<Item = Option<&'a str>> + 'a {
        self.image_tags
            .iter()
            .filter(move |e| e.is_for(image))
            .map(|e| e.new_tag.as_ref().and_then(Value::as_str))
    }
}

/// Decode manifest bytes read from `path`.
///
/// Returns `Ok(None)` for documents that are not mappings or have no
/// `imageTags` list; such documents are not ours to touch. Invalid YAML and
/// malformed entries are errors.
pub fn decode(path: &str, bytes: &[u8]) -> Result<Option<ManifestDocument>> {
    let value: Value = serde_yaml::from_slice(bytes)
        .map_err(|e| PromoteError::manifest(format!("Invalid YAML in '{}': {}", path, e)))?;

    let has_tag_list = value
        .as_mapping()
        .and_then(|m| m.get(IMAGE_TAGS_KEY))
        .map_or(false, Value::is_sequence);
    if !has_tag_list {
        return Ok(None);
    }

    serde_yaml::from_value(value)
        .map(Some)
        .map_err(|e| PromoteError::manifest(format!("Invalid {} in '{}': {}", IMAGE_TAGS_KEY, path, e)))
}

/// Encode a manifest for writing back to `path`
pub fn encode(path: &str, document: &ManifestDocument) -> Result<Vec<u8>> {
    serde_yaml::to_string(document)
        .map(String::into_bytes)
        .map_err(|e| PromoteError::manifest(format!("Cannot encode '{}': {}", path, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TagScheme;

    const IMAGE: &str = "registry.example.com/app";

    fn semantic(tag: &str) -> ImageVersion {
        ImageVersion::parse(tag, TagScheme::Semantic).unwrap()
    }

    fn decode_str(yaml: &str) -> Option<ManifestDocument> {
        decode("test.yaml", yaml.as_bytes()).unwrap()
    }

    #[test]
    fn test_decode_without_tag_list() {
        assert!(decode_str("kind: Deployment\nmetadata:\n  name: app\n").is_none());
        assert!(decode_str("- a\n- b\n").is_none());
        assert!(decode_str("imageTags: none\n").is_none());
    }

    #[test]
    fn test_decode_invalid_yaml() {
        let err = decode("broken.yaml", b"imageTags: [\n").unwrap_err();
        assert!(matches!(err, PromoteError::Manifest(_)));
        assert!(err.to_string().contains("broken.yaml"));
    }

    #[test]
    fn test_entry_without_name_left_alone() {
        let mut doc = decode_str("imageTags:\n  - newTag: v1.0.0\n").unwrap();
        assert!(!doc.promote(IMAGE, &semantic("v2.0.0")));

        let encoded = String::from_utf8(encode("test.yaml", &doc).unwrap()).unwrap();
        assert!(!encoded.contains("name"));
        assert!(encoded.contains("v1.0.0"));
    }

    #[test]
    fn test_unrelated_entry_with_numeric_tag() {
        let yaml = "\
imageTags:
  - name: redis
    newTag: 6
  - name: registry.example.com/app
    newTag: v1.0.0
";
        let mut doc = decode_str(yaml).unwrap();
        assert!(doc.promote(IMAGE, &semantic("v1.1.0")));

        let encoded = String::from_utf8(encode("test.yaml", &doc).unwrap()).unwrap();
        let reparsed: Value = serde_yaml::from_str(&encoded).unwrap();
        assert_eq!(reparsed["imageTags"][0]["name"], Value::from("redis"));
        assert_eq!(reparsed["imageTags"][0]["newTag"], Value::from(6));
        assert_eq!(reparsed["imageTags"][1]["newTag"], Value::from("v1.1.0"));
    }

    #[test]
    fn test_promote_skips_numeric_recorded_tag() {
        let yaml = "imageTags:\n  - name: registry.example.com/app\n    newTag: 100\n";
        let mut doc = decode_str(yaml).unwrap();

        assert!(!doc.promote(IMAGE, &ImageVersion::parse("dev-101-x", TagScheme::Serial).unwrap()));
        assert_eq!(doc.image_tags[0].new_tag, Some(Value::from(100)));
    }

    #[test]
    fn test_promote_sets_missing_tag() {
        let mut doc = decode_str("imageTags:\n  - name: registry.example.com/app\n").unwrap();
        assert!(doc.promote(IMAGE, &semantic("v1.0.0")));
        assert_eq!(doc.tags_for(IMAGE).collect::<Vec<_>>(), vec![Some("v1.0.0")]);
    }

    #[test]
    fn test_promote_only_upgrades() {
        let yaml = "imageTags:\n  - name: registry.example.com/app\n    newTag: v1.2.0\n";
        let mut doc = decode_str(yaml).unwrap();

        assert!(!doc.promote(IMAGE, &semantic("v1.1.0")));
        assert!(!doc.promote(IMAGE, &semantic("v1.2.0")));
        assert!(doc.promote(IMAGE, &semantic("v1.3.0")));
        assert_eq!(doc.tags_for(IMAGE).collect::<Vec<_>>(), vec![Some("v1.3.0")]);
    }

    #[test]
    fn test_promote_skips_unparseable_recorded_tag() {
        let yaml = "imageTags:\n  - name: registry.example.com/app\n    newTag: latest\n";
        let mut doc = decode_str(yaml).unwrap();

        assert!(!doc.promote(IMAGE, &semantic("v2.0.0")));
        assert_eq!(doc.tags_for(IMAGE).collect::<Vec<_>>(), vec![Some("latest")]);
    }

    #[test]
    fn test_promote_leaves_other_images() {
        let yaml = "\
imageTags:
  - name: registry.example.com/sidecar
    newTag: v0.1.0
  - name: registry.example.com/app
    newTag: v1.0.0
";
        let mut doc = decode_str(yaml).unwrap();
        assert!(doc.promote(IMAGE, &semantic("v1.0.1")));

        let sidecar: Vec<_> = doc.tags_for("registry.example.com/sidecar").collect();
        assert_eq!(sidecar, vec![Some("v0.1.0")]);
    }

    #[test]
    fn test_promote_updates_every_matching_entry() {
        let yaml = "\
imageTags:
  - name: registry.example.com/app
    newTag: v1.0.0
  - name: registry.example.com/app
";
        let mut doc = decode_str(yaml).unwrap();
        assert!(doc.promote(IMAGE, &semantic("v1.1.0")));
        assert_eq!(
            doc.tags_for(IMAGE).collect::<Vec<_>>(),
            vec![Some("v1.1.0"), Some("v1.1.0")]
        );
    }

    #[test]
    fn test_unknown_fields_survive_encoding() {
        let yaml = "\
apiVersion: kustomize.config.k8s.io/v1beta1
kind: Kustomization
resources:
  - ../../base
imageTags:
  - name: registry.example.com/app
    newName: mirror.example.com/app
    newTag: v1.0.0
";
        let mut doc = decode_str(yaml).unwrap();
        doc.promote(IMAGE, &semantic("v1.0.1"));

        let encoded = String::from_utf8(encode("test.yaml", &doc).unwrap()).unwrap();
        let reparsed: Value = serde_yaml::from_str(&encoded).unwrap();

        assert_eq!(reparsed["kind"], Value::from("Kustomization"));
        assert_eq!(reparsed["resources"][0], Value::from("../../base"));
        assert_eq!(
            reparsed["imageTags"][0]["newName"],
            Value::from("mirror.example.com/app")
        );
        assert_eq!(reparsed["imageTags"][0]["newTag"], Value::from("v1.0.1"));
    }

    #[test]
    fn test_encode_omits_missing_tag() {
        let doc = decode_str("imageTags:\n  - name: registry.example.com/other\n").unwrap();
        let encoded = String::from_utf8(encode("test.yaml", &doc).unwrap()).unwrap();
        assert!(!encoded.contains("newTag"));
    }
}
