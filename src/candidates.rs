use crate::domain::{ImageVersion, TagScheme};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Select the tags to publish from a raw registry listing.
///
/// Tags that do not parse under `scheme` are dropped, as are tags that are
/// not strictly newer than `baseline`. Duplicates are removed and the result
/// is sorted oldest first. A baseline that does not parse is ignored.
pub fn select_candidates<I, S>(raw_tags: I, baseline: Option<&str>, scheme: TagScheme) -> Vec<ImageVersion>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let baseline = baseline.and_then(|tag| match ImageVersion::parse(tag, scheme) {
        Ok(version) => Some(version),
        Err(e) => {
            warn!(baseline = tag, error = %e, "baseline does not parse, considering every tag");
            None
        }
    });

    let mut seen = HashSet::new();
    let mut candidates: Vec<ImageVersion> = raw_tags
        .into_iter()
        .filter_map(|raw| {
            let raw = raw.as_ref();
            match ImageVersion::parse(raw, scheme) {
                Ok(version) => Some(version),
                Err(e) => {
                    debug!(tag = raw, error = %e, "ignoring tag");
                    None
                }
            }
        })
        .filter(|version| match &baseline {
            Some(baseline) => version.cmp_precedence(baseline).is_gt(),
            None => true,
        })
        .filter(|version| seen.insert(version.tag().to_string()))
        .collect();

    candidates.sort_by(|a, b| a.cmp_precedence(b));
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(versions: &[ImageVersion]) -> Vec<&str> {
        versions.iter().map(ImageVersion::tag).collect()
    }

    #[test]
    fn test_sorted_and_filtered_by_baseline() {
        let selected = select_candidates(
            ["dev-12-c", "dev-9-a", "dev-10-b", "dev-11-x"],
            Some("dev-10-b"),
            TagScheme::Serial,
        );
        assert_eq!(tags(&selected), vec!["dev-11-x", "dev-12-c"]);
    }

    #[test]
    fn test_unparseable_tags_dropped() {
        let selected = select_candidates(
            ["latest", "v1.2.0", "1.3.0", "v1.10.0", "v1.2.0-rc.1"],
            None,
            TagScheme::Semantic,
        );
        assert_eq!(tags(&selected), vec!["v1.2.0-rc.1", "v1.2.0", "v1.10.0"]);
    }

    #[test]
    fn test_duplicates_removed() {
        let selected = select_candidates(
            vec!["v1.0.1".to_string(), "v1.0.1".to_string()],
            Some("v1.0.0"),
            TagScheme::Semantic,
        );
        assert_eq!(tags(&selected), vec!["v1.0.1"]);
    }

    #[test]
    fn test_equal_precedence_to_baseline_dropped() {
        let selected = select_candidates(["v1.0.0+build.7", "v1.0.1"], Some("v1.0.0"), TagScheme::Semantic);
        assert_eq!(tags(&selected), vec!["v1.0.1"]);
    }

    #[test]
    fn test_unparseable_baseline_ignored() {
        let selected = select_candidates(["dev-2-b", "dev-1-a"], Some("latest"), TagScheme::Serial);
        assert_eq!(tags(&selected), vec!["dev-1-a", "dev-2-b"]);
    }

    #[test]
    fn test_empty_listing() {
        let selected = select_candidates(Vec::<String>::new(), None, TagScheme::Serial);
        assert!(selected.is_empty());
    }
}
