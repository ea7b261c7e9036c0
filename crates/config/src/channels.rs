//! The channel map: which channels subscribe to which events, projects, and
//! branches. Lives in its own YAML file so operators can manage it separately
//! from credentials.

use std::{collections::BTreeMap, path::Path};

use serde::Deserialize;

/// Subscriptions declared for one channel.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChannelSubscriptions {
    /// Event keys: the four stream kinds plus the synthetic approval
    /// threshold keys (`x-vrif-minus-2`, …).
    pub events: Vec<String>,
    pub projects: Vec<String>,
    pub branches: Vec<String>,
}

/// Channel names always carry the leading `#`; entries without it are
/// normalized on load.
pub fn normalize_channel(name: &str) -> String {
    if name.starts_with('#') {
        name.to_string()
    } else {
        format!("#{name}")
    }
}

/// Load the channel map from YAML.
///
/// Keys are normalized; two entries that collide after normalization collapse
/// to one (last wins, matching the map semantics of the file format).
pub fn load_channel_map(path: &Path) -> anyhow::Result<BTreeMap<String, ChannelSubscriptions>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read channel map {}: {e}", path.display()))?;
    let parsed: BTreeMap<String, ChannelSubscriptions> = serde_yaml::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("invalid channel map {}: {e}", path.display()))?;

    Ok(parsed
        .into_iter()
        .map(|(name, subs)| (normalize_channel(&name), subs))
        .collect())
}

#[cfg(test)]
mod tests {
    use {super::*, std::io::Write};

    const SAMPLE: &str = concat!(
        "release:\n",
        "  events: [patchset-created, change-merged]\n",
        "  projects: [myproj]\n",
        "  branches: [main]\n",
        "\"#qa\":\n",
        "  events: [comment-added, x-vrif-minus-2]\n",
        "  projects: [myproj, otherproj]\n",
        "  branches: [main, stable]\n",
    );

    #[test]
    fn normalizes_missing_marker() {
        assert_eq!(normalize_channel("release"), "#release");
        assert_eq!(normalize_channel("#release"), "#release");
    }

    #[test]
    fn loads_and_normalizes_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let map = load_channel_map(file.path()).unwrap();
        assert_eq!(
            map.keys().collect::<Vec<_>>(),
            vec!["#qa", "#release"],
        );
        assert_eq!(map["#release"].projects, vec!["myproj"]);
        assert!(map["#qa"].events.contains(&"x-vrif-minus-2".to_string()));
    }

    #[test]
    fn duplicate_names_collapse_after_normalization() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            concat!(
                "dev:\n",
                "  events: [patchset-created]\n",
                "\"#dev\":\n",
                "  events: [change-merged]\n",
            )
            .as_bytes(),
        )
        .unwrap();
        let map = load_channel_map(file.path()).unwrap();
        assert_eq!(map.len(), 1);
        assert!(map.contains_key("#dev"));
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"ops:\n  events: [ref-updated]\n").unwrap();
        let map = load_channel_map(file.path()).unwrap();
        assert!(map["#ops"].projects.is_empty());
        assert!(map["#ops"].branches.is_empty());
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"release: [not, a, mapping").unwrap();
        assert!(load_channel_map(file.path()).is_err());
    }
}
