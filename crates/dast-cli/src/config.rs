//! `dast.toml` configuration: diff and render settings, overridable from the
//! command line.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

use dast_diff::DiffConfig;
use dast_render::RenderOptions;

use crate::cli::DiffArgs;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DastConfig {
    pub diff: DiffConfig,
    pub render: RenderOptions,
}

impl DastConfig {
    /// Read a config file, or the defaults when no file is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = toml::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Extra ignored fields, on top of the configured ones.
    pub fn ignore(&mut self, fields: &[String]) {
        self.diff.ignored_fields.extend(fields.iter().cloned());
    }

    /// Apply the `diff` subcommand's flags.
    pub fn apply(&mut self, args: &DiffArgs) {
        if args.strict {
            self.diff = DiffConfig::strict();
        }
        self.ignore(&args.ignore);
        if args.no_reorders {
            self.diff.detect_reorders = false;
        }
        if args.show_moves {
            self.render.show_moves = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_path_gives_defaults() {
        let config = DastConfig::load(None).unwrap();
        assert_eq!(config, DastConfig::default());
        assert!(config.diff.detect_reorders);
        assert!(!config.render.show_moves);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[diff]\ndetect_reorders = false\nignored_fields = [\"ctx\"]\n\n[render]\nshow_moves = true").unwrap();

        let config = DastConfig::load(Some(file.path())).unwrap();
        assert!(!config.diff.detect_reorders);
        assert!(config.diff.is_ignored("ctx"));
        assert!(!config.diff.is_ignored("lineno"));
        assert_eq!(config.diff.max_depth, DiffConfig::default().max_depth);
        assert!(config.render.show_moves);
    }

    #[test]
    fn bad_toml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[diff\n").unwrap();
        assert!(DastConfig::load(Some(file.path())).is_err());
    }

    #[test]
    fn flags_override_file() {
        let mut config = DastConfig::default();
        config.apply(&DiffArgs {
            paths: Vec::new(),
            ignore: vec!["ctx".into()],
            no_reorders: true,
            strict: false,
            show_moves: true,
        });
        assert!(config.diff.is_ignored("ctx"));
        assert!(config.diff.is_ignored("lineno"));
        assert!(!config.diff.detect_reorders);
        assert!(config.render.show_moves);
    }

    #[test]
    fn strict_flag_compares_positions() {
        let mut config = DastConfig::default();
        config.apply(&DiffArgs {
            paths: Vec::new(),
            ignore: vec!["ctx".into()],
            no_reorders: false,
            strict: true,
            show_moves: false,
        });
        assert!(!config.diff.is_ignored("lineno"));
        assert!(config.diff.is_ignored("ctx"));
        assert!(!config.diff.detect_reorders);
    }
}
