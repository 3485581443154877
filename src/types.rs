use std::env;
use std::path::{Path, PathBuf};

use crate::constants::MECAB_PATH_ENV;
use crate::options::{TaggerConfig, TaggerOptions};

/// How parse calls walk the tagger's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// One best path per parse.
    SingleBest,
    /// The N best paths, in native rank order.
    NBest(usize),
}

impl ParseMode {
    pub(crate) fn for_config(config: &TaggerConfig) -> Self {
        match config.nbest {
            Some(n) if n > 1 => ParseMode::NBest(n),
            _ => ParseMode::SingleBest,
        }
    }
}

/// Where per-node feature strings come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FeatureSource {
    /// Features are left empty.
    Skip,
    /// The node's own feature field.
    Raw,
    /// `mecab_format_node`, honoring the configured output format.
    Formatted,
}

impl FeatureSource {
    pub(crate) fn resolve(config: &TaggerConfig, requested: Option<bool>) -> Self {
        match (requested, config.has_output_format()) {
            (Some(false), _) => FeatureSource::Skip,
            (_, true) => FeatureSource::Formatted,
            (Some(true), false) => FeatureSource::Raw,
            (None, false) => FeatureSource::Skip,
        }
    }
}

/// Construction settings for [`crate::Mecab::from_config`].
#[derive(Debug, Clone, Default)]
pub struct MecabConfig {
    /// Explicit MeCab library path. `None` falls back to default discovery.
    pub library_path: Option<PathBuf>,
    /// Tagger options, structured or raw.
    pub options: TaggerOptions,
    /// Feature extraction override. See [`Self::with_feature_extraction`].
    pub feature_extraction: Option<bool>,
}

impl MecabConfig {
    /// Creates a config that picks the library up from `MECAB_PATH`, if set.
    pub fn from_env() -> Self {
        Self {
            library_path: env::var_os(MECAB_PATH_ENV).map(PathBuf::from),
            ..Self::default()
        }
    }

    /// Sets `library_path`.
    pub fn with_library_path(mut self, library_path: impl AsRef<Path>) -> Self {
        self.library_path = Some(library_path.as_ref().to_path_buf());
        self
    }

    /// Sets the tagger options.
    pub fn with_options(mut self, options: impl Into<TaggerOptions>) -> Self {
        self.options = options.into();
        self
    }

    /// Forces feature extraction on or off.
    ///
    /// By default features are read only when an output format type or a
    /// node format is configured.
    pub fn with_feature_extraction(mut self, enabled: bool) -> Self {
        self.feature_extraction = Some(enabled);
        self
    }
}

#[cfg(test)]
mod types_tests {
    use super::{FeatureSource, MecabConfig, ParseMode};
    use crate::test_support::with_env_var;
    use crate::TaggerConfig;
    use std::path::PathBuf;

    #[test]
    fn parse_mode_follows_nbest() {
        assert_eq!(
            ParseMode::for_config(&TaggerConfig::default()),
            ParseMode::SingleBest
        );
        assert_eq!(
            ParseMode::for_config(&TaggerConfig::default().with_nbest(1)),
            ParseMode::SingleBest
        );
        assert_eq!(
            ParseMode::for_config(&TaggerConfig::default().with_nbest(4)),
            ParseMode::NBest(4)
        );
    }

    #[test]
    fn feature_source_defaults_to_skip_without_format() {
        let plain = TaggerConfig::default();
        let formatted = TaggerConfig::default().with_output_format_type("chasen");

        assert_eq!(FeatureSource::resolve(&plain, None), FeatureSource::Skip);
        assert_eq!(FeatureSource::resolve(&plain, Some(true)), FeatureSource::Raw);
        assert_eq!(
            FeatureSource::resolve(&formatted, None),
            FeatureSource::Formatted
        );
        assert_eq!(
            FeatureSource::resolve(&formatted, Some(false)),
            FeatureSource::Skip
        );
    }

    #[test]
    fn mecab_config_from_env_respects_mecab_path() {
        with_env_var("MECAB_PATH", "/tmp/libmecab-test.so", || {
            let config = MecabConfig::from_env();
            assert_eq!(
                config.library_path,
                Some(PathBuf::from("/tmp/libmecab-test.so"))
            );
        });
    }
}
