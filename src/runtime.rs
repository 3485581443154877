use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::constants::MECAB_PATH_ENV;
use crate::decoder::{decode_best, walk_nbest};
use crate::dictionary::collect_dictionaries;
use crate::discovery::{default_library_candidates, discover_default_library_path};
use crate::error::{MecabError, Result};
use crate::handle::TaggerHandle;
use crate::model::{DictionaryInfo, MorphNode};
use crate::native::{cstr_to_string, DynamicLibrary, LoadedLibrary, MecabApi};
use crate::options::{TaggerConfig, TaggerOptions};
use crate::types::{FeatureSource, MecabConfig, ParseMode};

/// Handle to a loaded MeCab dynamic library plus resolved function table.
///
/// Cloning is cheap; every clone shares the same loaded library.
#[derive(Clone)]
pub struct MecabLibrary {
    inner: Arc<LoadedLibrary>,
}

impl MecabLibrary {
    /// Loads a MeCab dynamic library from an explicit path.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let library = DynamicLibrary::open(path.as_ref())?;
        Self::from_library(library, Some(path.as_ref().to_path_buf()))
    }

    /// Loads MeCab from common platform-specific locations. The first
    /// successful load is cached for the rest of the process.
    pub fn load_default() -> Result<Self> {
        static DEFAULT_LIBRARY: Mutex<Option<Arc<LoadedLibrary>>> = Mutex::new(None);

        let mut guard = DEFAULT_LIBRARY.lock().map_err(|_| {
            MecabError::LibraryLoad("failed to lock default library cache".to_string())
        })?;

        if let Some(inner) = guard.as_ref() {
            return Ok(Self {
                inner: inner.clone(),
            });
        }

        let inner = Self::load_default_internal()?.inner;
        *guard = Some(inner.clone());
        Ok(Self { inner })
    }

    fn load_default_internal() -> Result<Self> {
        let mut errors = Vec::new();

        if let Some(path) = discover_default_library_path() {
            match Self::load(&path) {
                Ok(loaded) => return Ok(loaded),
                Err(error) => errors.push(format!("{}: {}", path.display(), error)),
            }
        }

        for candidate in default_library_candidates() {
            let library = match DynamicLibrary::open(candidate) {
                Ok(library) => library,
                Err(error) => {
                    errors.push(format!("{candidate}: {error}"));
                    continue;
                }
            };

            match Self::from_library(library, Some(PathBuf::from(candidate))) {
                Ok(loaded) => return Ok(loaded),
                Err(error) => errors.push(format!("{candidate}: {error}")),
            }
        }

        Err(MecabError::LibraryLoad(format!(
            "set {MECAB_PATH_ENV} to the libmecab path. tried: {}",
            errors.join(" | ")
        )))
    }

    /// Loads from `MECAB_PATH` if set, otherwise falls back to
    /// [`Self::load_default`].
    pub fn load_from_env_or_default() -> Result<Self> {
        if let Some(path) = env::var_os(MECAB_PATH_ENV) {
            return Self::load(PathBuf::from(path));
        }
        Self::load_default()
    }

    /// Returns the MeCab version string. No tagger is needed.
    pub fn version(&self) -> Result<String> {
        let pointer = unsafe { (self.inner.api.mecab_version)() };
        if pointer.is_null() {
            return Err(MecabError::LibraryLoad(
                "mecab_version returned a null pointer".to_string(),
            ));
        }
        Ok(cstr_to_string(pointer))
    }

    /// Path the library was loaded from, when known.
    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }

    fn from_library(library: DynamicLibrary, path: Option<PathBuf>) -> Result<Self> {
        let api = unsafe { MecabApi::load(&library)? };
        Ok(Self {
            inner: Arc::new(LoadedLibrary {
                _library: Some(library),
                path,
                api,
            }),
        })
    }

    #[cfg(test)]
    pub(crate) fn from_loaded(inner: Arc<LoadedLibrary>) -> Self {
        Self { inner }
    }
}

/// High-level MeCab tagger.
///
/// Owns one native tagger for its whole lifetime. The tagger is released
/// when the value is dropped, or earlier through [`Mecab::destroy`].
///
/// Parse methods take `&mut self`: MeCab reuses its result memory on every
/// call, and a tagger must never be entered twice at once. Share one across
/// threads with a `Mutex<Mecab>`, or create one per thread.
///
/// # Examples
/// ```no_run
/// use mecab_rs::{Mecab, TaggerConfig};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut mecab = Mecab::new(TaggerConfig::default().with_node_format("%m\\t%f[0]\\n"))?;
/// for node in mecab.parse_records("東京都に住む")? {
///     println!("{}\t{}", node.surface, node.feature);
/// }
/// # Ok(())
/// # }
/// ```
pub struct Mecab {
    handle: TaggerHandle,
    options: TaggerConfig,
    option_string: String,
    mode: ParseMode,
    features: FeatureSource,
    dictionaries: Vec<DictionaryInfo>,
    version: String,
}

impl Mecab {
    /// Creates a tagger with the given options, loading MeCab from
    /// `MECAB_PATH` or the default locations.
    pub fn new(options: impl Into<TaggerOptions>) -> Result<Self> {
        Self::from_config(MecabConfig::from_env().with_options(options))
    }

    /// Creates a tagger from a full [`MecabConfig`].
    pub fn from_config(config: MecabConfig) -> Result<Self> {
        // Options are checked before the library is even loaded.
        let effective = config.options.effective_config()?;
        let library = match config.library_path {
            Some(path) => MecabLibrary::load(path)?,
            None => MecabLibrary::load_from_env_or_default()?,
        };
        Self::build(&library, &config.options, effective, config.feature_extraction)
    }

    /// Creates a tagger on an already loaded library.
    pub fn with_library(library: &MecabLibrary, options: impl Into<TaggerOptions>) -> Result<Self> {
        let options = options.into();
        let effective = options.effective_config()?;
        Self::build(library, &options, effective, None)
    }

    /// Creates a tagger on an already loaded library from a full
    /// [`MecabConfig`]. `config.library_path` is ignored.
    pub fn with_library_and_config(library: &MecabLibrary, config: MecabConfig) -> Result<Self> {
        let effective = config.options.effective_config()?;
        Self::build(library, &config.options, effective, config.feature_extraction)
    }

    fn build(
        library: &MecabLibrary,
        options: &TaggerOptions,
        effective: TaggerConfig,
        feature_extraction: Option<bool>,
    ) -> Result<Self> {
        let resolved = effective.resolved();
        let option_string = options.to_option_string();

        let mut handle = TaggerHandle::construct(library.inner.clone(), &option_string)?;
        handle.apply_scalar_options(&resolved)?;

        let dictionaries = unsafe { collect_dictionaries(handle.dictionary_info()?) };
        let version = library.version()?;
        let mode = ParseMode::for_config(&resolved);
        let features = FeatureSource::resolve(&resolved, feature_extraction);
        log::debug!(
            "MeCab {version} ready: mode={mode:?}, {} dictionaries",
            dictionaries.len()
        );

        Ok(Self {
            handle,
            options: resolved,
            option_string,
            mode,
            features,
            dictionaries,
            version,
        })
    }

    /// Parses `text` into MeCab's own formatted output.
    pub fn parse(&mut self, text: &str) -> Result<String> {
        let input = checked_input(text)?;
        match self.mode {
            ParseMode::SingleBest => self.handle.parse_to_string(input),
            ParseMode::NBest(n) => self.handle.nbest_parse_to_string(n, input),
        }
    }

    /// Parses `text` into morpheme records, sentinels excluded.
    ///
    /// In N-best mode the records of every path are concatenated in rank
    /// order; [`MorphNode::path`] tells them apart.
    pub fn parse_records(&mut self, text: &str) -> Result<Vec<MorphNode>> {
        let mut nodes = Vec::new();
        self.parse_with(text, |node| nodes.push(node))?;
        Ok(nodes)
    }

    /// Streaming form of [`Self::parse_records`]: `visit` receives each
    /// record in order as soon as it is decoded.
    pub fn parse_with<F>(&mut self, text: &str, mut visit: F) -> Result<()>
    where
        F: FnMut(MorphNode),
    {
        let input = checked_input(text)?;
        match self.mode {
            ParseMode::SingleBest => decode_best(&mut self.handle, input, self.features, &mut visit),
            ParseMode::NBest(n) => {
                walk_nbest(&mut self.handle, input, n, self.features, &mut visit).map(|_| ())
            }
        }
    }

    /// Releases the native tagger now. Idempotent; every later parse call
    /// fails with [`MecabError::NotInitialized`].
    pub fn destroy(&mut self) {
        self.handle.destroy();
    }

    /// Whether the native tagger is still alive.
    pub fn is_initialized(&self) -> bool {
        self.handle.is_live()
    }

    /// MeCab version captured at construction.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Dictionaries loaded by the tagger, captured at construction.
    pub fn dictionaries(&self) -> &[DictionaryInfo] {
        &self.dictionaries
    }

    /// Options the tagger runs with, after N-best resolution.
    pub fn options(&self) -> &TaggerConfig {
        &self.options
    }

    /// Option string given to the native constructor.
    pub fn option_string(&self) -> &str {
        &self.option_string
    }

    /// Parse mode selected at construction.
    pub fn mode(&self) -> ParseMode {
        self.mode
    }

    /// Path of the MeCab library backing this tagger, when known.
    pub fn library_path(&self) -> Option<&Path> {
        self.handle.library().path.as_deref()
    }

    /// Last error reported by the native tagger, if any.
    pub fn last_error(&self) -> Option<String> {
        if !self.handle.is_live() {
            return None;
        }
        match self.handle.error("") {
            MecabError::Decoding(message) if !message.is_empty() => Some(message),
            _ => None,
        }
    }
}

impl fmt::Debug for Mecab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mecab")
            .field("library_path", &self.library_path())
            .field("option_string", &self.option_string)
            .field("mode", &self.mode)
            .field("dictionaries", &self.dictionaries)
            .field("version", &self.version)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

/// Rejects input the native tagger cannot see in full. MeCab stops at the
/// first NUL byte.
fn checked_input(text: &str) -> Result<&[u8]> {
    if let Some(position) = text.bytes().position(|byte| byte == 0) {
        return Err(MecabError::InvalidArgument(format!(
            "input contains a NUL byte at offset {position}"
        )));
    }
    Ok(text.as_bytes())
}
