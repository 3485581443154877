//! Translation of structured tagger options into MeCab's command-line form.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::constants::{MECAB_LATTICE_LEVEL_MARGINAL, MECAB_NBEST_MAX};
use crate::error::{MecabError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OptionKind {
    Text,
    Path,
    Int,
    Float,
    Flag,
}

#[derive(Debug, Clone, Copy)]
struct OptionSpec {
    key: &'static str,
    long: &'static str,
    short: char,
    kind: OptionKind,
}

const fn spec(key: &'static str, long: &'static str, short: char, kind: OptionKind) -> OptionSpec {
    OptionSpec {
        key,
        long,
        short,
        kind,
    }
}

/// Recognized options, in the order they are emitted.
const OPTION_SPECS: [OptionSpec; 20] = [
    spec("rcfile", "rcfile", 'r', OptionKind::Path),
    spec("dicdir", "dicdir", 'd', OptionKind::Path),
    spec("userdic", "userdic", 'u', OptionKind::Path),
    spec("lattice_level", "lattice-level", 'l', OptionKind::Int),
    spec("output_format_type", "output-format-type", 'O', OptionKind::Text),
    spec("all_morphs", "all-morphs", 'a', OptionKind::Flag),
    spec("nbest", "nbest", 'N', OptionKind::Int),
    spec("partial", "partial", 'p', OptionKind::Flag),
    spec("marginal", "marginal", 'm', OptionKind::Flag),
    spec("max_grouping_size", "max-grouping-size", 'M', OptionKind::Int),
    spec("node_format", "node-format", 'F', OptionKind::Text),
    spec("unk_format", "unk-format", 'U', OptionKind::Text),
    spec("bos_format", "bos-format", 'B', OptionKind::Text),
    spec("eos_format", "eos-format", 'E', OptionKind::Text),
    spec("eon_format", "eon-format", 'S', OptionKind::Text),
    spec("unk_feature", "unk-feature", 'x', OptionKind::Text),
    spec("input_buffer_size", "input-buffer-size", 'b', OptionKind::Int),
    spec("allocate_sentence", "allocate-sentence", 'C', OptionKind::Flag),
    spec("theta", "theta", 't', OptionKind::Float),
    spec("cost_factor", "cost-factor", 'c', OptionKind::Int),
];

fn find_spec(key: &str) -> Option<&'static OptionSpec> {
    let key = key.trim_start_matches('-');
    OPTION_SPECS
        .iter()
        .find(|spec| spec.key == key || spec.long == key)
}

fn find_short_spec(short: char) -> Option<&'static OptionSpec> {
    OPTION_SPECS.iter().find(|spec| spec.short == short)
}

/// Dynamically typed option value used by [`TaggerConfig::from_pairs`].
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    /// Text, path, or a number/flag spelled as text.
    Str(String),
    /// Integer value.
    Int(i64),
    /// Floating-point value.
    Float(f64),
    /// Boolean flag.
    Bool(bool),
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Str(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Str(value)
    }
}

impl From<&Path> for OptionValue {
    fn from(value: &Path) -> Self {
        OptionValue::Str(value.to_string_lossy().to_string())
    }
}

impl From<i32> for OptionValue {
    fn from(value: i32) -> Self {
        OptionValue::Int(i64::from(value))
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Int(value)
    }
}

impl From<usize> for OptionValue {
    fn from(value: usize) -> Self {
        OptionValue::Int(value as i64)
    }
}

impl From<f32> for OptionValue {
    fn from(value: f32) -> Self {
        OptionValue::Float(f64::from(value))
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        OptionValue::Float(value)
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Str(value) => write!(f, "{value}"),
            OptionValue::Int(value) => write!(f, "{value}"),
            OptionValue::Float(value) => write!(f, "{value}"),
            OptionValue::Bool(value) => write!(f, "{value}"),
        }
    }
}

/// Structured MeCab tagger options.
///
/// Every field is optional; absent fields are left to MeCab's own defaults
/// and never appear in [`Self::to_option_string`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaggerConfig {
    /// `--rcfile`: resource file.
    pub rcfile: Option<PathBuf>,
    /// `--dicdir`: system dictionary directory.
    pub dicdir: Option<PathBuf>,
    /// `--userdic`: user dictionary.
    pub userdic: Option<PathBuf>,
    /// `--lattice-level`: 0 (best), 1 (N-best) or 2 (marginal).
    pub lattice_level: Option<i32>,
    /// `--output-format-type`, e.g. `wakati` or `chasen`.
    pub output_format_type: Option<String>,
    /// `--all-morphs`: output all morphemes.
    pub all_morphs: bool,
    /// `--nbest`: number of best paths, 1 to 512.
    pub nbest: Option<usize>,
    /// `--partial`: partial parsing mode.
    pub partial: bool,
    /// `--marginal`: output marginal probabilities.
    pub marginal: bool,
    /// `--max-grouping-size` for unknown words.
    pub max_grouping_size: Option<i32>,
    /// `--node-format`.
    pub node_format: Option<String>,
    /// `--unk-format`.
    pub unk_format: Option<String>,
    /// `--bos-format`.
    pub bos_format: Option<String>,
    /// `--eos-format`.
    pub eos_format: Option<String>,
    /// `--eon-format`.
    pub eon_format: Option<String>,
    /// `--unk-feature`: feature used for unknown words.
    pub unk_feature: Option<String>,
    /// `--input-buffer-size`.
    pub input_buffer_size: Option<usize>,
    /// `--allocate-sentence`.
    pub allocate_sentence: bool,
    /// `--theta`: temperature for soft-max probabilities.
    pub theta: Option<f32>,
    /// `--cost-factor`.
    pub cost_factor: Option<i32>,
}

impl TaggerConfig {
    /// Builds a config from `(key, value)` pairs.
    ///
    /// Keys may use the snake-case name (`node_format`) or the long option
    /// name (`node-format`, `--node-format`). Unrecognized keys and values of
    /// the wrong shape are rejected with [`MecabError::Configuration`].
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<OptionValue>,
    {
        let mut config = Self::default();
        for (key, value) in pairs {
            config.set(key.as_ref(), value.into())?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Parses MeCab command-line syntax (`--nbest=2`, `-N 2`, `-N2`, `-a`).
    ///
    /// Unknown options and stray arguments are rejected.
    pub fn from_args(args: &str) -> Result<Self> {
        let config = parse_args(args, true)?;
        config.validate()?;
        Ok(config)
    }

    /// Lenient variant of [`Self::from_args`] used to inspect raw option
    /// strings: unknown options are skipped.
    pub(crate) fn scan_args(args: &str) -> Self {
        match parse_args(args, false) {
            Ok(config) => config,
            Err(error) => {
                log::debug!("could not inspect raw options \"{args}\": {error}");
                Self::default()
            }
        }
    }

    /// Sets one option by key.
    pub fn set(&mut self, key: &str, value: OptionValue) -> Result<()> {
        let spec = find_spec(key)
            .ok_or_else(|| MecabError::Configuration(format!("unrecognized option: {key}")))?;
        match spec.kind {
            OptionKind::Text => {
                let text = coerce_text(spec, value)?;
                match spec.key {
                    "output_format_type" => self.output_format_type = Some(text),
                    "node_format" => self.node_format = Some(text),
                    "unk_format" => self.unk_format = Some(text),
                    "bos_format" => self.bos_format = Some(text),
                    "eos_format" => self.eos_format = Some(text),
                    "eon_format" => self.eon_format = Some(text),
                    _ => self.unk_feature = Some(text),
                }
            }
            OptionKind::Path => {
                let path = PathBuf::from(coerce_text(spec, value)?);
                match spec.key {
                    "rcfile" => self.rcfile = Some(path),
                    "dicdir" => self.dicdir = Some(path),
                    _ => self.userdic = Some(path),
                }
            }
            OptionKind::Int => {
                let number = coerce_int(spec, value)?;
                match spec.key {
                    "lattice_level" => self.lattice_level = Some(narrow(spec, number)?),
                    "nbest" => self.nbest = Some(narrow(spec, number)?),
                    "max_grouping_size" => self.max_grouping_size = Some(narrow(spec, number)?),
                    "input_buffer_size" => self.input_buffer_size = Some(narrow(spec, number)?),
                    _ => self.cost_factor = Some(narrow(spec, number)?),
                }
            }
            OptionKind::Float => self.theta = Some(coerce_float(spec, value)? as f32),
            OptionKind::Flag => {
                let flag = coerce_flag(spec, value)?;
                match spec.key {
                    "all_morphs" => self.all_morphs = flag,
                    "partial" => self.partial = flag,
                    "marginal" => self.marginal = flag,
                    _ => self.allocate_sentence = flag,
                }
            }
        }
        Ok(())
    }

    /// Checks value ranges. Called before any native call.
    pub fn validate(&self) -> Result<()> {
        if let Some(level) = self.lattice_level {
            if !(0..=MECAB_LATTICE_LEVEL_MARGINAL).contains(&level) {
                return Err(MecabError::Configuration(format!(
                    "lattice_level must be between 0 and {MECAB_LATTICE_LEVEL_MARGINAL}, got {level}"
                )));
            }
        }
        if let Some(nbest) = self.nbest {
            if !(1..=MECAB_NBEST_MAX).contains(&nbest) {
                return Err(MecabError::Configuration(format!(
                    "nbest must be between 1 and {MECAB_NBEST_MAX}, got {nbest}"
                )));
            }
        }
        if let Some(size) = self.max_grouping_size {
            if size < 0 {
                return Err(MecabError::Configuration(format!(
                    "max_grouping_size must be >= 0, got {size}"
                )));
            }
        }
        if self.input_buffer_size == Some(0) {
            return Err(MecabError::Configuration(
                "input_buffer_size must be > 0".to_string(),
            ));
        }
        if let Some(theta) = self.theta {
            if !theta.is_finite() {
                return Err(MecabError::Configuration(format!(
                    "theta must be a finite number, got {theta}"
                )));
            }
        }
        self.check_whitespace()
    }

    /// MeCab splits its option string on whitespace with no quoting, so a
    /// value containing a blank would be cut short.
    fn check_whitespace(&self) -> Result<()> {
        let paths = [
            ("rcfile", &self.rcfile),
            ("dicdir", &self.dicdir),
            ("userdic", &self.userdic),
        ];
        for (key, path) in paths {
            if let Some(text) = path_text(path) {
                reject_whitespace(key, &text)?;
            }
        }

        let texts = [
            ("output_format_type", &self.output_format_type),
            ("node_format", &self.node_format),
            ("unk_format", &self.unk_format),
            ("bos_format", &self.bos_format),
            ("eos_format", &self.eos_format),
            ("eon_format", &self.eon_format),
            ("unk_feature", &self.unk_feature),
        ];
        for (key, text) in texts {
            if let Some(text) = text {
                reject_whitespace(key, text)?;
            }
        }
        Ok(())
    }

    /// Returns a copy with the N-best lattice invariant applied: when
    /// `nbest > 1`, the lattice level is raised to at least 1.
    pub fn resolved(&self) -> Self {
        let mut config = self.clone();
        if config.nbest.unwrap_or(1) > 1 && config.lattice_level.unwrap_or(0) < 1 {
            log::debug!(
                "nbest={} requires a lattice; raising lattice_level from {:?} to 1",
                config.nbest.unwrap_or(1),
                config.lattice_level
            );
            config.lattice_level = Some(1);
        }
        config
    }

    /// Whether per-node features are formatted by the tagger.
    pub fn has_output_format(&self) -> bool {
        self.output_format_type.is_some() || self.node_format.is_some()
    }

    /// Renders the options as MeCab's long-form option string.
    pub fn to_option_string(&self) -> String {
        OPTION_SPECS
            .iter()
            .filter_map(|spec| self.render(spec))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn render(&self, spec: &OptionSpec) -> Option<String> {
        let value = match spec.key {
            "rcfile" => path_text(&self.rcfile),
            "dicdir" => path_text(&self.dicdir),
            "userdic" => path_text(&self.userdic),
            "lattice_level" => self.lattice_level.map(|value| value.to_string()),
            "output_format_type" => self.output_format_type.clone(),
            "all_morphs" => return flag_token(spec, self.all_morphs),
            "nbest" => self.nbest.map(|value| value.to_string()),
            "partial" => return flag_token(spec, self.partial),
            "marginal" => return flag_token(spec, self.marginal),
            "max_grouping_size" => self.max_grouping_size.map(|value| value.to_string()),
            "node_format" => self.node_format.clone(),
            "unk_format" => self.unk_format.clone(),
            "bos_format" => self.bos_format.clone(),
            "eos_format" => self.eos_format.clone(),
            "eon_format" => self.eon_format.clone(),
            "unk_feature" => self.unk_feature.clone(),
            "input_buffer_size" => self.input_buffer_size.map(|value| value.to_string()),
            "allocate_sentence" => return flag_token(spec, self.allocate_sentence),
            "theta" => self.theta.map(|value| value.to_string()),
            "cost_factor" => self.cost_factor.map(|value| value.to_string()),
            _ => None,
        }?;
        Some(format!("--{}={}", spec.long, value))
    }

    /// Sets `rcfile`.
    pub fn with_rcfile(mut self, rcfile: impl AsRef<Path>) -> Self {
        self.rcfile = Some(rcfile.as_ref().to_path_buf());
        self
    }

    /// Sets `dicdir`.
    pub fn with_dicdir(mut self, dicdir: impl AsRef<Path>) -> Self {
        self.dicdir = Some(dicdir.as_ref().to_path_buf());
        self
    }

    /// Sets `userdic`.
    pub fn with_userdic(mut self, userdic: impl AsRef<Path>) -> Self {
        self.userdic = Some(userdic.as_ref().to_path_buf());
        self
    }

    /// Sets `lattice_level`.
    pub fn with_lattice_level(mut self, lattice_level: i32) -> Self {
        self.lattice_level = Some(lattice_level);
        self
    }

    /// Sets `output_format_type`.
    pub fn with_output_format_type(mut self, output_format_type: impl Into<String>) -> Self {
        self.output_format_type = Some(output_format_type.into());
        self
    }

    /// Sets `all_morphs`.
    pub fn with_all_morphs(mut self, all_morphs: bool) -> Self {
        self.all_morphs = all_morphs;
        self
    }

    /// Sets `nbest`.
    pub fn with_nbest(mut self, nbest: usize) -> Self {
        self.nbest = Some(nbest);
        self
    }

    /// Sets `partial`.
    pub fn with_partial(mut self, partial: bool) -> Self {
        self.partial = partial;
        self
    }

    /// Sets `marginal`.
    pub fn with_marginal(mut self, marginal: bool) -> Self {
        self.marginal = marginal;
        self
    }

    /// Sets `max_grouping_size`.
    pub fn with_max_grouping_size(mut self, max_grouping_size: i32) -> Self {
        self.max_grouping_size = Some(max_grouping_size);
        self
    }

    /// Sets `node_format`.
    pub fn with_node_format(mut self, node_format: impl Into<String>) -> Self {
        self.node_format = Some(node_format.into());
        self
    }

    /// Sets `unk_format`.
    pub fn with_unk_format(mut self, unk_format: impl Into<String>) -> Self {
        self.unk_format = Some(unk_format.into());
        self
    }

    /// Sets `bos_format`.
    pub fn with_bos_format(mut self, bos_format: impl Into<String>) -> Self {
        self.bos_format = Some(bos_format.into());
        self
    }

    /// Sets `eos_format`.
    pub fn with_eos_format(mut self, eos_format: impl Into<String>) -> Self {
        self.eos_format = Some(eos_format.into());
        self
    }

    /// Sets `eon_format`.
    pub fn with_eon_format(mut self, eon_format: impl Into<String>) -> Self {
        self.eon_format = Some(eon_format.into());
        self
    }

    /// Sets `unk_feature`.
    pub fn with_unk_feature(mut self, unk_feature: impl Into<String>) -> Self {
        self.unk_feature = Some(unk_feature.into());
        self
    }

    /// Sets `input_buffer_size`.
    pub fn with_input_buffer_size(mut self, input_buffer_size: usize) -> Self {
        self.input_buffer_size = Some(input_buffer_size);
        self
    }

    /// Sets `allocate_sentence`.
    pub fn with_allocate_sentence(mut self, allocate_sentence: bool) -> Self {
        self.allocate_sentence = allocate_sentence;
        self
    }

    /// Sets `theta`.
    pub fn with_theta(mut self, theta: f32) -> Self {
        self.theta = Some(theta);
        self
    }

    /// Sets `cost_factor`.
    pub fn with_cost_factor(mut self, cost_factor: i32) -> Self {
        self.cost_factor = Some(cost_factor);
        self
    }
}

/// Options handed to the tagger constructor: either structured, or a raw
/// command-line string passed through unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum TaggerOptions {
    /// Structured options, validated and rendered to long form.
    Config(TaggerConfig),
    /// Native command-line syntax, used verbatim.
    Raw(String),
}

impl Default for TaggerOptions {
    fn default() -> Self {
        TaggerOptions::Config(TaggerConfig::default())
    }
}

impl From<TaggerConfig> for TaggerOptions {
    fn from(value: TaggerConfig) -> Self {
        TaggerOptions::Config(value)
    }
}

impl From<&str> for TaggerOptions {
    fn from(value: &str) -> Self {
        TaggerOptions::Raw(value.to_string())
    }
}

impl From<String> for TaggerOptions {
    fn from(value: String) -> Self {
        TaggerOptions::Raw(value)
    }
}

impl TaggerOptions {
    /// Produces the string given to `mecab_new2`.
    pub fn to_option_string(&self) -> String {
        match self {
            TaggerOptions::Config(config) => config.to_option_string(),
            TaggerOptions::Raw(raw) => raw.clone(),
        }
    }

    /// Validates structured options and returns the config the tagger
    /// runs with, before N-best resolution.
    pub(crate) fn effective_config(&self) -> Result<TaggerConfig> {
        match self {
            TaggerOptions::Config(config) => {
                config.validate()?;
                Ok(config.clone())
            }
            TaggerOptions::Raw(raw) => Ok(TaggerConfig::scan_args(raw)),
        }
    }
}

fn path_text(path: &Option<PathBuf>) -> Option<String> {
    path.as_ref().map(|path| path.to_string_lossy().to_string())
}

fn reject_whitespace(key: &str, value: &str) -> Result<()> {
    if value.chars().any(|c| c.is_ascii_whitespace()) {
        return Err(MecabError::Configuration(format!(
            "option {key} cannot contain whitespace, got {value:?}; \
             write a space in formats as \\s"
        )));
    }
    Ok(())
}

fn flag_token(spec: &OptionSpec, enabled: bool) -> Option<String> {
    enabled.then(|| format!("--{}", spec.long))
}

fn shape_error(spec: &OptionSpec, expected: &str, value: &OptionValue) -> MecabError {
    MecabError::Configuration(format!(
        "option {} expects {expected}, got {value:?}",
        spec.key
    ))
}

fn coerce_text(spec: &OptionSpec, value: OptionValue) -> Result<String> {
    match value {
        OptionValue::Str(text) => Ok(text),
        other => Err(shape_error(spec, "a string", &other)),
    }
}

fn coerce_int(spec: &OptionSpec, value: OptionValue) -> Result<i64> {
    match value {
        OptionValue::Int(number) => Ok(number),
        OptionValue::Str(ref text) => text
            .trim()
            .parse::<i64>()
            .map_err(|_| shape_error(spec, "an integer", &value)),
        other => Err(shape_error(spec, "an integer", &other)),
    }
}

fn narrow<T: TryFrom<i64>>(spec: &OptionSpec, number: i64) -> Result<T> {
    T::try_from(number).map_err(|_| {
        MecabError::Configuration(format!("option {} is out of range: {number}", spec.key))
    })
}

fn coerce_float(spec: &OptionSpec, value: OptionValue) -> Result<f64> {
    match value {
        OptionValue::Float(number) => Ok(number),
        OptionValue::Int(number) => Ok(number as f64),
        OptionValue::Str(ref text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| shape_error(spec, "a number", &value)),
        other => Err(shape_error(spec, "a number", &other)),
    }
}

fn coerce_flag(spec: &OptionSpec, value: OptionValue) -> Result<bool> {
    match value {
        OptionValue::Bool(flag) => Ok(flag),
        OptionValue::Str(ref text) => match text.as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(shape_error(spec, "a boolean", &value)),
        },
        other => Err(shape_error(spec, "a boolean", &other)),
    }
}

fn option_token_pattern() -> Result<&'static Regex> {
    static PATTERN: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r"^(?:--(?P<long>[A-Za-z][A-Za-z-]*)(?:=(?P<inline>.*))?|-(?P<short>[A-Za-z])(?P<attached>.*))$",
            )
        })
        .as_ref()
        .map_err(|error| MecabError::Configuration(format!("invalid option pattern: {error}")))
}

fn parse_args(args: &str, strict: bool) -> Result<TaggerConfig> {
    let pattern = option_token_pattern()?;
    let mut config = TaggerConfig::default();
    let mut tokens = args.split_whitespace();

    while let Some(token) = tokens.next() {
        let Some(captures) = pattern.captures(token) else {
            if strict {
                return Err(MecabError::Configuration(format!(
                    "unexpected argument: {token}"
                )));
            }
            continue;
        };

        let (spec, inline) = if let Some(long) = captures.name("long") {
            (
                find_spec(long.as_str()),
                captures.name("inline").map(|value| value.as_str()),
            )
        } else {
            let short = captures
                .name("short")
                .and_then(|value| value.as_str().chars().next());
            let attached = captures
                .name("attached")
                .map(|value| value.as_str())
                .filter(|value| !value.is_empty());
            (short.and_then(find_short_spec), attached)
        };

        let Some(spec) = spec else {
            if strict {
                return Err(MecabError::Configuration(format!(
                    "unrecognized option: {token}"
                )));
            }
            continue;
        };

        let value = if spec.kind == OptionKind::Flag {
            match inline {
                None => OptionValue::Bool(true),
                Some(value) => OptionValue::Str(value.to_string()),
            }
        } else {
            match inline.or_else(|| tokens.next()) {
                Some(value) => OptionValue::Str(value.to_string()),
                None => {
                    return Err(MecabError::Configuration(format!(
                        "option {} requires a value",
                        spec.long
                    )))
                }
            }
        };
        config.set(spec.key, value)?;
    }

    Ok(config)
}
