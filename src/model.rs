use crate::config::{MecabDictionaryInfoRaw, MecabNodeRaw};
use crate::constants::{
    MECAB_BOS_NODE, MECAB_EON_NODE, MECAB_EOS_NODE, MECAB_SYS_DIC, MECAB_UNK_DIC, MECAB_UNK_NODE,
    MECAB_USR_DIC,
};
use crate::native::cstr_to_string;

/// Status of a result node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStat {
    /// Word found in a dictionary.
    Normal,
    /// Unknown word.
    Unknown,
    /// Beginning-of-sentence sentinel.
    Bos,
    /// End-of-sentence sentinel.
    Eos,
    /// End-of-N-best sentinel.
    Eon,
}

impl NodeStat {
    pub(crate) fn from_raw(stat: u8) -> Self {
        match stat {
            MECAB_UNK_NODE => NodeStat::Unknown,
            MECAB_BOS_NODE => NodeStat::Bos,
            MECAB_EOS_NODE => NodeStat::Eos,
            MECAB_EON_NODE => NodeStat::Eon,
            _ => NodeStat::Normal,
        }
    }

    /// Whether this is a BOS/EOS/EON sentinel rather than a morpheme.
    pub fn is_boundary(self) -> bool {
        matches!(self, NodeStat::Bos | NodeStat::Eos | NodeStat::Eon)
    }
}

/// One decoded morpheme.
///
/// Every field is copied out of native memory during decoding, so a
/// `MorphNode` stays valid after later calls into the tagger.
#[derive(Debug, Clone, PartialEq)]
pub struct MorphNode {
    /// Exact slice of the input this node covers.
    pub surface: String,
    /// Feature string. Empty unless feature extraction is enabled.
    pub feature: String,
    /// Surface length in bytes.
    pub length: usize,
    /// Surface length in bytes including leading whitespace.
    pub rlength: usize,
    /// Node status.
    pub stat: NodeStat,
    /// Zero-based N-best path this node was emitted from.
    pub path: usize,
    /// Node id assigned by the tagger.
    pub id: u32,
    /// Right context attribute.
    pub rc_attr: u16,
    /// Left context attribute.
    pub lc_attr: u16,
    /// Part-of-speech id.
    pub posid: u16,
    /// Character type.
    pub char_type: u8,
    /// Whether the node lies on the best path.
    pub is_best: bool,
    /// Forward accumulative log summation (marginal mode).
    pub alpha: f32,
    /// Backward accumulative log summation (marginal mode).
    pub beta: f32,
    /// Marginal probability (marginal mode).
    pub prob: f32,
    /// Word cost.
    pub wcost: i16,
    /// Best accumulative cost from the BOS node.
    pub cost: i64,
}

impl MorphNode {
    /// Copies the plain fields of `raw`. Surface and feature are filled in
    /// by the decoder.
    pub(crate) fn from_raw(raw: &MecabNodeRaw, path: usize) -> Self {
        Self {
            surface: String::new(),
            feature: String::new(),
            length: usize::from(raw.length),
            rlength: usize::from(raw.rlength),
            stat: NodeStat::from_raw(raw.stat),
            path,
            id: raw.id,
            rc_attr: raw.rc_attr,
            lc_attr: raw.lc_attr,
            posid: raw.posid,
            char_type: raw.char_type,
            is_best: raw.isbest == 1,
            alpha: raw.alpha,
            beta: raw.beta,
            prob: raw.prob,
            wcost: raw.wcost,
            cost: i64::from(raw.cost),
        }
    }

    /// Whether this node is a dictionary word.
    pub fn is_normal(&self) -> bool {
        self.stat == NodeStat::Normal
    }

    /// Whether this node is an unknown word.
    pub fn is_unknown(&self) -> bool {
        self.stat == NodeStat::Unknown
    }
}

/// Kind of a loaded dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictionaryType {
    /// System dictionary.
    System,
    /// User dictionary.
    User,
    /// Unknown-word dictionary.
    Unknown,
    /// Type code not known to this crate.
    Other(i32),
}

impl From<i32> for DictionaryType {
    fn from(value: i32) -> Self {
        match value {
            MECAB_SYS_DIC => DictionaryType::System,
            MECAB_USR_DIC => DictionaryType::User,
            MECAB_UNK_DIC => DictionaryType::Unknown,
            other => DictionaryType::Other(other),
        }
    }
}

/// Metadata of one dictionary loaded by the tagger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryInfo {
    /// Dictionary type.
    pub dict_type: DictionaryType,
    /// Path of the dictionary file.
    pub filename: String,
    /// Character set of the dictionary.
    pub charset: String,
    /// Number of words.
    pub size: u32,
    /// Left attribute size.
    pub lsize: u32,
    /// Right attribute size.
    pub rsize: u32,
    /// Dictionary format version.
    pub version: u16,
}

impl DictionaryInfo {
    /// Whether this is the system dictionary.
    pub fn is_system(&self) -> bool {
        self.dict_type == DictionaryType::System
    }

    /// Whether this is a user dictionary.
    pub fn is_user(&self) -> bool {
        self.dict_type == DictionaryType::User
    }
}

impl From<&MecabDictionaryInfoRaw> for DictionaryInfo {
    fn from(value: &MecabDictionaryInfoRaw) -> Self {
        Self {
            dict_type: DictionaryType::from(value.dict_type),
            filename: cstr_to_string(value.filename),
            charset: cstr_to_string(value.charset),
            size: value.size,
            lsize: value.lsize,
            rsize: value.rsize,
            version: value.version,
        }
    }
}
