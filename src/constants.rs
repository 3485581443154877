//! Constants mirrored from the MeCab C API.

/// Node status: normal node defined in the dictionary.
pub const MECAB_NOR_NODE: u8 = 0;
/// Node status: unknown word.
pub const MECAB_UNK_NODE: u8 = 1;
/// Node status: virtual beginning-of-sentence node.
pub const MECAB_BOS_NODE: u8 = 2;
/// Node status: virtual end-of-sentence node.
pub const MECAB_EOS_NODE: u8 = 3;
/// Node status: virtual end-of-N-best node.
pub const MECAB_EON_NODE: u8 = 4;

/// Dictionary type: system dictionary.
pub const MECAB_SYS_DIC: i32 = 0;
/// Dictionary type: user dictionary.
pub const MECAB_USR_DIC: i32 = 1;
/// Dictionary type: unknown-word dictionary.
pub const MECAB_UNK_DIC: i32 = 2;

/// Lattice level: only the best path is kept.
pub const MECAB_LATTICE_LEVEL_BEST: i32 = 0;
/// Lattice level: N-best output.
pub const MECAB_LATTICE_LEVEL_NBEST: i32 = 1;
/// Lattice level: marginal probabilities.
pub const MECAB_LATTICE_LEVEL_MARGINAL: i32 = 2;

/// Largest N accepted by the native N-best search.
pub const MECAB_NBEST_MAX: usize = 512;

/// Environment variable naming an explicit MeCab library path.
pub const MECAB_PATH_ENV: &str = "MECAB_PATH";
