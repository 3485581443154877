//! Decoding of native result chains into owned [`MorphNode`] records.
//!
//! MeCab nodes point into the caller's input buffer instead of carrying
//! their own text, and the memory behind them is reused by the next call on
//! the same tagger. The walkers here copy everything out in one pass.

use crate::config::MecabNodeRaw;
use crate::error::{MecabError, Result};
use crate::handle::TaggerHandle;
use crate::model::MorphNode;
use crate::native::cstr_to_string;
use crate::types::FeatureSource;

/// Bytes MeCab treats as padding between tokens.
fn is_padding(byte: u8) -> bool {
    byte == b'\n' || byte == b' '
}

pub(crate) struct ResultDecoder<'a> {
    input: &'a [u8],
    features: FeatureSource,
    tagger: Option<&'a TaggerHandle>,
}

impl<'a> ResultDecoder<'a> {
    pub(crate) fn new(input: &'a [u8], features: FeatureSource) -> Self {
        Self {
            input,
            features,
            tagger: None,
        }
    }

    /// Tagger used for [`FeatureSource::Formatted`].
    pub(crate) fn with_tagger(mut self, tagger: &'a TaggerHandle) -> Self {
        self.tagger = Some(tagger);
        self
    }

    /// Walks the chain starting at `head` until a null `next`, emitting
    /// every non-sentinel node in chain order.
    ///
    /// # Safety
    /// `head` must be null or the head of a well-formed node chain that
    /// stays valid for the duration of the call.
    pub(crate) unsafe fn decode<F>(
        &self,
        head: *const MecabNodeRaw,
        path: usize,
        visit: &mut F,
    ) -> Result<()>
    where
        F: FnMut(MorphNode),
    {
        let mut cursor = 0usize;
        let mut node = head;

        while !node.is_null() {
            let raw = &*node;
            let mut record = MorphNode::from_raw(raw, path);

            if !record.stat.is_boundary() {
                while cursor < self.input.len() && is_padding(self.input[cursor]) {
                    cursor += 1;
                }

                let remaining = self.input.len() - cursor;
                if record.length > remaining {
                    return Err(MecabError::Decoding(format!(
                        "node length {} exceeds the {} input bytes left at offset {}",
                        record.length, remaining, cursor
                    )));
                }
                if remaining > 0 {
                    let end = cursor + record.length;
                    record.surface = String::from_utf8_lossy(&self.input[cursor..end]).into_owned();
                    cursor = end;
                }

                record.feature = self.feature(node)?;
                visit(record);
            }

            node = raw.next;
        }

        Ok(())
    }

    fn feature(&self, node: *const MecabNodeRaw) -> Result<String> {
        match self.features {
            FeatureSource::Skip => Ok(String::new()),
            FeatureSource::Raw => Ok(cstr_to_string(unsafe { (*node).feature })),
            FeatureSource::Formatted => self
                .tagger
                .ok_or(MecabError::NotInitialized)?
                .format_node(node),
        }
    }
}

/// Single-best parse of `input`.
pub(crate) fn decode_best<F>(
    tagger: &mut TaggerHandle,
    input: &[u8],
    features: FeatureSource,
    visit: &mut F,
) -> Result<()>
where
    F: FnMut(MorphNode),
{
    let head = tagger.parse_to_node(input)?;
    let decoder = ResultDecoder::new(input, features).with_tagger(tagger);
    unsafe { decoder.decode(head, 0, visit) }
}

/// Decodes up to `n` best paths of `input`, in native rank order.
///
/// Each path is decoded with a fresh cursor over the whole input. When the
/// lattice runs out before `n` paths, the walk stops early and the number
/// of decoded paths is returned.
pub(crate) fn walk_nbest<F>(
    tagger: &mut TaggerHandle,
    input: &[u8],
    n: usize,
    features: FeatureSource,
    visit: &mut F,
) -> Result<usize>
where
    F: FnMut(MorphNode),
{
    tagger.nbest_init(input)?;

    for path in 0..n {
        let head = tagger.nbest_next()?;
        if head.is_null() {
            if path == 0 {
                return Err(tagger.error("mecab_nbest_next_tonode returned a null node"));
            }
            log::debug!("lattice exhausted after {path} of {n} requested paths");
            return Ok(path);
        }

        let decoder = ResultDecoder::new(input, features).with_tagger(tagger);
        unsafe { decoder.decode(head, path, visit)? };
    }

    Ok(n)
}
