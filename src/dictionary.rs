use crate::config::MecabDictionaryInfoRaw;
use crate::model::DictionaryInfo;

/// Upper bound on the dictionary chain walk. MeCab does not promise an
/// acyclic list, so a malformed chain stops here instead of looping.
pub(crate) const MAX_DICTIONARY_CHAIN: usize = 1024;

/// Copies the `mecab_dictionary_info_t` list starting at `head`.
///
/// # Safety
/// `head` must be null or point to a chain whose elements stay valid for
/// the duration of the call.
pub(crate) unsafe fn collect_dictionaries(
    head: *const MecabDictionaryInfoRaw,
) -> Vec<DictionaryInfo> {
    let mut dictionaries = Vec::new();
    let mut current = head;

    while !current.is_null() {
        if dictionaries.len() == MAX_DICTIONARY_CHAIN {
            log::warn!(
                "dictionary info chain longer than {MAX_DICTIONARY_CHAIN} entries; stopping walk"
            );
            break;
        }
        let info = &*current;
        dictionaries.push(DictionaryInfo::from(info));
        current = info.next;
    }

    dictionaries
}
