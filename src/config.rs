use std::os::raw::{c_char, c_float, c_int, c_long, c_short, c_uchar, c_uint, c_ushort, c_void};

pub(crate) type MecabHandle = *mut c_void;

/// Layout of `mecab_node_t`.
#[repr(C)]
#[derive(Clone, Copy)]
pub(crate) struct MecabNodeRaw {
    pub(crate) prev: *mut MecabNodeRaw,
    pub(crate) next: *mut MecabNodeRaw,
    pub(crate) enext: *mut MecabNodeRaw,
    pub(crate) bnext: *mut MecabNodeRaw,
    pub(crate) rpath: *mut c_void,
    pub(crate) lpath: *mut c_void,
    pub(crate) surface: *const c_char,
    pub(crate) feature: *const c_char,
    pub(crate) id: c_uint,
    pub(crate) length: c_ushort,
    pub(crate) rlength: c_ushort,
    pub(crate) rc_attr: c_ushort,
    pub(crate) lc_attr: c_ushort,
    pub(crate) posid: c_ushort,
    pub(crate) char_type: c_uchar,
    pub(crate) stat: c_uchar,
    pub(crate) isbest: c_uchar,
    pub(crate) alpha: c_float,
    pub(crate) beta: c_float,
    pub(crate) prob: c_float,
    pub(crate) wcost: c_short,
    pub(crate) cost: c_long,
}

/// Layout of `mecab_dictionary_info_t`.
#[repr(C)]
#[derive(Clone, Copy)]
pub(crate) struct MecabDictionaryInfoRaw {
    pub(crate) filename: *const c_char,
    pub(crate) charset: *const c_char,
    pub(crate) size: c_uint,
    pub(crate) dict_type: c_int,
    pub(crate) lsize: c_uint,
    pub(crate) rsize: c_uint,
    pub(crate) version: c_ushort,
    pub(crate) next: *mut MecabDictionaryInfoRaw,
}
