use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::env;
use std::ffi::{CStr, CString, OsString};
use std::os::raw::{c_char, c_float, c_int};
use std::ptr;
use std::sync::{Arc, Mutex, OnceLock};

use crate::config::{MecabDictionaryInfoRaw, MecabHandle, MecabNodeRaw};
use crate::constants::{
    MECAB_BOS_NODE, MECAB_EOS_NODE, MECAB_NOR_NODE, MECAB_SYS_DIC, MECAB_UNK_NODE, MECAB_USR_DIC,
};
use crate::native::{LoadedLibrary, MecabApi};

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

fn set_env_var(key: &str, value: &str) {
    #[allow(unused_unsafe)]
    unsafe {
        env::set_var(key, value);
    }
}

fn remove_env_var(key: &str) {
    #[allow(unused_unsafe)]
    unsafe {
        env::remove_var(key);
    }
}

/// Runs a closure with one overridden environment variable.
pub(crate) fn with_env_var<T>(key: &str, value: &str, f: impl FnOnce() -> T) -> T {
    with_env_vars(&[(key, Some(value))], f)
}

/// Runs a closure while holding a global environment lock and applying overrides.
pub(crate) fn with_env_vars<T>(overrides: &[(&str, Option<&str>)], f: impl FnOnce() -> T) -> T {
    let _guard = env_lock()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let backups: Vec<(&str, Option<OsString>)> = overrides
        .iter()
        .map(|(key, _)| (*key, env::var_os(key)))
        .collect();

    for (key, value) in overrides {
        match value {
            Some(value) => set_env_var(key, value),
            None => remove_env_var(key),
        }
    }

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

    for (key, value) in backups.into_iter().rev() {
        match value {
            Some(value) => {
                #[allow(unused_unsafe)]
                unsafe {
                    env::set_var(key, value);
                }
            }
            None => remove_env_var(key),
        }
    }

    match result {
        Ok(result) => result,
        Err(payload) => std::panic::resume_unwind(payload),
    }
}

fn blank_node() -> MecabNodeRaw {
    MecabNodeRaw {
        prev: ptr::null_mut(),
        next: ptr::null_mut(),
        enext: ptr::null_mut(),
        bnext: ptr::null_mut(),
        rpath: ptr::null_mut(),
        lpath: ptr::null_mut(),
        surface: ptr::null(),
        feature: ptr::null(),
        id: 0,
        length: 0,
        rlength: 0,
        rc_attr: 0,
        lc_attr: 0,
        posid: 0,
        char_type: 0,
        stat: MECAB_NOR_NODE,
        isbest: 1,
        alpha: 0.0,
        beta: 0.0,
        prob: 0.0,
        wcost: 0,
        cost: 0,
    }
}

/// A node chain laid out in Rust memory the way MeCab hands it out.
pub(crate) struct NodeChain {
    nodes: Vec<MecabNodeRaw>,
    _features: Vec<CString>,
}

impl NodeChain {
    /// Builds a chain from `(length, stat, feature)` triples.
    pub(crate) fn new<S: AsRef<str>>(parts: &[(u16, u8, S)]) -> Self {
        let features: Vec<CString> = parts
            .iter()
            .map(|(_, _, feature)| {
                CString::new(feature.as_ref()).unwrap_or_else(|_| CString::default())
            })
            .collect();
        let mut nodes: Vec<MecabNodeRaw> = parts
            .iter()
            .zip(&features)
            .enumerate()
            .map(|(index, ((length, stat, _), feature))| MecabNodeRaw {
                id: index as u32,
                length: *length,
                rlength: *length,
                stat: *stat,
                feature: feature.as_ptr(),
                ..blank_node()
            })
            .collect();

        let base = nodes.as_mut_ptr();
        let count = nodes.len();
        for index in 0..count {
            unsafe {
                let node = base.add(index);
                if index + 1 < count {
                    (*node).next = base.add(index + 1);
                }
                if index > 0 {
                    (*node).prev = base.add(index - 1);
                }
            }
        }

        Self {
            nodes,
            _features: features,
        }
    }

    pub(crate) fn head(&self) -> *const MecabNodeRaw {
        if self.nodes.is_empty() {
            ptr::null()
        } else {
            self.nodes.as_ptr()
        }
    }
}

/// Owns a hand-built dictionary-info chain.
pub(crate) struct DictionaryChain {
    infos: Vec<MecabDictionaryInfoRaw>,
    _names: Vec<CString>,
}

impl DictionaryChain {
    /// Builds a chain from `(type, filename)` pairs. With `cyclic`, the last
    /// element links back to the first.
    pub(crate) fn new(entries: &[(i32, &str)], cyclic: bool) -> Self {
        let mut names = Vec::new();
        let charset = CString::new("UTF-8").unwrap_or_default();
        let mut infos: Vec<MecabDictionaryInfoRaw> = entries
            .iter()
            .map(|(dict_type, filename)| {
                let name = CString::new(*filename).unwrap_or_default();
                let info = MecabDictionaryInfoRaw {
                    filename: name.as_ptr(),
                    charset: charset.as_ptr(),
                    size: 100,
                    dict_type: *dict_type,
                    lsize: 1316,
                    rsize: 1316,
                    version: 102,
                    next: ptr::null_mut(),
                };
                names.push(name);
                info
            })
            .collect();
        names.push(charset);

        let base = infos.as_mut_ptr();
        let count = infos.len();
        for index in 0..count {
            unsafe {
                let info = base.add(index);
                if index + 1 < count {
                    (*info).next = base.add(index + 1);
                } else if cyclic {
                    (*info).next = base;
                }
            }
        }

        Self {
            infos,
            _names: names,
        }
    }

    pub(crate) fn head(&self) -> *const MecabDictionaryInfoRaw {
        if self.infos.is_empty() {
            ptr::null()
        } else {
            self.infos.as_ptr()
        }
    }
}

thread_local! {
    static DESTROYED: Cell<usize> = Cell::new(0);
    static LAST_ERROR: RefCell<CString> = RefCell::new(CString::default());
}

/// Number of fake taggers destroyed on the current thread.
pub(crate) fn destroyed_taggers() -> usize {
    DESTROYED.with(Cell::get)
}

/// Chunk sizes (in characters) of the paths the fake lattice yields.
const FAKE_PATH_CHUNKS: [usize; 3] = [2, 1, 3];

/// In-process stand-in for `mecab_t`.
///
/// Segments each whitespace-separated word into fixed-size character
/// chunks; N-best path `k` uses chunk size `FAKE_PATH_CHUNKS[k]`.
pub(crate) struct FakeTagger {
    pub(crate) options: String,
    pub(crate) theta: Option<f32>,
    pub(crate) lattice_level: Option<i32>,
    pub(crate) all_morphs: bool,
    pub(crate) partial: bool,
    input: Vec<u8>,
    chain: Option<NodeChain>,
    pending_paths: VecDeque<usize>,
    output: CString,
    formatted: CString,
    error: CString,
    dictionaries: DictionaryChain,
}

impl FakeTagger {
    /// # Safety
    /// `handle` must come from the fake `mecab_new2` and still be live.
    pub(crate) unsafe fn from_handle<'a>(handle: MecabHandle) -> &'a FakeTagger {
        &*(handle as *const FakeTagger)
    }

    fn segment(&self, chunk: usize) -> Vec<(u16, u8, String)> {
        let text = String::from_utf8_lossy(&self.input);
        let mut parts = vec![(0u16, MECAB_BOS_NODE, "BOS/EOS".to_string())];
        for word in text.split(|c| c == ' ' || c == '\n') {
            let chars: Vec<char> = word.chars().collect();
            for group in chars.chunks(chunk) {
                let length: usize = group.iter().map(|c| c.len_utf8()).sum();
                let (stat, feature) = if group.iter().all(char::is_ascii) {
                    (MECAB_UNK_NODE, "名詞,固有名詞,*")
                } else {
                    (MECAB_NOR_NODE, "名詞,一般,*")
                };
                parts.push((length as u16, stat, feature.to_string()));
            }
        }
        parts.push((0, MECAB_EOS_NODE, "BOS/EOS".to_string()));
        parts
    }

    fn render(&self, chunk: usize) -> String {
        let text = String::from_utf8_lossy(&self.input).to_string();
        let mut out = String::new();
        let mut cursor = 0usize;
        let bytes = text.as_bytes();
        for (length, stat, feature) in self.segment(chunk) {
            if stat == MECAB_BOS_NODE || stat == MECAB_EOS_NODE {
                continue;
            }
            while cursor < bytes.len() && (bytes[cursor] == b' ' || bytes[cursor] == b'\n') {
                cursor += 1;
            }
            let end = cursor + usize::from(length);
            out.push_str(&text[cursor..end]);
            out.push('\t');
            out.push_str(&feature);
            out.push('\n');
            cursor = end;
        }
        out.push_str("EOS\n");
        out
    }

    fn load(&mut self, input: *const c_char, len: usize) -> bool {
        let bytes = if input.is_null() || len == 0 {
            Vec::new()
        } else {
            unsafe { std::slice::from_raw_parts(input as *const u8, len) }.to_vec()
        };
        if bytes.first() == Some(&0x07) {
            self.error = CString::new("fake tagger rejected input").unwrap_or_default();
            return false;
        }
        self.input = bytes;
        true
    }
}

unsafe fn fake<'a>(handle: MecabHandle) -> &'a mut FakeTagger {
    &mut *(handle as *mut FakeTagger)
}

unsafe extern "C" fn fake_new2(options: *const c_char) -> MecabHandle {
    let options = CStr::from_ptr(options).to_string_lossy().to_string();
    if options.contains("/nonexistent") {
        LAST_ERROR.with(|error| {
            *error.borrow_mut() =
                CString::new(format!("no such dictionary: {options}")).unwrap_or_default();
        });
        return ptr::null_mut();
    }
    let mut dictionaries = vec![(MECAB_SYS_DIC, "/fake/sys.dic")];
    if options.contains("userdic") {
        dictionaries.push((MECAB_USR_DIC, "/fake/user.dic"));
    }
    let tagger = Box::new(FakeTagger {
        options,
        theta: None,
        lattice_level: None,
        all_morphs: false,
        partial: false,
        input: Vec::new(),
        chain: None,
        pending_paths: VecDeque::new(),
        output: CString::default(),
        formatted: CString::default(),
        error: CString::default(),
        dictionaries: DictionaryChain::new(&dictionaries, false),
    });
    Box::into_raw(tagger) as MecabHandle
}

unsafe extern "C" fn fake_version() -> *const c_char {
    b"0.996-fake\0".as_ptr() as *const c_char
}

unsafe extern "C" fn fake_strerror(handle: MecabHandle) -> *const c_char {
    if handle.is_null() {
        return LAST_ERROR.with(|error| error.borrow().as_ptr());
    }
    fake(handle).error.as_ptr()
}

unsafe extern "C" fn fake_destroy(handle: MecabHandle) {
    DESTROYED.with(|count| count.set(count.get() + 1));
    drop(Box::from_raw(handle as *mut FakeTagger));
}

unsafe extern "C" fn fake_set_theta(handle: MecabHandle, theta: c_float) {
    fake(handle).theta = Some(theta);
}

unsafe extern "C" fn fake_set_lattice_level(handle: MecabHandle, level: c_int) {
    fake(handle).lattice_level = Some(level);
}

unsafe extern "C" fn fake_set_all_morphs(handle: MecabHandle, flag: c_int) {
    fake(handle).all_morphs = flag != 0;
}

unsafe extern "C" fn fake_set_partial(handle: MecabHandle, flag: c_int) {
    fake(handle).partial = flag != 0;
}

unsafe extern "C" fn fake_sparse_tostr2(
    handle: MecabHandle,
    input: *const c_char,
    len: usize,
) -> *const c_char {
    let tagger = fake(handle);
    if !tagger.load(input, len) {
        return ptr::null();
    }
    tagger.output = CString::new(tagger.render(FAKE_PATH_CHUNKS[0])).unwrap_or_default();
    tagger.output.as_ptr()
}

unsafe extern "C" fn fake_sparse_tonode2(
    handle: MecabHandle,
    input: *const c_char,
    len: usize,
) -> *const MecabNodeRaw {
    let tagger = fake(handle);
    if !tagger.load(input, len) {
        return ptr::null();
    }
    let chain = NodeChain::new(&tagger.segment(FAKE_PATH_CHUNKS[0]));
    let head = chain.head();
    tagger.chain = Some(chain);
    head
}

unsafe extern "C" fn fake_nbest_sparse_tostr2(
    handle: MecabHandle,
    n: usize,
    input: *const c_char,
    len: usize,
) -> *const c_char {
    let tagger = fake(handle);
    if !tagger.load(input, len) {
        return ptr::null();
    }
    let rendered: String = FAKE_PATH_CHUNKS
        .iter()
        .take(n)
        .map(|chunk| tagger.render(*chunk))
        .collect();
    tagger.output = CString::new(rendered).unwrap_or_default();
    tagger.output.as_ptr()
}

unsafe extern "C" fn fake_nbest_init2(
    handle: MecabHandle,
    input: *const c_char,
    len: usize,
) -> c_int {
    let tagger = fake(handle);
    if !tagger.load(input, len) {
        return 0;
    }
    // A leading 0x08 builds a lattice with no complete path.
    tagger.pending_paths = if tagger.input.first() == Some(&0x08) {
        VecDeque::new()
    } else {
        FAKE_PATH_CHUNKS.iter().copied().collect()
    };
    1
}

unsafe extern "C" fn fake_nbest_next_tonode(handle: MecabHandle) -> *const MecabNodeRaw {
    let tagger = fake(handle);
    let Some(chunk) = tagger.pending_paths.pop_front() else {
        tagger.error = CString::new("no more results").unwrap_or_default();
        return ptr::null();
    };
    let chain = NodeChain::new(&tagger.segment(chunk));
    let head = chain.head();
    tagger.chain = Some(chain);
    head
}

unsafe extern "C" fn fake_format_node(
    handle: MecabHandle,
    node: *const MecabNodeRaw,
) -> *const c_char {
    let tagger = fake(handle);
    let feature = CStr::from_ptr((*node).feature).to_string_lossy();
    tagger.formatted =
        CString::new(format!("{}|{}", feature, (*node).length)).unwrap_or_default();
    tagger.formatted.as_ptr()
}

unsafe extern "C" fn fake_dictionary_info(handle: MecabHandle) -> *const MecabDictionaryInfoRaw {
    fake(handle).dictionaries.head()
}

/// Function table backed by [`FakeTagger`].
pub(crate) fn fake_api() -> MecabApi {
    MecabApi {
        mecab_new2: fake_new2,
        mecab_version: fake_version,
        mecab_strerror: fake_strerror,
        mecab_destroy: fake_destroy,
        mecab_set_theta: fake_set_theta,
        mecab_set_lattice_level: fake_set_lattice_level,
        mecab_set_all_morphs: fake_set_all_morphs,
        mecab_set_partial: fake_set_partial,
        mecab_sparse_tostr2: fake_sparse_tostr2,
        mecab_sparse_tonode2: fake_sparse_tonode2,
        mecab_nbest_sparse_tostr2: fake_nbest_sparse_tostr2,
        mecab_nbest_init2: fake_nbest_init2,
        mecab_nbest_next_tonode: fake_nbest_next_tonode,
        mecab_format_node: fake_format_node,
        mecab_dictionary_info: fake_dictionary_info,
    }
}

pub(crate) fn fake_library() -> Arc<LoadedLibrary> {
    Arc::new(LoadedLibrary {
        _library: None,
        path: None,
        api: fake_api(),
    })
}
