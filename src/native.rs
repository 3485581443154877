use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_float, c_int, c_void};
use std::path::{Path, PathBuf};
use std::ptr;

use crate::config::{MecabDictionaryInfoRaw, MecabHandle, MecabNodeRaw};
use crate::error::{MecabError, Result};

type FnMecabNew2 = unsafe extern "C" fn(*const c_char) -> MecabHandle;
type FnMecabVersion = unsafe extern "C" fn() -> *const c_char;
type FnMecabStrerror = unsafe extern "C" fn(MecabHandle) -> *const c_char;
type FnMecabDestroy = unsafe extern "C" fn(MecabHandle);
type FnMecabSetTheta = unsafe extern "C" fn(MecabHandle, c_float);
type FnMecabSetLatticeLevel = unsafe extern "C" fn(MecabHandle, c_int);
type FnMecabSetAllMorphs = unsafe extern "C" fn(MecabHandle, c_int);
type FnMecabSetPartial = unsafe extern "C" fn(MecabHandle, c_int);
type FnMecabSparseTostr2 =
    unsafe extern "C" fn(MecabHandle, *const c_char, usize) -> *const c_char;
type FnMecabSparseTonode2 =
    unsafe extern "C" fn(MecabHandle, *const c_char, usize) -> *const MecabNodeRaw;
type FnMecabNbestSparseTostr2 =
    unsafe extern "C" fn(MecabHandle, usize, *const c_char, usize) -> *const c_char;
type FnMecabNbestInit2 = unsafe extern "C" fn(MecabHandle, *const c_char, usize) -> c_int;
type FnMecabNbestNextTonode = unsafe extern "C" fn(MecabHandle) -> *const MecabNodeRaw;
type FnMecabFormatNode =
    unsafe extern "C" fn(MecabHandle, *const MecabNodeRaw) -> *const c_char;
type FnMecabDictionaryInfo = unsafe extern "C" fn(MecabHandle) -> *const MecabDictionaryInfoRaw;

#[derive(Clone, Copy)]
pub(crate) struct MecabApi {
    pub(crate) mecab_new2: FnMecabNew2,
    pub(crate) mecab_version: FnMecabVersion,
    pub(crate) mecab_strerror: FnMecabStrerror,
    pub(crate) mecab_destroy: FnMecabDestroy,
    pub(crate) mecab_set_theta: FnMecabSetTheta,
    pub(crate) mecab_set_lattice_level: FnMecabSetLatticeLevel,
    pub(crate) mecab_set_all_morphs: FnMecabSetAllMorphs,
    pub(crate) mecab_set_partial: FnMecabSetPartial,
    pub(crate) mecab_sparse_tostr2: FnMecabSparseTostr2,
    pub(crate) mecab_sparse_tonode2: FnMecabSparseTonode2,
    pub(crate) mecab_nbest_sparse_tostr2: FnMecabNbestSparseTostr2,
    pub(crate) mecab_nbest_init2: FnMecabNbestInit2,
    pub(crate) mecab_nbest_next_tonode: FnMecabNbestNextTonode,
    pub(crate) mecab_format_node: FnMecabFormatNode,
    pub(crate) mecab_dictionary_info: FnMecabDictionaryInfo,
}

impl MecabApi {
    pub(crate) unsafe fn load(library: &DynamicLibrary) -> Result<Self> {
        Ok(Self {
            mecab_new2: library.load_symbol("mecab_new2")?,
            mecab_version: library.load_symbol("mecab_version")?,
            mecab_strerror: library.load_symbol("mecab_strerror")?,
            mecab_destroy: library.load_symbol("mecab_destroy")?,
            mecab_set_theta: library.load_symbol("mecab_set_theta")?,
            mecab_set_lattice_level: library.load_symbol("mecab_set_lattice_level")?,
            mecab_set_all_morphs: library.load_symbol("mecab_set_all_morphs")?,
            mecab_set_partial: library.load_symbol("mecab_set_partial")?,
            mecab_sparse_tostr2: library.load_symbol("mecab_sparse_tostr2")?,
            mecab_sparse_tonode2: library.load_symbol("mecab_sparse_tonode2")?,
            mecab_nbest_sparse_tostr2: library.load_symbol("mecab_nbest_sparse_tostr2")?,
            mecab_nbest_init2: library.load_symbol("mecab_nbest_init2")?,
            mecab_nbest_next_tonode: library.load_symbol("mecab_nbest_next_tonode")?,
            mecab_format_node: library.load_symbol("mecab_format_node")?,
            mecab_dictionary_info: library.load_symbol("mecab_dictionary_info")?,
        })
    }
}

/// Function table plus the library that backs it.
///
/// `_library` is `None` only for tables assembled in-process (tests).
pub(crate) struct LoadedLibrary {
    pub(crate) _library: Option<DynamicLibrary>,
    pub(crate) path: Option<PathBuf>,
    pub(crate) api: MecabApi,
}

#[derive(Debug)]
pub(crate) struct DynamicLibrary {
    handle: *mut c_void,
}

// The loader handle is process-global and only closed on drop.
unsafe impl Send for DynamicLibrary {}
unsafe impl Sync for DynamicLibrary {}

impl DynamicLibrary {
    pub(crate) fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_string = path.as_ref().to_string_lossy().to_string();
        let path_c = CString::new(path_string.clone())?;
        let handle = unsafe { platform_open(path_c.as_ptr()) };
        if handle.is_null() {
            return Err(MecabError::LibraryLoad(format!(
                "{} ({})",
                path_string,
                platform_last_error()
            )));
        }
        Ok(Self { handle })
    }

    pub(crate) unsafe fn load_symbol<T: Copy>(&self, symbol_name: &str) -> Result<T> {
        let symbol_c = CString::new(symbol_name)?;
        let symbol_ptr = platform_symbol(self.handle, symbol_c.as_ptr());
        if symbol_ptr.is_null() {
            return Err(MecabError::SymbolLoad(format!(
                "{} ({})",
                symbol_name,
                platform_last_error()
            )));
        }
        Ok(std::mem::transmute_copy::<*mut c_void, T>(&symbol_ptr))
    }
}

impl Drop for DynamicLibrary {
    fn drop(&mut self) {
        if self.handle.is_null() {
            return;
        }
        unsafe {
            platform_close(self.handle);
        }
        self.handle = ptr::null_mut();
    }
}

/// Reads `mecab_strerror` for `handle`. A null handle yields the message of
/// the last failed construction.
pub(crate) fn read_mecab_error(api: &MecabApi, handle: MecabHandle) -> Option<String> {
    let message_ptr = unsafe { (api.mecab_strerror)(handle) };
    if message_ptr.is_null() {
        return None;
    }
    let message = unsafe { CStr::from_ptr(message_ptr) }
        .to_string_lossy()
        .trim()
        .to_string();
    if message.is_empty() {
        None
    } else {
        Some(message)
    }
}

pub(crate) fn decoding_error(api: &MecabApi, handle: MecabHandle, fallback: &str) -> MecabError {
    match read_mecab_error(api, handle) {
        Some(message) => MecabError::Decoding(message),
        None => MecabError::Decoding(fallback.to_string()),
    }
}

pub(crate) fn cstr_to_string(pointer: *const c_char) -> String {
    if pointer.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(pointer) }
        .to_string_lossy()
        .to_string()
}

#[cfg(target_os = "windows")]
#[link(name = "kernel32")]
extern "system" {
    fn LoadLibraryA(lp_lib_file_name: *const c_char) -> *mut c_void;
    fn GetProcAddress(h_module: *mut c_void, lp_proc_name: *const c_char) -> *mut c_void;
    fn FreeLibrary(h_lib_module: *mut c_void) -> i32;
    fn GetLastError() -> u32;
}

#[cfg(target_os = "windows")]
unsafe fn platform_open(path: *const c_char) -> *mut c_void {
    LoadLibraryA(path)
}

#[cfg(target_os = "windows")]
unsafe fn platform_symbol(handle: *mut c_void, symbol: *const c_char) -> *mut c_void {
    GetProcAddress(handle, symbol)
}

#[cfg(target_os = "windows")]
unsafe fn platform_close(handle: *mut c_void) {
    let _ = FreeLibrary(handle);
}

#[cfg(target_os = "windows")]
fn platform_last_error() -> String {
    format!("GetLastError={}", unsafe { GetLastError() })
}

#[cfg(target_os = "linux")]
#[link(name = "dl")]
extern "C" {
    fn dlopen(filename: *const c_char, flags: c_int) -> *mut c_void;
    fn dlsym(handle: *mut c_void, symbol: *const c_char) -> *mut c_void;
    fn dlclose(handle: *mut c_void) -> c_int;
    fn dlerror() -> *const c_char;
}

#[cfg(target_os = "macos")]
extern "C" {
    fn dlopen(filename: *const c_char, flags: c_int) -> *mut c_void;
    fn dlsym(handle: *mut c_void, symbol: *const c_char) -> *mut c_void;
    fn dlclose(handle: *mut c_void) -> c_int;
    fn dlerror() -> *const c_char;
}

#[cfg(unix)]
unsafe fn platform_open(path: *const c_char) -> *mut c_void {
    const RTLD_NOW: c_int = 2;
    const RTLD_LOCAL: c_int = 0;
    dlopen(path, RTLD_NOW | RTLD_LOCAL)
}

#[cfg(unix)]
unsafe fn platform_symbol(handle: *mut c_void, symbol: *const c_char) -> *mut c_void {
    dlsym(handle, symbol)
}

#[cfg(unix)]
unsafe fn platform_close(handle: *mut c_void) {
    let _ = dlclose(handle);
}

#[cfg(unix)]
fn platform_last_error() -> String {
    let pointer = unsafe { dlerror() };
    if pointer.is_null() {
        "unknown error".to_string()
    } else {
        let full = unsafe { CStr::from_ptr(pointer) }
            .to_string_lossy()
            .to_string();
        full.split(": tried:").next().unwrap_or(&full).to_string()
    }
}
