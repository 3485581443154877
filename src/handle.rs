use std::ffi::CString;
use std::os::raw::{c_char, c_int};
use std::ptr;
use std::sync::Arc;

use crate::config::{MecabDictionaryInfoRaw, MecabHandle, MecabNodeRaw};
use crate::error::{MecabError, Result};
use crate::native::{cstr_to_string, decoding_error, read_mecab_error, LoadedLibrary, MecabApi};
use crate::options::TaggerConfig;

/// Owner of one native `mecab_t`.
///
/// The raw pointer is nulled by [`Self::destroy`]; every later call fails
/// with [`MecabError::NotInitialized`] instead of reaching native code.
pub(crate) struct TaggerHandle {
    inner: Arc<LoadedLibrary>,
    handle: MecabHandle,
}

// A tagger has no thread affinity. Parse calls take `&mut self`, so there
// is never more than one caller inside native code per handle.
unsafe impl Send for TaggerHandle {}

impl TaggerHandle {
    pub(crate) fn construct(inner: Arc<LoadedLibrary>, options: &str) -> Result<Self> {
        let options_c = CString::new(options)?;
        log::debug!("creating MeCab tagger with options \"{options}\"");
        let handle = unsafe { (inner.api.mecab_new2)(options_c.as_ptr()) };
        if handle.is_null() {
            let message = read_mecab_error(&inner.api, ptr::null_mut())
                .unwrap_or_else(|| "mecab_new2 returned a null tagger".to_string());
            return Err(MecabError::Construction {
                options: options.to_string(),
                message,
            });
        }
        Ok(Self { inner, handle })
    }

    /// Applies the options MeCab exposes as post-construction setters.
    /// `config` must already be resolved, so N-best configs carry a lattice
    /// level of at least 1 here.
    pub(crate) fn apply_scalar_options(&mut self, config: &TaggerConfig) -> Result<()> {
        let handle = self.live()?;
        let api = self.api();
        unsafe {
            if let Some(theta) = config.theta {
                (api.mecab_set_theta)(handle, theta);
            }
            if let Some(level) = config.lattice_level {
                (api.mecab_set_lattice_level)(handle, level as c_int);
            }
            if config.all_morphs {
                (api.mecab_set_all_morphs)(handle, 1);
            }
            if config.partial {
                (api.mecab_set_partial)(handle, 1);
            }
        }
        Ok(())
    }

    pub(crate) fn is_live(&self) -> bool {
        !self.handle.is_null()
    }

    /// Releases the tagger. Later calls are no-ops.
    pub(crate) fn destroy(&mut self) {
        if self.handle.is_null() {
            return;
        }
        log::trace!("destroying MeCab tagger {:p}", self.handle);
        unsafe {
            (self.inner.api.mecab_destroy)(self.handle);
        }
        self.handle = ptr::null_mut();
    }

    pub(crate) fn library(&self) -> &Arc<LoadedLibrary> {
        &self.inner
    }

    pub(crate) fn parse_to_string(&mut self, input: &[u8]) -> Result<String> {
        let handle = self.live()?;
        let result = unsafe {
            (self.api().mecab_sparse_tostr2)(handle, input_ptr(input), input.len())
        };
        self.owned_string(result, "mecab_sparse_tostr2 returned a null pointer")
    }

    pub(crate) fn nbest_parse_to_string(&mut self, n: usize, input: &[u8]) -> Result<String> {
        let handle = self.live()?;
        let result = unsafe {
            (self.api().mecab_nbest_sparse_tostr2)(handle, n, input_ptr(input), input.len())
        };
        self.owned_string(result, "mecab_nbest_sparse_tostr2 returned a null pointer")
    }

    /// Head of the best-path chain. Valid until the next call on this handle.
    pub(crate) fn parse_to_node(&mut self, input: &[u8]) -> Result<*const MecabNodeRaw> {
        let handle = self.live()?;
        let node = unsafe {
            (self.api().mecab_sparse_tonode2)(handle, input_ptr(input), input.len())
        };
        if node.is_null() {
            return Err(self.error("mecab_sparse_tonode2 returned a null node"));
        }
        Ok(node)
    }

    pub(crate) fn nbest_init(&mut self, input: &[u8]) -> Result<()> {
        let handle = self.live()?;
        let ok = unsafe { (self.api().mecab_nbest_init2)(handle, input_ptr(input), input.len()) };
        if ok == 0 {
            return Err(self.error("mecab_nbest_init2 failed"));
        }
        Ok(())
    }

    /// Head of the next best path, or null once the lattice is exhausted.
    pub(crate) fn nbest_next(&mut self) -> Result<*const MecabNodeRaw> {
        let handle = self.live()?;
        Ok(unsafe { (self.api().mecab_nbest_next_tonode)(handle) })
    }

    pub(crate) fn format_node(&self, node: *const MecabNodeRaw) -> Result<String> {
        let handle = self.live()?;
        let formatted = unsafe { (self.api().mecab_format_node)(handle, node) };
        self.owned_string(formatted, "mecab_format_node returned a null pointer")
    }

    pub(crate) fn dictionary_info(&self) -> Result<*const MecabDictionaryInfoRaw> {
        let handle = self.live()?;
        Ok(unsafe { (self.api().mecab_dictionary_info)(handle) })
    }

    pub(crate) fn error(&self, fallback: &str) -> MecabError {
        decoding_error(self.api(), self.handle, fallback)
    }

    fn api(&self) -> &MecabApi {
        &self.inner.api
    }

    fn live(&self) -> Result<MecabHandle> {
        if self.handle.is_null() {
            return Err(MecabError::NotInitialized);
        }
        Ok(self.handle)
    }

    fn owned_string(&self, pointer: *const c_char, fallback: &str) -> Result<String> {
        if pointer.is_null() {
            return Err(self.error(fallback));
        }
        Ok(cstr_to_string(pointer))
    }

    #[cfg(test)]
    pub(crate) fn raw(&self) -> MecabHandle {
        self.handle
    }
}

impl Drop for TaggerHandle {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn input_ptr(input: &[u8]) -> *const c_char {
    input.as_ptr() as *const c_char
}
