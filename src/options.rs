use libc::c_char;
use std::ffi::{CString, NulError};
use std::ptr;

/// Owned strings handed to PROJ as a null-terminated `char* const*`, e.g. `STRICT=NO` for the
/// WKT parser or a list of resource search paths.
#[derive(Default)]
pub(crate) struct OptionList {
    entries: Vec<CString>,
}

impl OptionList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list from `KEY=VALUE` pairs.
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Result<Self, NulError> {
        let mut list = Self::new();
        for (key, value) in pairs {
            list.push(format!("{key}={value}"))?;
        }
        Ok(list)
    }

    pub fn push(&mut self, entry: impl Into<Vec<u8>>) -> Result<(), NulError> {
        self.entries.push(CString::new(entry)?);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Call `f` with a pointer that stays valid for the duration of the call.
    ///
    /// PROJ documents NULL as "no options", so an empty list is passed as NULL rather than as a
    /// pointer to a lone terminator.
    pub fn with_ptr<R>(&self, f: impl FnOnce(*const *const c_char) -> R) -> R {
        if self.entries.is_empty() {
            return f(ptr::null());
        }
        let ptrs: Vec<*const c_char> = self
            .entries
            .iter()
            .map(|entry| entry.as_ptr())
            .chain(std::iter::once(ptr::null()))
            .collect();
        f(ptrs.as_ptr())
    }
}
