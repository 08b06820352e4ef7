use crate::errno::Errno;
use crate::options::OptionList;
use libc::c_int;
use std::ffi::NulError;
use std::ptr;

/// PROJ thread context.
///
/// Every transform owns one, shared through an `Rc` with the spatial references and engines it
/// builds, so nothing created from it can cross a thread boundary.
pub(crate) struct ThreadContext(ptr::NonNull<proj_sys::PJ_CONTEXT>);

impl ThreadContext {
    pub fn new() -> Self {
        // Safety: `proj_context_create` always returns a valid pointer to a thread context.
        unsafe {
            let ctx_ptr = proj_sys::proj_context_create();
            ThreadContext::from_raw(ctx_ptr)
        }
    }

    /// # Safety
    ///
    /// Must provide a non-null pointer to a PROJ thread context.
    unsafe fn from_raw(ctx_ptr: *mut proj_sys::PJ_CONTEXT) -> Self {
        debug_assert!(!ctx_ptr.is_null());
        ThreadContext(unsafe { ptr::NonNull::new_unchecked(ctx_ptr) })
    }

    pub fn as_ptr(&self) -> *mut proj_sys::PJ_CONTEXT {
        self.0.as_ptr()
    }

    /// Last error raised on this context, e.g. by a failed `proj_create`.
    pub fn errno(&self) -> Errno {
        Errno(unsafe { proj_sys::proj_context_errno(self.as_ptr()) })
    }

    /// Message for the context's current error, or `fallback` when PROJ has nothing to say.
    pub fn last_error_message(&self, fallback: &str) -> String {
        let errno = self.errno();
        if errno.is_ok() {
            return fallback.to_string();
        }
        errno
            .message(self)
            .unwrap_or_else(|err| format!("{fallback} ({err})"))
    }

    /// Replace the directories PROJ searches for resource files such as datum grids.
    pub fn set_search_paths(&self, paths: &[String]) -> Result<(), NulError> {
        let mut list = OptionList::new();
        for path in paths {
            list.push(path.as_str())?;
        }
        list.with_ptr(|ptr| unsafe {
            proj_sys::proj_context_set_search_paths(self.as_ptr(), list.len() as c_int, ptr)
        });
        Ok(())
    }
}

impl Default for ThreadContext {
    fn default() -> Self {
        ThreadContext::new()
    }
}

impl Drop for ThreadContext {
    fn drop(&mut self) {
        // Safety: The pointer being provided to `proj_context_destroy` will always be a valid
        // thread context, so long as the same `ThreadContext` doesn't get dropped twice.
        unsafe { proj_sys::proj_context_destroy(self.0.as_ptr()) };
    }
}
