//! Entry-point macro for dynamically loaded modules.

/// Emits the C-ABI init symbol the module loader resolves.
///
/// The first argument is the exact symbol name, `init_<name>` for a module
/// installed as `<name>.so`; the second is a
/// `fn(&mut ModuleRegistrar<'_>) -> BuildResult<()>` doing the actual
/// registration. A registration error is logged and reported to the loader
/// as a negative return, which aborts the whole load batch.
///
/// # Example
/// ```rust,ignore
/// module_entry!(init_depgen, register);
/// ```
#[macro_export]
macro_rules! module_entry {
    ($symbol:ident, $init:path) => {
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $symbol(registrar: *mut ::core::ffi::c_void) -> i32 {
            if registrar.is_null() {
                return -1;
            }
            // SAFETY: the loader passes a pointer to the module's staged
            // registrar, valid for the duration of this call.
            let registrar = unsafe {
                &mut *registrar.cast::<$crate::prelude::ModuleRegistrar<'_>>()
            };
            match $init(registrar) {
                Ok(()) => 0,
                Err(err) => {
                    $crate::prelude::tracing::error!(
                        module = registrar.module_name(),
                        error = %err,
                        "module init failed"
                    );
                    -1
                }
            }
        }
    };
}
