/// Panics in debug builds, logs an error in release builds.
///
/// Used for protocol violations that can't be recovered locally but also
/// shouldn't take a shipped application down with them.
#[macro_export]
macro_rules! debug_panic {
    ($($arg:tt)*) => {
        if cfg!(debug_assertions) {
            panic!($($arg)*);
        } else {
            $crate::tracing::error!($($arg)*);
        }
    };
}
