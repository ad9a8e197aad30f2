use once_cell::sync::Lazy;

/// Static Tokio runtime for async operations (socket I/O, bundle and asset fetches).
///
/// Callers are plain threads (the JS engine thread, `main`), so everything
/// async is spawned or blocked on here.
pub static TOKIO: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("port-bridge-io")
        .build()
        .expect("Failed to build Tokio runtime")
});
