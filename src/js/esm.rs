use boa_engine::module::ModuleLoader;
use boa_engine::{Context, JsError, JsNativeError, JsObject, JsResult, JsString, Module, Source};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::asset_cache::{self, AssetCache};
use crate::runtime::TOKIO;

/// Resolves imports against the importing module and fetches them from
/// disk or over HTTP, falling back to the asset cache when a fetch fails.
pub(crate) struct FetchModuleLoader {
    asset_cache: Option<AssetCache>,
    local_modules: RefCell<HashMap<String, Module>>,
}

impl FetchModuleLoader {
    pub(crate) fn new(asset_cache: Option<AssetCache>) -> Self {
        Self {
            asset_cache,
            local_modules: RefCell::new(HashMap::new()),
        }
    }

    pub fn insert(&self, specifier: impl Into<String>, module: Module) {
        let specifier = specifier.into();
        self.local_modules
            .borrow_mut()
            .insert(specifier.clone(), module);
        log::info!("Cached local module: {}", specifier);
    }

    fn fetch(&self, specifier: &str) -> JsResult<String> {
        let fetched = if asset_cache::is_remote(specifier) {
            // The engine thread is not a runtime worker, so blocking here is fine.
            TOKIO
                .block_on(asset_cache::fetch_text(specifier))
                .map_err(|e| e.to_string())
        } else {
            std::fs::read_to_string(specifier).map_err(|e| e.to_string())
        };

        match fetched {
            Ok(body) => Ok(body),
            Err(e) => {
                if let Some(body) = self.asset_cache.as_ref().and_then(|c| c.lookup(specifier)) {
                    log::warn!("Fetch of {} failed ({}), using cached copy", specifier, e);
                    return Ok(body);
                }
                Err(JsError::from_native(JsNativeError::typ().with_message(
                    format!("Fetch error for {}: {}", specifier, e),
                )))
            }
        }
    }
}

/// Resolve `specifier` relative to the module that imports it.
pub(crate) fn resolve_specifier(referrer: Option<&Path>, specifier: &str) -> String {
    let Some(path) = referrer else {
        return specifier.to_string();
    };

    // Try to resolve as absolute URL, otherwise resolve as relative URL with base.
    if let Ok(base_url) = url::Url::parse(&path.to_string_lossy()) {
        match url::Url::options().base_url(Some(&base_url)).parse(specifier) {
            Ok(new_url) => new_url.to_string(),
            Err(_) => specifier.to_string(),
        }
    } else if asset_cache::is_remote(specifier) {
        specifier.to_string()
    } else {
        let joined = if specifier.starts_with('/') {
            PathBuf::from(specifier)
        } else {
            path.parent().unwrap_or(path).join(specifier)
        };
        joined.to_string_lossy().to_string()
    }
}

impl ModuleLoader for FetchModuleLoader {
    fn init_import_meta(
        self: Rc<Self>,
        import_meta: &JsObject,
        module: &Module,
        context: &mut Context,
    ) {
        let Some(module_path) = module.path().map(|path| path.to_string_lossy().to_string()) else {
            log::warn!("Module path is None while initializing import_meta");
            return;
        };

        if let Err(e) = import_meta.set(
            JsString::from("url"),
            JsString::from(module_path),
            false,
            context,
        ) {
            log::warn!("Failed to set 'url' in import_meta: {:?}", e);
        }
    }

    async fn load_imported_module(
        self: std::rc::Rc<Self>,
        referrer: boa_engine::module::Referrer,
        specifier: boa_engine::JsString,
        context: &std::cell::RefCell<&mut boa_engine::Context>,
    ) -> boa_engine::JsResult<boa_engine::Module> {
        let spec_str = specifier.to_std_string_lossy();
        let resolved_specifier = resolve_specifier(referrer.path(), &spec_str);

        log::debug!("Resolved specifier {} -> {}", spec_str, resolved_specifier);

        // Check cache with resolved specifier to avoid duplicate loading.
        if let Some(module) = self.local_modules.borrow().get(&resolved_specifier) {
            log::debug!("Cache hit for module: {}", resolved_specifier);
            return Ok(module.clone());
        }

        let body = self.fetch(&resolved_specifier)?;

        let src = Source::from_bytes(body.as_bytes()).with_path(Path::new(&resolved_specifier));
        let module = Module::parse(src, None, &mut context.borrow_mut())?;

        self.insert(resolved_specifier.clone(), module.clone());
        Ok(module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn relative_import_next_to_local_bundle() {
        let resolved = resolve_specifier(Some(Path::new("dist/main.js")), "./ports.js");
        assert_eq!(Path::new(&resolved), Path::new("dist/./ports.js"));
    }

    #[test_log::test]
    fn absolute_path_import() {
        let resolved = resolve_specifier(Some(Path::new("dist/main.js")), "/opt/app/lib.js");
        assert_eq!(resolved, "/opt/app/lib.js");
    }

    #[test_log::test]
    fn relative_import_against_url() {
        let resolved = resolve_specifier(
            Some(Path::new("http://localhost:5173/src/main.js")),
            "../lib/ports.js",
        );
        assert_eq!(resolved, "http://localhost:5173/lib/ports.js");
    }

    #[test_log::test]
    fn root_module_is_left_alone() {
        assert_eq!(resolve_specifier(None, "dist/main.js"), "dist/main.js");
    }

    #[test_log::test]
    fn missing_file_without_cache_is_an_error() {
        let loader = FetchModuleLoader::new(None);
        assert!(loader.fetch("/definitely/not/here.js").is_err());
    }

    #[test_log::test]
    fn failed_fetch_falls_back_to_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AssetCache::open(dir.path()).unwrap();
        cache
            .store("http://127.0.0.1:1/app.js", "export default 1;")
            .unwrap();

        let loader = FetchModuleLoader::new(Some(cache));
        let body = loader.fetch("http://127.0.0.1:1/app.js").unwrap();
        assert_eq!(body, "export default 1;");
    }
}
