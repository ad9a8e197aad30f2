use std::rc::Rc;
use std::sync::mpsc;

use boa_engine::{Context, JsError};
use boa_runtime::extensions::{ConsoleExtension, MicrotaskExtension, TimeoutExtension};

use crate::asset_cache::AssetCache;
use crate::error::BootstrapError;
use crate::js::{JsEngine, JsEngineClient, esm::FetchModuleLoader};

/// Host functionality installed into the JS context before any script runs.
pub trait JsEngineExtension: Send + Sync + 'static {
    fn register(&self, context: &mut Context, client: JsEngineClient) -> Result<(), JsError>;
}

pub struct JsEngineBuilder {
    extensions: Vec<Box<dyn JsEngineExtension>>,
    asset_cache: Option<AssetCache>,
}

impl Default for JsEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl JsEngineBuilder {
    pub fn new() -> Self {
        JsEngineBuilder {
            extensions: vec![],
            asset_cache: None,
        }
    }

    pub fn with_extension(mut self, extension: impl JsEngineExtension) -> Self {
        self.extensions.push(Box::new(extension));
        self
    }

    /// Serve module imports from this cache when the network fetch fails.
    pub fn with_asset_cache(mut self, asset_cache: Option<AssetCache>) -> Self {
        self.asset_cache = asset_cache;
        self
    }

    /// Start the engine thread. Fails if the context cannot be built.
    pub fn start(self) -> Result<JsEngine, BootstrapError> {
        let (sender, receiver) = mpsc::channel();
        let client = JsEngineClient::new(sender);

        let extensions = self.extensions;
        let asset_cache = self.asset_cache;
        let extension_client = client.clone();

        JsEngine::start(
            client,
            receiver,
            Box::new(move || build_context(&extensions, extension_client, asset_cache)),
        )
        .map_err(BootstrapError::Engine)
    }
}

fn build_context(
    extensions: &[Box<dyn JsEngineExtension>],
    client: JsEngineClient,
    asset_cache: Option<AssetCache>,
) -> Result<(Context, Rc<FetchModuleLoader>), JsError> {
    let loader = Rc::new(FetchModuleLoader::new(asset_cache));
    let mut context = Context::builder().module_loader(loader.clone()).build()?;

    // Register Boa runtime extensions
    boa_runtime::register(
        (
            ConsoleExtension::default(),
            TimeoutExtension {},
            MicrotaskExtension {},
        ),
        None,
        &mut context,
    )?;

    for extension in extensions {
        extension.register(&mut context, client.clone())?;
    }

    Ok((context, loader))
}
