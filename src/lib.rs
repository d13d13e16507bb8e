//! Strata - asynchronous glTF 2.0 loading
//!
//! An [`AssetLoader`] owns a background runtime and turns [`LoadRequest`]s into
//! immutable, shareable [`Asset`]s. Identical requests that overlap in time
//! share one pipeline run, and decoded animations can be persisted between
//! runs through a [`CacheLocation`].
//!
//! ```no_run
//! use strata::{AssetLoader, LoadRequest};
//!
//! let loader = AssetLoader::new()?;
//! let pending = loader.submit(LoadRequest::from_location("models/robot.glb"));
//! let asset = pending.wait()?;
//! println!("{} meshes", asset.meshes.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod coordinator;
mod error;
mod pending;
mod pipeline;
mod progress;
mod request;
mod settings;

#[cfg(test)]
mod fixtures;

pub use coordinator::{AssetLoader, LoaderInitError};
pub use error::{LoadError, LoadResult};
pub use pending::{PendingLoad, RequestId};
pub use progress::{LoadProgress, ProgressObserver};
pub use request::{CacheLocation, LoadRequest};
pub use settings::LoaderSettings;

pub use strata_assets::{
    AlphaMode, Asset, Camera, DefaultImageCodec, ImageCodec, Material, MeshAsset, MeshPrimitive,
    MorphTarget, Node, Projection, Sampler, Scene, Skin, Texture, TextureAsset, TextureFormat,
    TextureRef, Transform,
};
pub use strata_cache::{CacheStore, FileStore, MemoryStore};
pub use strata_core::{
    AnimationChannel, AnimationClip, AnimationSet, CacheKey, ErrorKind, Interpolation, LoadOptions,
    TargetPath,
};
pub use strata_fetch::{DefaultFetcher, FetchError, Location, ResourceFetcher};
