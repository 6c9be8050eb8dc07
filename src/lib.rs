#![forbid(unsafe_code)]

pub mod annotations;
pub mod asset_store;
pub mod chroma;
pub mod compose;
pub mod config;
pub mod error;
pub mod layout;
pub mod naming;
pub mod palette;
pub mod transform;

pub use asset_store::{AssetStore, Cutout};
pub use compose::{BatchReport, Compositor, InstanceSpec, PlacedInstance, Scene};
pub use config::ComposerConfig;
pub use error::{SceneGenError, SceneGenResult};
pub use palette::InstanceColor;
