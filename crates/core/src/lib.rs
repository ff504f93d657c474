//! Core library for the aiomixer terminal mixer.
//!
//! The device is enumerated once into a [`Catalog`] of classes and controls.
//! A [`Session`] then drives navigation over that catalog, keeps the visible
//! window of controls in a [`Viewport`] and commits changes through
//! [`ValueSync`]. Drawing is left to the caller, which receives the
//! [`Effect`]s of every transition.

pub mod catalog;
pub mod config;
pub mod device;
pub mod error;
pub mod focus;
pub mod sync;
pub mod viewport;

pub use catalog::{Catalog, Control, ControlKind, DiscreteControl, MixerClass, ValueControl};
pub use config::{AppConfig, CatalogLimits, LayoutConfig, DEFAULT_MIXER_DEVICE};
pub use device::{
    open_device, ControlValue, DescriptorKind, DeviceDescriptor, MemoryDevice, MixerDevice,
    MixerSnapshot, ValueKind,
};
pub use error::{MixerError, Result};
pub use focus::{Effect, Flow, Focus, Key, Region, Session, Transition};
pub use sync::ValueSync;
pub use viewport::{Placement, Viewport};
