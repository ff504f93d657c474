//! Access to the mixer device.
//!
//! The device exposes a flat list of descriptors (classes and typed controls)
//! and per-control values addressed by the descriptor index. Everything above
//! this module talks to the hardware through [`MixerDevice`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{MixerError, Result};

mod memory;
#[cfg(target_os = "netbsd")]
mod netbsd;

pub use memory::{MemoryDevice, MixerSnapshot};
#[cfg(target_os = "netbsd")]
pub use netbsd::SysMixer;

/// Highest level a value control channel can hold.
pub const MAX_LEVEL: u8 = 255;

/// One entry of the device enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Position in the device's flat control space.
    pub index: usize,
    pub label: String,
    /// Id of the class this entry belongs to. For class entries this is the
    /// class's own id.
    #[serde(rename = "class")]
    pub class_id: i32,
    #[serde(default)]
    pub next: Option<usize>,
    /// Structurally related parent control, if any.
    #[serde(default)]
    pub prev: Option<usize>,
    #[serde(flatten)]
    pub kind: DescriptorKind,
}

/// Type-specific part of a [`DeviceDescriptor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DescriptorKind {
    Class,
    Enum { members: Vec<EnumMember> },
    Set { members: Vec<SetMember> },
    Value { channels: usize, delta: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumMember {
    pub label: String,
    pub ord: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetMember {
    pub label: String,
    pub mask: i32,
}

/// Shape of the value requested from [`MixerDevice::read`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Ordinal,
    Mask,
    Levels { channels: usize },
}

/// Current setting of a control as stored by the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlValue {
    Ord(i32),
    Mask(i32),
    Levels(Vec<u8>),
}

impl ControlValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            ControlValue::Ord(_) => ValueKind::Ordinal,
            ControlValue::Mask(_) => ValueKind::Mask,
            ControlValue::Levels(levels) => ValueKind::Levels {
                channels: levels.len(),
            },
        }
    }
}

/// Synchronous access to a hardware (or simulated) mixer.
pub trait MixerDevice {
    /// Lists every descriptor in index order.
    fn enumerate(&mut self) -> Result<Vec<DeviceDescriptor>>;

    /// Reads the current value of the control at `index`.
    fn read(&mut self, index: usize, kind: ValueKind) -> Result<ControlValue>;

    /// Replaces the value of the control at `index`.
    fn write(&mut self, index: usize, value: &ControlValue) -> Result<()>;
}

impl<D: MixerDevice + ?Sized> MixerDevice for Box<D> {
    fn enumerate(&mut self) -> Result<Vec<DeviceDescriptor>> {
        (**self).enumerate()
    }

    fn read(&mut self, index: usize, kind: ValueKind) -> Result<ControlValue> {
        (**self).read(index, kind)
    }

    fn write(&mut self, index: usize, value: &ControlValue) -> Result<()> {
        (**self).write(index, value)
    }
}

/// Opens the mixer at `path`.
///
/// Files with a `.json` extension are loaded as a [`MixerSnapshot`] and served
/// from memory; anything else is treated as a native mixer device node.
pub fn open_device(path: &Path) -> Result<Box<dyn MixerDevice>> {
    if path.extension().is_some_and(|ext| ext == "json") {
        tracing::info!(?path, "loading mixer snapshot");
        return Ok(Box::new(MemoryDevice::from_path(path)?));
    }
    open_native(path)
}

#[cfg(target_os = "netbsd")]
fn open_native(path: &Path) -> Result<Box<dyn MixerDevice>> {
    tracing::info!(?path, "opening mixer device");
    Ok(Box::new(SysMixer::open(path)?))
}

#[cfg(not(target_os = "netbsd"))]
fn open_native(path: &Path) -> Result<Box<dyn MixerDevice>> {
    Err(MixerError::Unsupported(format!(
        "{}: native mixer devices are only supported on NetBSD; pass a .json mixer snapshot instead",
        path.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_descriptors() {
        let json = r#"[
            {"index": 0, "label": "outputs", "class": 0, "type": "class"},
            {"index": 1, "label": "master", "class": 0, "type": "value", "channels": 2, "delta": 8},
            {"index": 2, "label": "mute", "class": 0, "prev": 1, "type": "enum",
             "members": [{"label": "off", "ord": 0}, {"label": "on", "ord": 1}]}
        ]"#;
        let descriptors: Vec<DeviceDescriptor> = serde_json::from_str(json).unwrap();

        assert_eq!(descriptors[0].kind, DescriptorKind::Class);
        assert_eq!(
            descriptors[1].kind,
            DescriptorKind::Value {
                channels: 2,
                delta: 8
            }
        );
        assert_eq!(descriptors[2].prev, Some(1));
        assert_eq!(descriptors[2].next, None);
    }

    #[test]
    fn opens_json_snapshots_from_disk() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/mixer.json");
        let mut device = open_device(&path).unwrap();

        let descriptors = device.enumerate().unwrap();
        assert_eq!(descriptors.len(), 9);
        assert_eq!(
            device.read(7, ValueKind::Mask).unwrap(),
            ControlValue::Mask(2)
        );
    }

    #[cfg(not(target_os = "netbsd"))]
    #[test]
    fn native_devices_are_unsupported_off_netbsd() {
        let err = match open_device(Path::new("/dev/mixer")) {
            Err(err) => err,
            Ok(_) => panic!("native device should not open"),
        };
        assert!(matches!(err, MixerError::Unsupported(_)));
    }
}
