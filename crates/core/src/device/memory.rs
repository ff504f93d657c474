use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{ControlValue, DescriptorKind, DeviceDescriptor, MixerDevice, ValueKind};
use crate::{error::DeviceOp, MixerError, Result};

/// Serialised form of a mixer: its descriptors plus initial control values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MixerSnapshot {
    pub descriptors: Vec<DeviceDescriptor>,
    /// Initial values keyed by descriptor index. Controls without an entry
    /// start at zero.
    #[serde(default)]
    pub values: HashMap<usize, ControlValue>,
}

/// Mixer held entirely in memory. Used for snapshot files and as the device
/// double in tests.
#[derive(Debug, Default)]
pub struct MemoryDevice {
    descriptors: Vec<DeviceDescriptor>,
    values: HashMap<usize, ControlValue>,
    fail_reads: bool,
    fail_writes: bool,
    writes: usize,
}

impl MemoryDevice {
    pub fn new(descriptors: Vec<DeviceDescriptor>) -> Self {
        Self::from_snapshot(MixerSnapshot {
            descriptors,
            values: HashMap::new(),
        })
    }

    pub fn from_snapshot(snapshot: MixerSnapshot) -> Self {
        Self {
            descriptors: snapshot.descriptors,
            values: snapshot.values,
            ..Default::default()
        }
    }

    /// Loads a JSON [`MixerSnapshot`] from disk.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let snapshot: MixerSnapshot = serde_json::from_str(&text)?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// Replaces a stored value without going through [`MixerDevice::write`],
    /// the way another program changing the mixer would.
    pub fn set_value(&mut self, index: usize, value: ControlValue) {
        self.values.insert(index, value);
    }

    pub fn value(&self, index: usize) -> Option<&ControlValue> {
        self.values.get(&index)
    }

    pub fn fail_reads(&mut self, fail: bool) {
        self.fail_reads = fail;
    }

    pub fn fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes
    }

    fn descriptor(&self, index: usize) -> Option<&DeviceDescriptor> {
        self.descriptors.iter().find(|d| d.index == index)
    }
}

fn accepts(kind: &DescriptorKind, requested: ValueKind) -> bool {
    matches!(
        (kind, requested),
        (DescriptorKind::Enum { .. }, ValueKind::Ordinal)
            | (DescriptorKind::Set { .. }, ValueKind::Mask)
            | (DescriptorKind::Value { .. }, ValueKind::Levels { .. })
    )
}

impl MixerDevice for MemoryDevice {
    fn enumerate(&mut self) -> Result<Vec<DeviceDescriptor>> {
        let mut descriptors = self.descriptors.clone();
        descriptors.sort_by_key(|d| d.index);
        Ok(descriptors)
    }

    fn read(&mut self, index: usize, kind: ValueKind) -> Result<ControlValue> {
        if self.fail_reads {
            return Err(MixerError::device(DeviceOp::Read, index, "device busy"));
        }
        let descriptor = self
            .descriptor(index)
            .ok_or_else(|| MixerError::device(DeviceOp::Read, index, "no such control"))?;
        if !accepts(&descriptor.kind, kind) {
            return Err(MixerError::device(DeviceOp::Read, index, "invalid argument"));
        }

        let stored = self.values.get(&index);
        let value = match kind {
            ValueKind::Ordinal => match stored {
                Some(ControlValue::Ord(ord)) => ControlValue::Ord(*ord),
                _ => ControlValue::Ord(0),
            },
            ValueKind::Mask => match stored {
                Some(ControlValue::Mask(mask)) => ControlValue::Mask(*mask),
                _ => ControlValue::Mask(0),
            },
            ValueKind::Levels { channels } => {
                let mut levels = match stored {
                    Some(ControlValue::Levels(levels)) => levels.clone(),
                    _ => Vec::new(),
                };
                levels.resize(channels, 0);
                ControlValue::Levels(levels)
            }
        };
        Ok(value)
    }

    fn write(&mut self, index: usize, value: &ControlValue) -> Result<()> {
        if self.fail_writes {
            return Err(MixerError::device(DeviceOp::Write, index, "device busy"));
        }
        let descriptor = self
            .descriptor(index)
            .ok_or_else(|| MixerError::device(DeviceOp::Write, index, "no such control"))?;
        if !accepts(&descriptor.kind, value.kind()) {
            return Err(MixerError::device(DeviceOp::Write, index, "invalid argument"));
        }

        self.values.insert(index, value.clone());
        self.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> MemoryDevice {
        MemoryDevice::new(vec![
            DeviceDescriptor {
                index: 0,
                label: "outputs".into(),
                class_id: 0,
                next: None,
                prev: None,
                kind: DescriptorKind::Class,
            },
            DeviceDescriptor {
                index: 1,
                label: "master".into(),
                class_id: 0,
                next: None,
                prev: None,
                kind: DescriptorKind::Value {
                    channels: 2,
                    delta: 8,
                },
            },
        ])
    }

    #[test]
    fn unset_levels_read_as_zero() {
        let mut device = device();
        let value = device.read(1, ValueKind::Levels { channels: 2 }).unwrap();
        assert_eq!(value, ControlValue::Levels(vec![0, 0]));
    }

    #[test]
    fn rejects_values_of_the_wrong_shape() {
        let mut device = device();
        assert!(device.write(1, &ControlValue::Ord(1)).is_err());
        assert!(device.read(0, ValueKind::Ordinal).is_err());
        assert_eq!(device.write_count(), 0);
    }

    #[test]
    fn injected_failures_leave_values_untouched() {
        let mut device = device();
        device.set_value(1, ControlValue::Levels(vec![10, 20]));
        device.fail_writes(true);

        let err = device
            .write(1, &ControlValue::Levels(vec![0, 0]))
            .unwrap_err();
        assert!(format!("{err}").contains("write of control 1"));
        assert_eq!(device.value(1), Some(&ControlValue::Levels(vec![10, 20])));
    }

    #[test]
    fn loads_snapshot_json() {
        let json = r#"{
            "descriptors": [
                {"index": 0, "label": "inputs", "class": 3, "type": "class"},
                {"index": 1, "label": "mic", "class": 3, "type": "value", "channels": 1, "delta": 0}
            ],
            "values": {"1": {"levels": [42]}}
        }"#;
        let snapshot: MixerSnapshot = serde_json::from_str(json).unwrap();
        let mut device = MemoryDevice::from_snapshot(snapshot);

        assert_eq!(device.enumerate().unwrap().len(), 2);
        assert_eq!(
            device.read(1, ValueKind::Levels { channels: 1 }).unwrap(),
            ControlValue::Levels(vec![42])
        );
    }
}
