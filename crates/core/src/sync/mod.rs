//! Reads and writes of control values against the device, including the
//! channel-lock rules of multi-channel level controls.

use crate::catalog::{Control, ControlKind};
use crate::device::{ControlValue, MixerDevice, ValueKind, MAX_LEVEL};
use crate::{MixerError, Result};

/// Applies a signed step to a level, clamped to the slider range.
pub fn step_level(level: u8, delta: u8, increase: bool) -> u8 {
    if increase {
        level.saturating_add(delta).min(MAX_LEVEL)
    } else {
        level.saturating_sub(delta)
    }
}

/// Owner of the device handle. Every value exchanged with the mixer during a
/// session goes through here.
#[derive(Debug)]
pub struct ValueSync<D> {
    device: D,
}

impl<D: MixerDevice> ValueSync<D> {
    pub fn new(device: D) -> Self {
        Self { device }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Reads the device value of an enum/set control and returns the first
    /// member carrying it. `None` when no member matches.
    pub fn discrete_selection(&mut self, control: &Control) -> Result<Option<usize>> {
        let value = self.device.read(control.index, control.value_kind())?;
        let selection = match (&control.kind, value) {
            (ControlKind::Enum(e), ControlValue::Ord(ord)) => {
                e.members.iter().position(|m| m.ord == ord)
            }
            (ControlKind::Set(s), ControlValue::Mask(mask)) => {
                s.members.iter().position(|m| m.mask == mask)
            }
            _ => return Err(mismatch(control, "ordinal or mask")),
        };
        Ok(selection)
    }

    /// Reads the selection and caches it on the control.
    pub fn refresh_selection(&mut self, control: &mut Control) -> Result<Option<usize>> {
        let selection = self.discrete_selection(control)?;
        match &mut control.kind {
            ControlKind::Enum(e) => e.selected = selection,
            ControlKind::Set(s) => s.selected = selection,
            ControlKind::Value(_) => {}
        }
        Ok(selection)
    }

    /// Writes the ordinal or mask of `member` and marks it selected. On error
    /// the control is left as it was.
    pub fn set_discrete(&mut self, control: &mut Control, member: usize) -> Result<()> {
        let value = match &control.kind {
            ControlKind::Enum(e) => e.members.get(member).map(|m| ControlValue::Ord(m.ord)),
            ControlKind::Set(s) => s.members.get(member).map(|m| ControlValue::Mask(m.mask)),
            ControlKind::Value(_) => return Err(mismatch(control, "ordinal or mask")),
        }
        .ok_or_else(|| {
            MixerError::msg(format!("control {} has no member {member}", control.index))
        })?;

        self.device.write(control.index, &value)?;
        match &mut control.kind {
            ControlKind::Enum(e) => e.selected = Some(member),
            ControlKind::Set(s) => s.selected = Some(member),
            ControlKind::Value(_) => {}
        }
        Ok(())
    }

    /// Reads the per-channel levels of a value control.
    pub fn levels(&mut self, control: &Control) -> Result<Vec<u8>> {
        let channels = match &control.kind {
            ControlKind::Value(value) => value.channels(),
            _ => return Err(mismatch(control, "level")),
        };
        match self.device.read(control.index, ValueKind::Levels { channels })? {
            ControlValue::Levels(mut levels) => {
                levels.resize(channels, 0);
                Ok(levels)
            }
            _ => Err(mismatch(control, "level")),
        }
    }

    /// Reads the levels and caches them on the control.
    pub fn refresh_levels(&mut self, control: &mut Control) -> Result<()> {
        let levels = self.levels(control)?;
        if let Some(value) = control.as_value_mut() {
            value.levels = levels;
        }
        Ok(())
    }

    /// Sets `channel` of a value control to `level`.
    ///
    /// With channels locked together every channel receives `level`. With
    /// channels unlocked the device is re-read first so that the other
    /// channels keep their current hardware values. On error nothing is
    /// cached and the device keeps its previous state.
    pub fn set_level(&mut self, control: &mut Control, channel: usize, level: u8) -> Result<Vec<u8>> {
        let (channels, unlocked) = match &control.kind {
            ControlKind::Value(value) => (value.channels(), value.channels_unlocked),
            _ => return Err(mismatch(control, "level")),
        };
        if channel >= channels {
            return Err(MixerError::msg(format!(
                "control {} has no channel {channel}",
                control.index
            )));
        }

        let levels = if unlocked {
            let mut levels = self.levels(control)?;
            levels[channel] = level;
            levels
        } else {
            vec![level; channels]
        };

        self.device
            .write(control.index, &ControlValue::Levels(levels.clone()))?;
        if let Some(value) = control.as_value_mut() {
            value.levels.clone_from(&levels);
        }
        Ok(levels)
    }
}

fn mismatch(control: &Control, expected: &'static str) -> MixerError {
    MixerError::TypeMismatch {
        index: control.index,
        expected,
    }
}
