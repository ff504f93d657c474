//! Native mixer access through the NetBSD audio(4) ioctl interface.

use std::ffi::CStr;
use std::fs::{File, OpenOptions};
use std::os::fd::AsRawFd;
use std::path::Path;

use libc::{c_char, c_int, c_ulong};

use super::{
    ControlValue, DescriptorKind, DeviceDescriptor, EnumMember, MixerDevice, SetMember, ValueKind,
};
use crate::{error::DeviceOp, MixerError, Result};

const MAX_AUDIO_DEV_LEN: usize = 16;
const AUDIO_MIXER_MAX_MEMBERS: usize = 32;
const AUDIO_MIXER_MAX_CHANNELS: usize = 8;

const AUDIO_MIXER_CLASS: c_int = 0;
const AUDIO_MIXER_ENUM: c_int = 1;
const AUDIO_MIXER_SET: c_int = 2;
const AUDIO_MIXER_VALUE: c_int = 3;

const AUDIO_MIXER_LAST: c_int = -1;

#[repr(C)]
#[derive(Clone, Copy)]
struct AudioMixerName {
    name: [c_char; MAX_AUDIO_DEV_LEN],
    msg_id: c_int,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawEnumMember {
    label: AudioMixerName,
    ord: c_int,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawEnum {
    num_mem: c_int,
    member: [RawEnumMember; AUDIO_MIXER_MAX_MEMBERS],
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawSetMember {
    label: AudioMixerName,
    mask: c_int,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawSet {
    num_mem: c_int,
    member: [RawSetMember; AUDIO_MIXER_MAX_MEMBERS],
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawValueInfo {
    units: AudioMixerName,
    num_channels: c_int,
    delta: c_int,
}

#[repr(C)]
union RawDevinfoPayload {
    e: RawEnum,
    s: RawSet,
    v: RawValueInfo,
}

/// `mixer_devinfo_t`
#[repr(C)]
struct RawDevinfo {
    index: c_int,
    label: AudioMixerName,
    kind: c_int,
    mixer_class: c_int,
    next: c_int,
    prev: c_int,
    un: RawDevinfoPayload,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawLevel {
    num_channels: c_int,
    level: [u8; AUDIO_MIXER_MAX_CHANNELS],
}

#[repr(C)]
union RawCtrlPayload {
    ord: c_int,
    mask: c_int,
    value: RawLevel,
}

/// `mixer_ctrl_t`
#[repr(C)]
struct RawCtrl {
    dev: c_int,
    kind: c_int,
    un: RawCtrlPayload,
}

const IOC_INOUT: c_ulong = 0x4000_0000 | 0x8000_0000;
const IOCPARM_MASK: c_ulong = 0x1fff;

const fn iowr(group: u8, num: u8, len: usize) -> c_ulong {
    IOC_INOUT | (((len as c_ulong) & IOCPARM_MASK) << 16) | ((group as c_ulong) << 8) | num as c_ulong
}

const AUDIO_MIXER_READ: c_ulong = iowr(b'M', 0, std::mem::size_of::<RawCtrl>());
const AUDIO_MIXER_WRITE: c_ulong = iowr(b'M', 1, std::mem::size_of::<RawCtrl>());
const AUDIO_MIXER_DEVINFO: c_ulong = iowr(b'M', 2, std::mem::size_of::<RawDevinfo>());

/// Handle on a NetBSD mixer device node. The descriptor is closed when the
/// handle is dropped.
#[derive(Debug)]
pub struct SysMixer {
    file: File,
}

impl SysMixer {
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|err| MixerError::msg(format!("open({}): {err}", path.display())))?;
        Ok(Self { file })
    }

    fn ioctl<T>(&self, request: c_ulong, arg: &mut T) -> std::io::Result<()> {
        // SAFETY: `arg` points to a live, correctly laid out argument struct
        // for `request`, and the descriptor stays open for the call.
        let rc = unsafe { libc::ioctl(self.file.as_raw_fd(), request, arg as *mut T) };
        if rc < 0 {
            Err(std::io::Error::last_os_error())
        } else {
            Ok(())
        }
    }
}

fn label(name: &AudioMixerName) -> String {
    let bytes: Vec<u8> = name
        .name
        .iter()
        .map(|c| *c as u8)
        .chain(std::iter::once(0))
        .collect();
    CStr::from_bytes_until_nul(&bytes)
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn link(raw: c_int) -> Option<usize> {
    if raw == AUDIO_MIXER_LAST {
        None
    } else {
        usize::try_from(raw).ok()
    }
}

fn member_count(raw: c_int) -> usize {
    usize::try_from(raw).unwrap_or(0).min(AUDIO_MIXER_MAX_MEMBERS)
}

impl MixerDevice for SysMixer {
    fn enumerate(&mut self) -> Result<Vec<DeviceDescriptor>> {
        let mut descriptors = Vec::new();
        for index in 0.. {
            // SAFETY: all-zero is a valid bit pattern for these plain C structs.
            let mut info: RawDevinfo = unsafe { std::mem::zeroed() };
            info.index = index;
            if self.ioctl(AUDIO_MIXER_DEVINFO, &mut info).is_err() {
                break;
            }

            // SAFETY: the active union member is selected by `info.kind`.
            let kind = match info.kind {
                AUDIO_MIXER_CLASS => DescriptorKind::Class,
                AUDIO_MIXER_ENUM => {
                    let e = unsafe { &info.un.e };
                    DescriptorKind::Enum {
                        members: e.member[..member_count(e.num_mem)]
                            .iter()
                            .map(|m| EnumMember {
                                label: label(&m.label),
                                ord: m.ord,
                            })
                            .collect(),
                    }
                }
                AUDIO_MIXER_SET => {
                    let s = unsafe { &info.un.s };
                    DescriptorKind::Set {
                        members: s.member[..member_count(s.num_mem)]
                            .iter()
                            .map(|m| SetMember {
                                label: label(&m.label),
                                mask: m.mask,
                            })
                            .collect(),
                    }
                }
                AUDIO_MIXER_VALUE => {
                    let v = unsafe { &info.un.v };
                    DescriptorKind::Value {
                        channels: usize::try_from(v.num_channels).unwrap_or(0),
                        delta: u8::try_from(v.delta).unwrap_or(u8::MAX),
                    }
                }
                other => {
                    tracing::debug!(index, kind = other, "skipping unknown mixer entry");
                    continue;
                }
            };

            descriptors.push(DeviceDescriptor {
                index: index as usize,
                label: label(&info.label),
                class_id: info.mixer_class,
                next: link(info.next),
                prev: link(info.prev),
                kind,
            });
        }
        Ok(descriptors)
    }

    fn read(&mut self, index: usize, kind: ValueKind) -> Result<ControlValue> {
        // SAFETY: all-zero is a valid bit pattern for `mixer_ctrl_t`.
        let mut ctrl: RawCtrl = unsafe { std::mem::zeroed() };
        ctrl.dev = index as c_int;
        ctrl.kind = match kind {
            ValueKind::Ordinal => AUDIO_MIXER_ENUM,
            ValueKind::Mask => AUDIO_MIXER_SET,
            ValueKind::Levels { channels } => {
                ctrl.un.value = RawLevel {
                    num_channels: channels.min(AUDIO_MIXER_MAX_CHANNELS) as c_int,
                    level: [0; AUDIO_MIXER_MAX_CHANNELS],
                };
                AUDIO_MIXER_VALUE
            }
        };
        self.ioctl(AUDIO_MIXER_READ, &mut ctrl)
            .map_err(|err| MixerError::device(DeviceOp::Read, index, err))?;

        // SAFETY: the driver filled the member matching `ctrl.kind`.
        let value = unsafe {
            match kind {
                ValueKind::Ordinal => ControlValue::Ord(ctrl.un.ord),
                ValueKind::Mask => ControlValue::Mask(ctrl.un.mask),
                ValueKind::Levels { channels } => {
                    let count = channels.min(AUDIO_MIXER_MAX_CHANNELS);
                    ControlValue::Levels(ctrl.un.value.level[..count].to_vec())
                }
            }
        };
        Ok(value)
    }

    fn write(&mut self, index: usize, value: &ControlValue) -> Result<()> {
        // SAFETY: all-zero is a valid bit pattern for `mixer_ctrl_t`.
        let mut ctrl: RawCtrl = unsafe { std::mem::zeroed() };
        ctrl.dev = index as c_int;
        match value {
            ControlValue::Ord(ord) => {
                ctrl.kind = AUDIO_MIXER_ENUM;
                ctrl.un.ord = *ord;
            }
            ControlValue::Mask(mask) => {
                ctrl.kind = AUDIO_MIXER_SET;
                ctrl.un.mask = *mask;
            }
            ControlValue::Levels(levels) => {
                if levels.len() > AUDIO_MIXER_MAX_CHANNELS {
                    return Err(MixerError::TypeMismatch {
                        index,
                        expected: "at most 8 channel levels",
                    });
                }
                ctrl.kind = AUDIO_MIXER_VALUE;
                let mut raw = RawLevel {
                    num_channels: levels.len() as c_int,
                    level: [0; AUDIO_MIXER_MAX_CHANNELS],
                };
                raw.level[..levels.len()].copy_from_slice(levels);
                ctrl.un.value = raw;
            }
        }
        self.ioctl(AUDIO_MIXER_WRITE, &mut ctrl)
            .map_err(|err| MixerError::device(DeviceOp::Write, index, err))
    }
}
