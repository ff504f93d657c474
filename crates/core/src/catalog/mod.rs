//! Hierarchical class/control model built from the flat device enumeration.

use std::collections::HashMap;

use crate::config::CatalogLimits;
use crate::device::{DescriptorKind, DeviceDescriptor, EnumMember, SetMember, ValueKind};

/// Step applied to value controls whose device reports a delta of zero.
pub const DEFAULT_DELTA: u8 = 8;

/// Rows taken by a single enum/set widget or a single value channel slider.
pub const WIDGET_ROWS: usize = 3;

/// Top-level grouping of controls.
#[derive(Debug, Clone, PartialEq)]
pub struct MixerClass {
    pub id: i32,
    pub name: String,
    pub controls: Vec<Control>,
}

/// A single adjustable mixer parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Control {
    /// Display name; `root.label` for controls hanging off another control.
    pub name: String,
    /// Device index of the control.
    pub index: usize,
    pub next: Option<usize>,
    pub prev: Option<usize>,
    pub kind: ControlKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControlKind {
    Enum(DiscreteControl<EnumMember>),
    Set(DiscreteControl<SetMember>),
    Value(ValueControl),
}

/// Enum or set control: a member table plus the member currently shown as
/// selected.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteControl<M> {
    pub members: Vec<M>,
    /// Member matching the last value read from or written to the device.
    pub selected: Option<usize>,
}

impl<M> DiscreteControl<M> {
    fn new(members: Vec<M>) -> Self {
        Self {
            members,
            selected: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueControl {
    channels: usize,
    pub delta: u8,
    /// Last levels read from or written to the device, one per channel.
    pub levels: Vec<u8>,
    current_channel: usize,
    /// When false, all channels move together.
    pub channels_unlocked: bool,
}

impl ValueControl {
    pub fn new(channels: usize, delta: u8) -> Self {
        let channels = channels.max(1);
        Self {
            channels,
            delta: if delta == 0 { DEFAULT_DELTA } else { delta },
            levels: vec![0; channels],
            current_channel: 0,
            channels_unlocked: false,
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn current_channel(&self) -> usize {
        self.current_channel
    }

    /// Points at `channel`, clamped to the last channel.
    pub fn set_current_channel(&mut self, channel: usize) {
        self.current_channel = channel.min(self.channels - 1);
    }

    /// Cached level of `channel`.
    pub fn level(&self, channel: usize) -> u8 {
        self.levels.get(channel).copied().unwrap_or(0)
    }

    pub fn toggle_lock(&mut self) -> bool {
        self.channels_unlocked = !self.channels_unlocked;
        self.channels_unlocked
    }
}

impl Control {
    /// Rows this control occupies on screen.
    pub fn display_height(&self) -> usize {
        match &self.kind {
            ControlKind::Enum(_) | ControlKind::Set(_) => WIDGET_ROWS,
            ControlKind::Value(value) => WIDGET_ROWS * value.channels(),
        }
    }

    /// Shape of the value this control stores on the device.
    pub fn value_kind(&self) -> ValueKind {
        match &self.kind {
            ControlKind::Enum(_) => ValueKind::Ordinal,
            ControlKind::Set(_) => ValueKind::Mask,
            ControlKind::Value(value) => ValueKind::Levels {
                channels: value.channels(),
            },
        }
    }

    /// Labels of the enum/set members, empty for value controls.
    pub fn member_labels(&self) -> Vec<&str> {
        match &self.kind {
            ControlKind::Enum(e) => e.members.iter().map(|m| m.label.as_str()).collect(),
            ControlKind::Set(s) => s.members.iter().map(|m| m.label.as_str()).collect(),
            ControlKind::Value(_) => Vec::new(),
        }
    }

    pub fn selected_member(&self) -> Option<usize> {
        match &self.kind {
            ControlKind::Enum(e) => e.selected,
            ControlKind::Set(s) => s.selected,
            ControlKind::Value(_) => None,
        }
    }

    pub fn as_value(&self) -> Option<&ValueControl> {
        match &self.kind {
            ControlKind::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_value_mut(&mut self) -> Option<&mut ValueControl> {
        match &mut self.kind {
            ControlKind::Value(value) => Some(value),
            _ => None,
        }
    }
}

impl MixerClass {
    /// Per-control display heights, in control order.
    pub fn heights(&self) -> Vec<usize> {
        self.controls.iter().map(Control::display_height).collect()
    }
}

/// All classes of the device in enumeration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    classes: Vec<MixerClass>,
    /// Device index to (class position, control position).
    locations: HashMap<usize, (usize, usize)>,
}

impl Catalog {
    /// Builds the catalog with the default capacity.
    pub fn build(descriptors: &[DeviceDescriptor]) -> Self {
        Self::build_with_limits(descriptors, &CatalogLimits::default())
    }

    /// Builds the catalog in two passes: classes first, then controls in
    /// enumeration order. Entries that cannot be placed are dropped.
    pub fn build_with_limits(descriptors: &[DeviceDescriptor], limits: &CatalogLimits) -> Self {
        let mut catalog = Catalog::default();

        for descriptor in descriptors {
            if descriptor.kind != DescriptorKind::Class {
                continue;
            }
            if catalog.classes.len() >= limits.max_classes {
                tracing::debug!(index = descriptor.index, "class capacity reached, dropping class");
                continue;
            }
            if catalog.class_position(descriptor.class_id).is_some() {
                tracing::debug!(id = descriptor.class_id, "duplicate class id, dropping class");
                continue;
            }
            catalog.classes.push(MixerClass {
                id: descriptor.class_id,
                name: descriptor.label.clone(),
                controls: Vec::new(),
            });
        }

        for descriptor in descriptors {
            let kind = match &descriptor.kind {
                DescriptorKind::Class => continue,
                DescriptorKind::Enum { members } => ControlKind::Enum(DiscreteControl::new(
                    members.iter().take(limits.max_members).cloned().collect(),
                )),
                DescriptorKind::Set { members } => ControlKind::Set(DiscreteControl::new(
                    members.iter().take(limits.max_members).cloned().collect(),
                )),
                DescriptorKind::Value { channels, delta } => ControlKind::Value(ValueControl::new(
                    (*channels).min(limits.max_channels),
                    *delta,
                )),
            };

            let Some(position) = catalog.class_position(descriptor.class_id) else {
                tracing::debug!(
                    index = descriptor.index,
                    class = descriptor.class_id,
                    "control names an unknown class, dropping"
                );
                continue;
            };
            if catalog.classes[position].controls.len() >= limits.max_controls {
                tracing::debug!(index = descriptor.index, "class is full, dropping control");
                continue;
            }

            let name = match descriptor.prev.and_then(|prev| catalog.root_control(prev)) {
                Some(root) => format!("{}.{}", root.name, descriptor.label),
                None => descriptor.label.clone(),
            };

            let controls = &mut catalog.classes[position].controls;
            catalog
                .locations
                .entry(descriptor.index)
                .or_insert((position, controls.len()));
            controls.push(Control {
                name,
                index: descriptor.index,
                next: descriptor.next,
                prev: descriptor.prev,
                kind,
            });
        }

        catalog
    }

    pub fn classes(&self) -> &[MixerClass] {
        &self.classes
    }

    pub fn class(&self, position: usize) -> Option<&MixerClass> {
        self.classes.get(position)
    }

    pub fn class_mut(&mut self, position: usize) -> Option<&mut MixerClass> {
        self.classes.get_mut(position)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Position of the class with device id `id`.
    pub fn class_position(&self, id: i32) -> Option<usize> {
        self.classes.iter().position(|class| class.id == id)
    }

    /// Finds a control anywhere in the catalog by device index.
    pub fn control(&self, index: usize) -> Option<&Control> {
        let &(class, position) = self.locations.get(&index)?;
        self.classes.get(class)?.controls.get(position)
    }

    /// Follows `prev` links from the control at `index` up to the control with
    /// no parent. Returns `None` when a link cannot be resolved or the chain
    /// does not terminate within the number of stored controls.
    pub fn root_control(&self, index: usize) -> Option<&Control> {
        let mut control = self.control(index)?;
        for _ in 0..=self.locations.len() {
            match control.prev {
                None => return Some(control),
                Some(prev) => control = self.control(prev)?,
            }
        }
        tracing::debug!(index, "parent chain does not terminate");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(index: usize, id: i32, label: &str) -> DeviceDescriptor {
        DeviceDescriptor {
            index,
            label: label.into(),
            class_id: id,
            next: None,
            prev: None,
            kind: DescriptorKind::Class,
        }
    }

    fn value(index: usize, class_id: i32, label: &str, channels: usize, delta: u8) -> DeviceDescriptor {
        DeviceDescriptor {
            index,
            label: label.into(),
            class_id,
            next: None,
            prev: None,
            kind: DescriptorKind::Value { channels, delta },
        }
    }

    fn toggle(index: usize, class_id: i32, label: &str, prev: Option<usize>) -> DeviceDescriptor {
        DeviceDescriptor {
            index,
            label: label.into(),
            class_id,
            next: None,
            prev,
            kind: DescriptorKind::Enum {
                members: vec![
                    EnumMember {
                        label: "off".into(),
                        ord: 0,
                    },
                    EnumMember {
                        label: "on".into(),
                        ord: 1,
                    },
                ],
            },
        }
    }

    #[test]
    fn groups_controls_under_their_class() {
        let descriptors = vec![
            value(0, 1, "master", 2, 8),
            class(1, 0, "inputs"),
            class(2, 1, "outputs"),
            value(3, 0, "mic", 1, 4),
        ];
        let catalog = Catalog::build(&descriptors);

        assert_eq!(catalog.len(), 2);
        let inputs = catalog.class(0).unwrap();
        let outputs = catalog.class(1).unwrap();
        assert_eq!(inputs.name, "inputs");
        assert_eq!(inputs.controls[0].name, "mic");
        assert_eq!(outputs.controls[0].name, "master");
    }

    #[test]
    fn drops_controls_with_unknown_class() {
        let descriptors = vec![class(0, 0, "outputs"), value(1, 7, "ghost", 1, 8)];
        let catalog = Catalog::build(&descriptors);

        assert!(catalog.class(0).unwrap().controls.is_empty());
        assert!(catalog.control(1).is_none());
    }

    #[test]
    fn composite_names_use_the_chain_root() {
        let descriptors = vec![
            class(0, 0, "outputs"),
            value(1, 0, "master", 2, 8),
            toggle(2, 0, "mute", Some(1)),
            toggle(3, 0, "boost", Some(2)),
        ];
        let catalog = Catalog::build(&descriptors);
        let controls = &catalog.class(0).unwrap().controls;

        assert_eq!(controls[0].name, "master");
        assert_eq!(controls[1].name, "master.mute");
        assert_eq!(controls[2].name, "master.boost");
    }

    #[test]
    fn cyclic_parent_links_terminate() {
        let descriptors = vec![
            class(0, 0, "outputs"),
            toggle(1, 0, "a", Some(2)),
            toggle(2, 0, "b", Some(1)),
        ];
        let catalog = Catalog::build(&descriptors);
        let controls = &catalog.class(0).unwrap().controls;

        assert_eq!(controls[0].name, "a");
        assert_eq!(controls[1].name, "b");
        assert!(catalog.root_control(1).is_none());
    }

    #[test]
    fn long_parent_chains_resolve_by_index() {
        let descriptors: Vec<_> = std::iter::once(class(0, 0, "outputs"))
            .chain(std::iter::once(value(1, 0, "root", 1, 8)))
            .chain((2..=60).map(|i| toggle(i, 0, &format!("c{i}"), Some(i - 1))))
            .collect();
        let catalog = Catalog::build(&descriptors);
        let controls = &catalog.class(0).unwrap().controls;

        assert_eq!(controls.len(), 60);
        assert_eq!(controls[59].name, "root.c60");
        assert_eq!(catalog.control(60).unwrap().name, "root.c60");
        assert_eq!(catalog.root_control(60).unwrap().index, 1);
    }

    #[test]
    fn excess_entries_are_dropped() {
        let limits = CatalogLimits {
            max_classes: 1,
            max_controls: 2,
            ..CatalogLimits::default()
        };
        let descriptors = vec![
            class(0, 0, "outputs"),
            class(1, 1, "inputs"),
            value(2, 0, "a", 1, 8),
            value(3, 0, "b", 1, 8),
            value(4, 0, "c", 1, 8),
            value(5, 1, "d", 1, 8),
        ];
        let catalog = Catalog::build_with_limits(&descriptors, &limits);

        assert_eq!(catalog.len(), 1);
        let names: Vec<_> = catalog.class(0).unwrap().controls.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn value_controls_get_defaults_and_heights() {
        let descriptors = vec![class(0, 0, "outputs"), value(1, 0, "master", 2, 0), toggle(2, 0, "mute", None)];
        let catalog = Catalog::build(&descriptors);
        let outputs = catalog.class(0).unwrap();

        let master = outputs.controls[0].as_value().unwrap();
        assert_eq!(master.delta, DEFAULT_DELTA);
        assert!(!master.channels_unlocked);
        assert_eq!(master.current_channel(), 0);
        assert_eq!(outputs.heights(), vec![6, 3]);
    }

    #[test]
    fn channel_counts_are_bounded() {
        let descriptors = vec![class(0, 0, "outputs"), value(1, 0, "surround", 12, 8), value(2, 0, "none", 0, 8)];
        let catalog = Catalog::build(&descriptors);
        let controls = &catalog.class(0).unwrap().controls;

        assert_eq!(controls[0].as_value().unwrap().channels(), 8);
        assert_eq!(controls[1].as_value().unwrap().channels(), 1);
    }
}
