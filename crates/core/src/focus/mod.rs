//! Navigation state machine.
//!
//! A [`Session`] owns the catalog, the viewport and the device. Logical key
//! presses are fed to [`Session::handle`], which updates focus, commits values
//! through [`ValueSync`] and returns the [`Effect`]s the renderer has to apply,
//! in order.

use crate::catalog::{Catalog, Control, ControlKind};
use crate::config::{AppConfig, LayoutConfig};
use crate::device::MixerDevice;
use crate::sync::{step_level, ValueSync};
use crate::viewport::{Placement, Viewport};
use crate::Result;

/// Logical input understood by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    /// Confirm the current widget (Enter).
    Commit,
    Escape,
    /// Toggle whether the channels of a value control move independently.
    ToggleLock,
    /// Reserved. Mute has no behaviour yet.
    Mute,
    /// Jump to the class at this position.
    Class(usize),
    /// The terminal now has `height` rows.
    Resize { height: u16 },
}

/// What the operator is interacting with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    /// The class selector is active.
    ClassLevel { class: usize },
    ControlLevel {
        class: usize,
        control: usize,
        channel: usize,
    },
}

/// Part of the screen that must be drawn again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Region {
    ClassSelector,
    /// A single control of the current class.
    Control(usize),
    /// The visible window scrolled; controls move to these rows.
    Window(Vec<Placement>),
}

/// Instruction for the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// All widgets of this class are gone.
    DestroyClassWidgets { class: usize },
    /// Create the widgets of this class; `placements` lists the visible ones.
    BuildClassWidgets {
        class: usize,
        placements: Vec<Placement>,
    },
    SetFocus(Focus),
    Redraw(Region),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Result of handling one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub effects: Vec<Effect>,
    pub flow: Flow,
}

/// Where focus should go next.
#[derive(Debug, Clone, Copy)]
enum Target {
    Selector,
    Control(usize),
    Previous(usize),
    Next(usize),
}

/// One interactive mixer session.
#[derive(Debug)]
pub struct Session<D> {
    catalog: Catalog,
    viewport: Viewport,
    sync: ValueSync<D>,
    layout: LayoutConfig,
    class: usize,
    control: Option<usize>,
    built: Option<usize>,
    effects: Vec<Effect>,
}

impl<D: MixerDevice> Session<D> {
    /// Enumerates `device` and builds a session for a screen `height` rows
    /// tall.
    pub fn open(mut device: D, config: &AppConfig, height: u16) -> Result<Self> {
        let descriptors = device.enumerate()?;
        let catalog = Catalog::build_with_limits(&descriptors, &config.limits);
        tracing::info!(
            descriptors = descriptors.len(),
            classes = catalog.len(),
            "mixer catalog built"
        );
        Ok(Self::new(catalog, ValueSync::new(device), config.layout, height))
    }

    pub fn new(catalog: Catalog, sync: ValueSync<D>, layout: LayoutConfig, height: u16) -> Self {
        Self {
            catalog,
            viewport: Viewport::new(layout.row_budget(height)),
            sync,
            layout,
            class: 0,
            control: None,
            built: None,
            effects: Vec::new(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn sync(&self) -> &ValueSync<D> {
        &self.sync
    }

    pub fn sync_mut(&mut self) -> &mut ValueSync<D> {
        &mut self.sync
    }

    /// Index of the class currently shown.
    pub fn class(&self) -> usize {
        self.class
    }

    pub fn focus(&self) -> Focus {
        match self.control {
            None => Focus::ClassLevel { class: self.class },
            Some(control) => Focus::ControlLevel {
                class: self.class,
                control,
                channel: self.channel_of(control),
            },
        }
    }

    /// Builds the first class and focuses its first control.
    pub fn start(&mut self) -> Transition {
        if !self.catalog.is_empty() {
            self.show_class(0, true);
            self.select(Target::Control(0));
        }
        self.finish(Flow::Continue)
    }

    /// Applies one input and returns what changed.
    pub fn handle(&mut self, key: Key) -> Transition {
        if let Some(flow) = self.handle_global(key) {
            return self.finish(flow);
        }
        if self.catalog.is_empty() {
            let flow = if key == Key::Escape { Flow::Quit } else { Flow::Continue };
            return self.finish(flow);
        }

        let flow = match self.control {
            None => self.handle_class_level(key),
            Some(control) => match self.control_kind(control) {
                Some(Kind::Discrete) => self.handle_discrete(control, key),
                Some(Kind::Value) => self.handle_value(control, key),
                None => {
                    self.select(Target::Selector);
                    Flow::Continue
                }
            },
        };
        self.finish(flow)
    }

    fn handle_global(&mut self, key: Key) -> Option<Flow> {
        match key {
            Key::Class(class) => {
                if class < self.catalog.len() {
                    self.show_class(class, true);
                    self.select(Target::Control(0));
                } else {
                    tracing::debug!(class, "no such class");
                }
                Some(Flow::Continue)
            }
            Key::Resize { height } => {
                self.viewport.set_rows(self.layout.row_budget(height));
                if !self.catalog.is_empty() {
                    if let Some(control) = self.control {
                        let heights = self.heights();
                        self.viewport.scroll_to(&heights, control);
                    }
                    self.show_class(self.class, false);
                    let focus = self.focus();
                    self.effects.push(Effect::SetFocus(focus));
                }
                Some(Flow::Continue)
            }
            _ => None,
        }
    }

    fn handle_class_level(&mut self, key: Key) -> Flow {
        let count = self.catalog.len();
        match key {
            Key::Escape => return Flow::Quit,
            Key::Left | Key::Right => {
                let next = if key == Key::Left {
                    (self.class + count - 1) % count
                } else {
                    (self.class + 1) % count
                };
                self.show_class(next, true);
                self.effects.push(Effect::SetFocus(self.focus()));
                self.effects.push(Effect::Redraw(Region::ClassSelector));
            }
            Key::Down | Key::Commit => self.select(Target::Control(0)),
            _ => {}
        }
        Flow::Continue
    }

    fn handle_discrete(&mut self, control: usize, key: Key) -> Flow {
        match key {
            Key::Escape => self.select(Target::Selector),
            Key::Up => self.select(Target::Previous(control)),
            Key::Down => self.select(Target::Next(control)),
            Key::Left | Key::Right => {
                let Some(count) = self.member_count(control).filter(|&n| n > 0) else {
                    return Flow::Continue;
                };
                let current = self.control_ref(control).and_then(|c| c.selected_member()).unwrap_or(0);
                let member = if key == Key::Left {
                    (current + count - 1) % count
                } else {
                    (current + 1) % count
                };
                if self.commit_member(control, member) {
                    self.effects.push(Effect::Redraw(Region::Control(control)));
                }
            }
            Key::Commit => {
                if let Some(member) = self.control_ref(control).and_then(|c| c.selected_member()) {
                    self.commit_member(control, member);
                }
                self.select(Target::Next(control));
            }
            _ => {}
        }
        Flow::Continue
    }

    fn handle_value(&mut self, control: usize, key: Key) -> Flow {
        let channel = self.channel_of(control);
        let channels = self
            .control_ref(control)
            .and_then(|c| c.as_value())
            .map(|v| v.channels())
            .unwrap_or(1);

        match key {
            Key::Escape => self.select(Target::Selector),
            Key::Up => {
                if channel > 0 {
                    self.focus_channel(control, channel - 1);
                } else {
                    self.select(Target::Previous(control));
                }
            }
            Key::Down | Key::Commit => {
                if channel + 1 < channels {
                    self.focus_channel(control, channel + 1);
                } else {
                    self.set_channel(control, 0);
                    self.select(Target::Next(control));
                }
            }
            Key::Left | Key::Right => self.adjust_level(control, channel, key == Key::Right),
            Key::ToggleLock => {
                if let Some(value) = self.control_mut(control).and_then(|c| c.as_value_mut()) {
                    let unlocked = value.toggle_lock();
                    tracing::debug!(control, unlocked, "channel lock toggled");
                    self.effects.push(Effect::Redraw(Region::Control(control)));
                }
            }
            Key::Mute => tracing::debug!(control, "mute is not implemented"),
            _ => {}
        }
        Flow::Continue
    }

    /// Moves focus, resolving targets that fall outside the class into the
    /// class selector.
    fn select(&mut self, target: Target) {
        let mut target = target;
        loop {
            match target {
                Target::Selector => {
                    self.control = None;
                    self.effects.push(Effect::SetFocus(self.focus()));
                    return;
                }
                Target::Previous(control) => {
                    target = match control.checked_sub(1) {
                        Some(previous) => Target::Control(previous),
                        None => Target::Selector,
                    };
                }
                Target::Next(control) => target = Target::Control(control + 1),
                Target::Control(control) => {
                    if control >= self.class_len() {
                        target = Target::Selector;
                        continue;
                    }
                    if self.control != Some(control) {
                        self.set_channel(control, 0);
                    }
                    self.control = Some(control);

                    let heights = self.heights();
                    if self.viewport.scroll_to(&heights, control) {
                        self.effects
                            .push(Effect::Redraw(Region::Window(self.viewport.layout(&heights))));
                    }
                    self.refresh_control(control);
                    self.effects.push(Effect::SetFocus(self.focus()));
                    self.effects.push(Effect::Redraw(Region::Control(control)));
                    return;
                }
            }
        }
    }

    fn focus_channel(&mut self, control: usize, channel: usize) {
        self.set_channel(control, channel);
        self.refresh_control(control);
        self.effects.push(Effect::SetFocus(self.focus()));
        self.effects.push(Effect::Redraw(Region::Control(control)));
    }

    /// Replaces the displayed class. The old class's widgets are destroyed
    /// before the new ones are built.
    fn show_class(&mut self, class: usize, reset_scroll: bool) {
        if let Some(old) = self.built.take() {
            self.effects.push(Effect::DestroyClassWidgets { class: old });
        }
        if class != self.class {
            self.control = None;
        }
        self.class = class;
        if reset_scroll {
            self.viewport.reset();
        }

        for control in 0..self.class_len() {
            self.refresh_control(control);
        }

        let placements = self.viewport.layout(&self.heights());
        self.effects.push(Effect::BuildClassWidgets { class, placements });
        self.built = Some(class);
    }

    /// Re-reads the device value shown by a control. Failures are reported and
    /// the cached value is kept.
    fn refresh_control(&mut self, control: usize) {
        let Some(entry) = self
            .catalog
            .class_mut(self.class)
            .and_then(|class| class.controls.get_mut(control))
        else {
            return;
        };
        let result = if matches!(entry.kind, ControlKind::Value(_)) {
            self.sync.refresh_levels(entry)
        } else {
            self.sync.refresh_selection(entry).map(|_| ())
        };
        if let Err(err) = result {
            tracing::warn!(control = entry.index, error = %err, "failed to read control");
        }
    }

    fn commit_member(&mut self, control: usize, member: usize) -> bool {
        let Some(entry) = self
            .catalog
            .class_mut(self.class)
            .and_then(|class| class.controls.get_mut(control))
        else {
            return false;
        };
        match self.sync.set_discrete(entry, member) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(control = entry.index, member, error = %err, "failed to set control");
                false
            }
        }
    }

    fn adjust_level(&mut self, control: usize, channel: usize, increase: bool) {
        let Some(entry) = self
            .catalog
            .class_mut(self.class)
            .and_then(|class| class.controls.get_mut(control))
        else {
            return;
        };
        let Some(value) = entry.as_value() else {
            return;
        };
        let level = step_level(value.level(channel), value.delta, increase);

        match self.sync.set_level(entry, channel, level) {
            Ok(_) => self.effects.push(Effect::Redraw(Region::Control(control))),
            Err(err) => {
                tracing::warn!(control = entry.index, channel, error = %err, "failed to set level")
            }
        }
    }

    fn finish(&mut self, flow: Flow) -> Transition {
        Transition {
            effects: std::mem::take(&mut self.effects),
            flow,
        }
    }

    fn class_len(&self) -> usize {
        self.catalog
            .class(self.class)
            .map(|class| class.controls.len())
            .unwrap_or(0)
    }

    fn heights(&self) -> Vec<usize> {
        self.catalog
            .class(self.class)
            .map(|class| class.heights())
            .unwrap_or_default()
    }

    fn control_ref(&self, control: usize) -> Option<&Control> {
        self.catalog.class(self.class)?.controls.get(control)
    }

    fn control_mut(&mut self, control: usize) -> Option<&mut Control> {
        self.catalog.class_mut(self.class)?.controls.get_mut(control)
    }

    fn control_kind(&self, control: usize) -> Option<Kind> {
        self.control_ref(control).map(|c| match c.kind {
            ControlKind::Value(_) => Kind::Value,
            _ => Kind::Discrete,
        })
    }

    fn member_count(&self, control: usize) -> Option<usize> {
        self.control_ref(control).map(|c| c.member_labels().len())
    }

    fn channel_of(&self, control: usize) -> usize {
        self.control_ref(control)
            .and_then(|c| c.as_value())
            .map(|v| v.current_channel())
            .unwrap_or(0)
    }

    fn set_channel(&mut self, control: usize, channel: usize) {
        if let Some(value) = self.control_mut(control).and_then(|c| c.as_value_mut()) {
            value.set_current_channel(channel);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Discrete,
    Value,
}
