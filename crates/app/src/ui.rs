use std::io::{self, Write};

use aiomixer_core::{Catalog, Control, ControlKind, Effect, Focus, LayoutConfig, Placement, Region};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute, queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};

const TITLE: &str = "Audio Mixer";
const SLIDER_WIDTH: usize = 50;
const CLASS_ROW: u16 = 0;
const HEADING_ROW: u16 = 3;

/// Raw-mode alternate screen. The terminal is restored when this is dropped,
/// whichever way the program leaves.
pub struct TerminalGuard;

impl TerminalGuard {
    pub fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let guard = Self;
        execute!(io::stdout(), EnterAlternateScreen, Hide)?;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), ResetColor, Show, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

/// Widget state mirrored from the session's effects, and the code that
/// paints it.
pub struct Screen<W: Write> {
    out: W,
    layout: LayoutConfig,
    width: u16,
    height: u16,
    class: Option<usize>,
    placements: Vec<Placement>,
    focus: Option<Focus>,
}

impl<W: Write> Screen<W> {
    pub fn new(out: W, layout: LayoutConfig, (width, height): (u16, u16)) -> Self {
        Self {
            out,
            layout,
            width,
            height,
            class: None,
            placements: Vec::new(),
            focus: None,
        }
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
    }

    /// Applies a batch of effects, then repaints.
    pub fn apply(&mut self, catalog: &Catalog, effects: &[Effect]) -> io::Result<()> {
        if effects.is_empty() {
            return Ok(());
        }
        for effect in effects {
            match effect {
                Effect::DestroyClassWidgets { .. } => {
                    self.class = None;
                    self.placements.clear();
                }
                Effect::BuildClassWidgets { class, placements } => {
                    self.class = Some(*class);
                    self.placements.clone_from(placements);
                }
                Effect::SetFocus(focus) => self.focus = Some(*focus),
                Effect::Redraw(Region::Window(placements)) => {
                    self.placements.clone_from(placements);
                }
                Effect::Redraw(Region::ClassSelector | Region::Control(_)) => {}
            }
        }
        self.draw(catalog)
    }

    fn draw(&mut self, catalog: &Catalog) -> io::Result<()> {
        queue!(self.out, ResetColor, Clear(ClearType::All))?;
        self.draw_title()?;
        self.draw_classes(catalog)?;

        if let Some(class) = self.class.and_then(|class| catalog.class(class)) {
            queue!(
                self.out,
                MoveTo(0, HEADING_ROW),
                SetAttribute(Attribute::Bold),
                Print("Controls"),
                SetAttribute(Attribute::Reset)
            )?;
            for placement in self.placements.clone() {
                if let Some(control) = class.controls.get(placement.control) {
                    let row = self.layout.controls_top as usize + placement.row;
                    self.draw_control(placement.control, control, row)?;
                }
            }
        }
        self.out.flush()
    }

    fn draw_title(&mut self) -> io::Result<()> {
        let column = self.width.saturating_sub(TITLE.len() as u16);
        queue!(self.out, MoveTo(column, 0), Print(TITLE))
    }

    fn draw_classes(&mut self, catalog: &Catalog) -> io::Result<()> {
        queue!(
            self.out,
            MoveTo(0, CLASS_ROW),
            SetAttribute(Attribute::Bold),
            Print("Classes"),
            SetAttribute(Attribute::Reset),
            MoveTo(0, CLASS_ROW + 1)
        )?;
        let selector_active = matches!(self.focus, Some(Focus::ClassLevel { .. }));
        for (position, class) in catalog.classes().iter().enumerate() {
            let current = self.class == Some(position);
            if current {
                queue!(
                    self.out,
                    SetForegroundColor(Color::White),
                    SetBackgroundColor(Color::Blue)
                )?;
                if selector_active {
                    queue!(self.out, SetAttribute(Attribute::Bold))?;
                }
            }
            queue!(
                self.out,
                Print(format!(" F{} {} ", position + 1, class.name)),
                SetAttribute(Attribute::Reset),
                ResetColor,
                Print(" ")
            )?;
        }
        Ok(())
    }

    fn draw_control(&mut self, position: usize, control: &Control, row: usize) -> io::Result<()> {
        let focused_channel = match self.focus {
            Some(Focus::ControlLevel {
                control: focused,
                channel,
                ..
            }) if focused == position => Some(channel),
            _ => None,
        };

        match &control.kind {
            ControlKind::Enum(_) | ControlKind::Set(_) => {
                if !self.fits(row + 1) {
                    return Ok(());
                }
                self.label(row, &control.name, focused_channel.is_some())?;
                queue!(self.out, MoveTo(2, row as u16 + 1))?;
                let selected = control.selected_member();
                for (member, label) in control.member_labels().into_iter().enumerate() {
                    if selected == Some(member) {
                        queue!(
                            self.out,
                            SetForegroundColor(Color::Yellow),
                            SetAttribute(Attribute::Reverse)
                        )?;
                    }
                    queue!(
                        self.out,
                        Print(format!(" {label} ")),
                        SetAttribute(Attribute::Reset),
                        ResetColor,
                        Print(" ")
                    )?;
                }
            }
            ControlKind::Value(value) => {
                let lock = if value.channels() > 1 && value.channels_unlocked {
                    " [unlocked]"
                } else {
                    ""
                };
                for channel in 0..value.channels() {
                    let row = row + channel * 3;
                    if !self.fits(row + 1) {
                        break;
                    }
                    let title = format!("{} (channel {channel}){lock}", control.name);
                    self.label(row, &title, focused_channel == Some(channel))?;
                    let level = value.level(channel);
                    queue!(
                        self.out,
                        MoveTo(2, row as u16 + 1),
                        SetForegroundColor(Color::Green),
                        SetAttribute(Attribute::Bold),
                        Print(slider_bar(level, SLIDER_WIDTH)),
                        SetAttribute(Attribute::Reset),
                        ResetColor,
                        Print(format!(" {level:>3}"))
                    )?;
                }
            }
        }
        Ok(())
    }

    fn label(&mut self, row: usize, text: &str, focused: bool) -> io::Result<()> {
        let text = truncate(text, usize::from(self.width));
        queue!(self.out, MoveTo(0, row as u16))?;
        if focused {
            queue!(self.out, SetAttribute(Attribute::Reverse))?;
        }
        queue!(self.out, Print(text), SetAttribute(Attribute::Reset))
    }

    fn fits(&self, row: usize) -> bool {
        row < usize::from(self.height.saturating_sub(self.layout.bottom_margin))
    }
}

/// Slider body: `#` for the filled share of `width`, `.` for the rest.
pub fn slider_bar(level: u8, width: usize) -> String {
    let filled = usize::from(level) * width / 255;
    format!("{}{}", "#".repeat(filled), ".".repeat(width - filled))
}

fn truncate(text: &str, width: usize) -> &str {
    match text.char_indices().nth(width) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aiomixer_core::{DescriptorKind, DeviceDescriptor};

    fn catalog() -> Catalog {
        let entry = |index, label: &str, kind| DeviceDescriptor {
            index,
            label: label.into(),
            class_id: 0,
            next: None,
            prev: None,
            kind,
        };
        Catalog::build(&[
            entry(0, "outputs", DescriptorKind::Class),
            entry(1, "master", DescriptorKind::Value { channels: 2, delta: 8 }),
        ])
    }

    #[test]
    fn slider_bar_scales_level() {
        assert_eq!(slider_bar(0, 10), "..........");
        assert_eq!(slider_bar(255, 10), "##########");
        assert_eq!(slider_bar(128, 10), "#####.....");
    }

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate("master.mute", 6), "master");
        assert_eq!(truncate("dB", 10), "dB");
    }

    #[test]
    fn tracks_widgets_from_effects() {
        let catalog = catalog();
        let mut screen = Screen::new(Vec::new(), LayoutConfig::default(), (80, 24));
        let focus = Focus::ControlLevel {
            class: 0,
            control: 0,
            channel: 1,
        };

        screen
            .apply(
                &catalog,
                &[
                    Effect::BuildClassWidgets {
                        class: 0,
                        placements: vec![Placement { control: 0, row: 0 }],
                    },
                    Effect::SetFocus(focus),
                ],
            )
            .unwrap();
        assert_eq!(screen.class, Some(0));
        assert_eq!(screen.focus, Some(focus));
        let painted = String::from_utf8_lossy(&screen.out).into_owned();
        assert!(painted.contains("master (channel 1)"));
        assert!(painted.contains(TITLE));

        screen
            .apply(&catalog, &[Effect::DestroyClassWidgets { class: 0 }])
            .unwrap();
        assert!(screen.placements.is_empty());
        assert_eq!(screen.class, None);
    }
}
