use aiomixer_core::Key;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Translates a terminal event into a session key. Arrow keys have vi-style
/// letter aliases; F1..F12 and 1..9 jump to a class.
pub fn translate(event: &Event) -> Option<Key> {
    match event {
        Event::Key(key) => translate_key(key),
        Event::Resize(_, rows) => Some(Key::Resize { height: *rows }),
        _ => None,
    }
}

fn translate_key(key: &KeyEvent) -> Option<Key> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    if key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
        return None;
    }

    let mapped = match key.code {
        KeyCode::Up | KeyCode::Char('k') => Key::Up,
        KeyCode::Down | KeyCode::Char('j') => Key::Down,
        KeyCode::Left | KeyCode::Char('h') => Key::Left,
        KeyCode::Right | KeyCode::Char('l') => Key::Right,
        KeyCode::Enter => Key::Commit,
        KeyCode::Esc => Key::Escape,
        KeyCode::Char('u') => Key::ToggleLock,
        KeyCode::Char('m') => Key::Mute,
        KeyCode::F(n) if n >= 1 => Key::Class(usize::from(n) - 1),
        KeyCode::Char(c @ '1'..='9') => Key::Class(c as usize - '1' as usize),
        _ => return None,
    };
    Some(mapped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn letters_alias_arrow_keys() {
        assert_eq!(translate(&press(KeyCode::Char('h'))), Some(Key::Left));
        assert_eq!(translate(&press(KeyCode::Char('j'))), Some(Key::Down));
        assert_eq!(translate(&press(KeyCode::Char('k'))), Some(Key::Up));
        assert_eq!(translate(&press(KeyCode::Right)), Some(Key::Right));
    }

    #[test]
    fn function_and_digit_keys_select_classes() {
        assert_eq!(translate(&press(KeyCode::F(1))), Some(Key::Class(0)));
        assert_eq!(translate(&press(KeyCode::F(4))), Some(Key::Class(3)));
        assert_eq!(translate(&press(KeyCode::Char('2'))), Some(Key::Class(1)));
        assert_eq!(translate(&press(KeyCode::Char('0'))), None);
    }

    #[test]
    fn resize_reports_new_height() {
        assert_eq!(
            translate(&Event::Resize(80, 40)),
            Some(Key::Resize { height: 40 })
        );
    }

    #[test]
    fn ignores_releases_and_modified_keys() {
        let mut release = KeyEvent::new(KeyCode::Up, KeyModifiers::NONE);
        release.kind = KeyEventKind::Release;
        assert_eq!(translate(&Event::Key(release)), None);

        let ctrl = KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL);
        assert_eq!(translate(&Event::Key(ctrl)), None);
    }
}
