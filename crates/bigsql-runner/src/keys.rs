use std::{
    io::{self, IsTerminal},
    time::Duration,
};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal,
};

/// 执行循环每读一行前询问一次
pub trait CancelSignal {
    fn cancelled(&mut self) -> bool;
}

/// 不可取消（stdin 不是终端时使用）
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverCancel;

impl CancelSignal for NeverCancel {
    fn cancelled(&mut self) -> bool {
        false
    }
}

/// raw 模式守卫，drop 时恢复终端
pub struct RawMode {
    _private: (),
}

impl RawMode {
    pub fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self { _private: () })
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if let Err(err) = terminal::disable_raw_mode() {
            tracing::warn!("恢复终端模式失败: {}", err);
        }
    }
}

/// 执行期间监听键盘，任意按键即取消
///
/// 只在 stdin 是终端时进入 raw 模式；否则永不取消。
pub struct KeyWatcher {
    raw: Option<RawMode>,
}

impl KeyWatcher {
    pub fn attach() -> Self {
        if !io::stdin().is_terminal() {
            tracing::debug!("stdin 不是终端，按键取消不可用");
            return Self { raw: None };
        }

        match RawMode::enable() {
            Ok(raw) => Self { raw: Some(raw) },
            Err(err) => {
                tracing::warn!("无法进入 raw 模式，按键取消不可用: {}", err);
                Self { raw: None }
            }
        }
    }
}

impl CancelSignal for KeyWatcher {
    fn cancelled(&mut self) -> bool {
        if self.raw.is_none() {
            return false;
        }

        match event::poll(Duration::ZERO) {
            Ok(true) => match event::read() {
                Ok(Event::Key(key)) => key.kind == KeyEventKind::Press,
                Ok(_) => false,
                Err(err) => {
                    tracing::warn!("读取按键失败: {}", err);
                    false
                }
            },
            Ok(false) => false,
            Err(err) => {
                tracing::warn!("检查按键失败: {}", err);
                false
            }
        }
    }
}

/// 阻塞直到按下 ESC，其它按键和事件忽略
pub fn wait_for_escape<F>(mut next_event: F) -> io::Result<()>
where
    F: FnMut() -> io::Result<Event>,
{
    loop {
        if let Event::Key(key) = next_event()? {
            if key.kind == KeyEventKind::Press && key.code == KeyCode::Esc {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::{KeyEvent, KeyModifiers};

    use super::*;

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn never_cancel() {
        assert!(!NeverCancel.cancelled());
    }

    #[test]
    fn wait_for_escape_ignores_other_keys() {
        let mut events = vec![
            key(KeyCode::Char('q')),
            Event::FocusGained,
            key(KeyCode::Enter),
            key(KeyCode::Esc),
            key(KeyCode::Char('x')),
        ]
        .into_iter();

        wait_for_escape(|| Ok(events.next().unwrap())).unwrap();
        assert_eq!(events.next(), Some(key(KeyCode::Char('x'))));
    }

    #[test]
    fn wait_for_escape_ignores_key_release() {
        let mut release = KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE);
        release.kind = KeyEventKind::Release;
        let mut events = vec![Event::Key(release), key(KeyCode::Esc)].into_iter();

        wait_for_escape(|| Ok(events.next().unwrap())).unwrap();
        assert!(events.next().is_none());
    }

    #[test]
    fn wait_for_escape_propagates_errors() {
        let result = wait_for_escape(|| Err(io::Error::other("closed")));
        assert!(result.is_err());
    }
}
