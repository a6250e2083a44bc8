use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use crossterm::{
    cursor,
    event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    queue,
    terminal::{Clear, ClearType},
};
use pagecut_core::{Command, RenderImage};
use png::{BitDepth, ColorType, Encoder};
use tracing::debug;

mod paths;

pub use paths::{first_dropped_path, parse_dropped_paths, parse_typed_path, DropError};

const CHUNK_SIZE: usize = 4096;

/// Writes page rasters with the kitty graphics protocol.
pub struct KittyRenderer<W: Write> {
    writer: W,
}

/// Where an image goes, in terminal cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub image_id: u32,
    pub column: u16,
    pub row: u16,
    pub columns: u32,
    pub rows: u32,
}

impl Placement {
    pub fn new(image_id: u32, column: u16, row: u16, columns: u32, rows: u32) -> Self {
        Self {
            image_id: image_id.max(1),
            column,
            row,
            columns: columns.max(1),
            rows: rows.max(1),
        }
    }
}

impl<W: Write> KittyRenderer<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn writer(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    pub fn draw(&mut self, image: &RenderImage, placement: Placement) -> Result<()> {
        let encoded = BASE64.encode(encode_png(image)?);
        queue!(
            self.writer,
            cursor::MoveTo(placement.column, placement.row)
        )?;

        let mut chunks = encoded.as_bytes().chunks(CHUNK_SIZE).peekable();
        let mut first = true;
        while let Some(chunk) = chunks.next() {
            let more = u8::from(chunks.peek().is_some());
            if first {
                write!(
                    self.writer,
                    "\u{1b}_Ga=T,f=100,C=1,q=2,i={},p=1,c={},r={},s={},v={},z=-1,m={}",
                    placement.image_id,
                    placement.columns,
                    placement.rows,
                    image.width,
                    image.height,
                    more
                )?;
                first = false;
            } else {
                write!(self.writer, "\u{1b}_Gm={more},q=2")?;
            }
            self.writer.write_all(b";")?;
            self.writer.write_all(chunk)?;
            self.writer.write_all(b"\x1b\\")?;
        }
        Ok(())
    }

    /// Removes every image placement and frees the stored image data.
    pub fn delete_all(&mut self) -> Result<()> {
        self.writer.write_all(b"\x1b_Ga=d,d=A,q=2\x1b\\")?;
        Ok(())
    }

    pub fn begin_sync_update(&mut self) -> Result<()> {
        write!(self.writer, "\u{1b}[?2026h")?;
        Ok(())
    }

    /// Ends a synchronized update and flushes everything buffered since
    /// [`Self::begin_sync_update`].
    pub fn end_sync_update(&mut self) -> Result<()> {
        write!(self.writer, "\u{1b}[?2026l")?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn clear_all(&mut self) -> Result<()> {
        queue!(self.writer, Clear(ClearType::All), cursor::MoveTo(0, 0))?;
        Ok(())
    }
}

fn encode_png(image: &RenderImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut encoder = Encoder::new(&mut buffer, image.width, image.height);
    encoder.set_color(ColorType::Rgba);
    encoder.set_depth(BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(&image.pixels)?;
    writer.finish()?;
    Ok(buffer)
}

/// Writes `text` on `row`, clearing whatever was there and cutting it to
/// `width` characters.
pub fn write_status_line<W: Write>(writer: &mut W, row: u16, width: u16, text: &str) -> io::Result<()> {
    let clipped: String = text.chars().take(usize::from(width)).collect();
    queue!(
        writer,
        cursor::MoveTo(0, row),
        Clear(ClearType::CurrentLine)
    )?;
    write!(writer, "{clipped}")?;
    writer.flush()
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Command(Command),
    DeleteActivePage,
    Undo,
    Export,
    BeginOpen,
    PromptChanged { input: String },
    PromptCancel,
    OpenPath(PathBuf),
    InvalidDrop(DropError),
    Redraw,
    Quit,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    Prompt,
}

#[derive(Debug, Default)]
pub struct EventMapper {
    pending_count: Option<usize>,
    pending_digits: String,
    mode: InputMode,
    prompt_buffer: String,
}

impl EventMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: InputMode) {
        if self.mode != mode {
            debug!(from = ?self.mode, to = ?mode, "input mode");
            self.reset_count();
            self.prompt_buffer.clear();
            self.mode = mode;
        }
    }

    pub fn map_event(&mut self, event: Event) -> UiEvent {
        match event {
            Event::Key(KeyEvent {
                kind: KeyEventKind::Release,
                ..
            }) => UiEvent::None,
            Event::Key(KeyEvent {
                code: KeyCode::Char('c'),
                modifiers,
                ..
            }) if modifiers.contains(KeyModifiers::CONTROL) => UiEvent::Quit,
            Event::Resize(..) => UiEvent::Redraw,
            event => match self.mode {
                InputMode::Normal => self.map_event_normal(event),
                InputMode::Prompt => self.map_event_prompt(event),
            },
        }
    }

    fn map_event_normal(&mut self, event: Event) -> UiEvent {
        let (code, modifiers) = match event {
            Event::Key(KeyEvent {
                code, modifiers, ..
            }) => (code, modifiers),
            Event::Paste(text) => {
                self.reset_count();
                return match first_dropped_path(&text) {
                    Ok(path) => UiEvent::OpenPath(path),
                    Err(err) => UiEvent::InvalidDrop(err),
                };
            }
            _ => return UiEvent::None,
        };

        match (code, modifiers) {
            (KeyCode::Char(c), KeyModifiers::NONE) if c.is_ascii_digit() => {
                if let Some(digit) = c.to_digit(10) {
                    self.push_digit(digit as usize);
                }
                UiEvent::None
            }
            (KeyCode::Char('z'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
                self.reset_count();
                UiEvent::Undo
            }
            (KeyCode::Char('j'), KeyModifiers::NONE)
            | (KeyCode::Down, _)
            | (KeyCode::PageDown, _) => UiEvent::Command(Command::NextPage {
                count: self.take_count(),
            }),
            (KeyCode::Char('k'), KeyModifiers::NONE)
            | (KeyCode::Up, _)
            | (KeyCode::PageUp, _) => UiEvent::Command(Command::PrevPage {
                count: self.take_count(),
            }),
            (KeyCode::Char('g'), KeyModifiers::NONE) | (KeyCode::Home, _) => {
                let page = self.take_prefix().unwrap_or(1);
                UiEvent::Command(Command::GotoPage { page })
            }
            (KeyCode::Char('G'), _) | (KeyCode::End, _) => {
                let page = self.take_prefix().unwrap_or(usize::MAX);
                UiEvent::Command(Command::GotoPage { page })
            }
            (KeyCode::Char('x'), KeyModifiers::NONE) | (KeyCode::Backspace, _) | (KeyCode::Delete, _) => {
                self.reset_count();
                UiEvent::DeleteActivePage
            }
            (KeyCode::Char('u'), KeyModifiers::NONE) => {
                self.reset_count();
                UiEvent::Undo
            }
            (KeyCode::Char('+'), _) => self.command(Command::ZoomIn),
            (KeyCode::Char('-'), _) => self.command(Command::ZoomOut),
            (KeyCode::Char('='), _) => self.command(Command::ResetZoom),
            (KeyCode::Char('t'), _) | (KeyCode::Char('T'), _) => {
                self.command(Command::ToggleThumbnails)
            }
            (KeyCode::Char('w'), KeyModifiers::NONE) => {
                self.reset_count();
                UiEvent::Export
            }
            (KeyCode::Char('o'), KeyModifiers::NONE) => {
                self.set_mode(InputMode::Prompt);
                UiEvent::BeginOpen
            }
            (KeyCode::Char('q'), _) => {
                self.reset_count();
                UiEvent::Quit
            }
            _ => {
                self.reset_count();
                UiEvent::None
            }
        }
    }

    fn map_event_prompt(&mut self, event: Event) -> UiEvent {
        match event {
            Event::Key(KeyEvent {
                code, modifiers, ..
            }) => match (code, modifiers) {
                (KeyCode::Esc, _) => {
                    self.set_mode(InputMode::Normal);
                    UiEvent::PromptCancel
                }
                (KeyCode::Enter, _) => {
                    let typed = parse_typed_path(&self.prompt_buffer);
                    self.set_mode(InputMode::Normal);
                    typed.map_or(UiEvent::PromptCancel, UiEvent::OpenPath)
                }
                (KeyCode::Char('u'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
                    self.prompt_buffer.clear();
                    self.prompt_changed()
                }
                (KeyCode::Backspace, _) | (KeyCode::Delete, _) => {
                    self.prompt_buffer.pop();
                    self.prompt_changed()
                }
                (KeyCode::Char(c), mods) if mods.is_empty() || mods == KeyModifiers::SHIFT => {
                    self.prompt_buffer.push(c);
                    self.prompt_changed()
                }
                _ => UiEvent::None,
            },
            Event::Paste(text) => {
                self.prompt_buffer.push_str(text.trim_end_matches(['\r', '\n']));
                self.prompt_changed()
            }
            _ => UiEvent::None,
        }
    }

    fn command(&mut self, command: Command) -> UiEvent {
        self.reset_count();
        UiEvent::Command(command)
    }

    fn prompt_changed(&self) -> UiEvent {
        UiEvent::PromptChanged {
            input: self.prompt_buffer.clone(),
        }
    }

    fn push_digit(&mut self, digit: usize) {
        let next = self
            .pending_count
            .unwrap_or(0)
            .saturating_mul(10)
            .saturating_add(digit);
        self.pending_count = Some(next);
        if let Some(c) = char::from_digit(digit as u32, 10) {
            self.pending_digits.push(c);
        }
    }

    fn take_prefix(&mut self) -> Option<usize> {
        self.pending_digits.clear();
        self.pending_count.take().filter(|&count| count > 0)
    }

    fn take_count(&mut self) -> usize {
        self.take_prefix().unwrap_or(1)
    }

    fn reset_count(&mut self) {
        self.pending_count = None;
        self.pending_digits.clear();
    }

    /// Text the user has typed that has not yet turned into an event.
    pub fn pending_input(&self) -> Option<String> {
        match self.mode {
            InputMode::Prompt => Some(format!("open: {}", self.prompt_buffer)),
            InputMode::Normal if !self.pending_digits.is_empty() => {
                Some(self.pending_digits.clone())
            }
            InputMode::Normal => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn key_event(code: KeyCode) -> Event {
        key_event_with_modifiers(code, KeyModifiers::NONE)
    }

    fn key_event_with_modifiers(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn type_text(mapper: &mut EventMapper, text: &str) {
        for c in text.chars() {
            mapper.map_event(key_event(KeyCode::Char(c)));
        }
    }

    #[test]
    fn kitty_draw_places_and_chunks_image() {
        let mut renderer = KittyRenderer::new(Vec::new());
        let image = RenderImage::blank(64, 64);

        renderer
            .draw(&image, Placement::new(7, 2, 3, 10, 5))
            .unwrap();
        let output = String::from_utf8(renderer.into_inner()).unwrap();

        assert!(output.starts_with("\u{1b}[4;3H"));
        assert!(output.contains("\u{1b}_Ga=T,f=100,C=1,q=2,i=7,p=1,c=10,r=5,s=64,v=64"));
        assert!(output.ends_with("\u{1b}\\"));
    }

    #[test]
    fn kitty_draw_splits_large_payloads() {
        let mut renderer = KittyRenderer::new(Vec::new());
        let mut image = RenderImage::blank(128, 128);
        // Noise keeps the PNG from compressing below one chunk.
        let mut state: u32 = 0x9e37_79b9;
        for byte in image.pixels.iter_mut() {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            *byte = state as u8;
        }

        renderer
            .draw(&image, Placement::new(1, 0, 0, 4, 4))
            .unwrap();
        let output = String::from_utf8(renderer.into_inner()).unwrap();

        assert!(output.contains("m=1;"));
        assert!(output.contains("\u{1b}_Gm=0,q=2;"));
    }

    #[test]
    fn placement_clamps_degenerate_sizes() {
        let placement = Placement::new(0, 0, 0, 0, 0);
        assert_eq!(placement.image_id, 1);
        assert_eq!((placement.columns, placement.rows), (1, 1));
    }

    #[test]
    fn status_line_is_clipped_to_width() {
        let mut out = Vec::new();
        write_status_line(&mut out, 9, 6, "Page 1 of 3").unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.ends_with("Page 1"));
        assert!(out.starts_with("\u{1b}[10;1H"));
    }

    #[test]
    fn event_mapper_uses_numeric_prefix_for_next_page() {
        let mut mapper = EventMapper::new();
        assert_eq!(mapper.map_event(key_event(KeyCode::Char('1'))), UiEvent::None);
        assert_eq!(mapper.map_event(key_event(KeyCode::Char('2'))), UiEvent::None);
        assert_eq!(mapper.pending_input().as_deref(), Some("12"));

        match mapper.map_event(key_event(KeyCode::Char('j'))) {
            UiEvent::Command(Command::NextPage { count }) => assert_eq!(count, 12),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(mapper.pending_input().is_none());
    }

    #[test]
    fn event_mapper_resets_prefix_after_use() {
        let mut mapper = EventMapper::new();
        mapper.map_event(key_event(KeyCode::Char('3')));

        match mapper.map_event(key_event(KeyCode::Char('k'))) {
            UiEvent::Command(Command::PrevPage { count }) => assert_eq!(count, 3),
            other => panic!("unexpected event: {:?}", other),
        }
        match mapper.map_event(key_event(KeyCode::Up)) {
            UiEvent::Command(Command::PrevPage { count }) => assert_eq!(count, 1),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn event_mapper_drops_prefix_on_other_keys() {
        let mut mapper = EventMapper::new();
        mapper.map_event(key_event(KeyCode::Char('4')));
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Char('+'))),
            UiEvent::Command(Command::ZoomIn)
        );

        match mapper.map_event(key_event(KeyCode::Char('j'))) {
            UiEvent::Command(Command::NextPage { count }) => assert_eq!(count, 1),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn event_mapper_goto_uses_prefix_as_page_number() {
        let mut mapper = EventMapper::new();
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Char('g'))),
            UiEvent::Command(Command::GotoPage { page: 1 })
        );
        assert_eq!(
            mapper.map_event(key_event_with_modifiers(
                KeyCode::Char('G'),
                KeyModifiers::SHIFT
            )),
            UiEvent::Command(Command::GotoPage { page: usize::MAX })
        );
        mapper.map_event(key_event(KeyCode::Char('5')));
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Char('g'))),
            UiEvent::Command(Command::GotoPage { page: 5 })
        );
    }

    #[test]
    fn event_mapper_maps_delete_keys_in_normal_mode() {
        let mut mapper = EventMapper::new();
        for code in [KeyCode::Char('x'), KeyCode::Backspace, KeyCode::Delete] {
            assert_eq!(mapper.map_event(key_event(code)), UiEvent::DeleteActivePage);
        }
    }

    #[test]
    fn event_mapper_maps_ctrl_z_and_u_to_undo() {
        let mut mapper = EventMapper::new();
        assert_eq!(
            mapper.map_event(key_event_with_modifiers(
                KeyCode::Char('z'),
                KeyModifiers::CONTROL
            )),
            UiEvent::Undo
        );
        assert_eq!(mapper.map_event(key_event(KeyCode::Char('u'))), UiEvent::Undo);
    }

    #[test]
    fn event_mapper_maps_view_and_export_keys() {
        let mut mapper = EventMapper::new();
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Char('-'))),
            UiEvent::Command(Command::ZoomOut)
        );
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Char('='))),
            UiEvent::Command(Command::ResetZoom)
        );
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Char('t'))),
            UiEvent::Command(Command::ToggleThumbnails)
        );
        assert_eq!(mapper.map_event(key_event(KeyCode::Char('w'))), UiEvent::Export);
        assert_eq!(mapper.map_event(key_event(KeyCode::Char('q'))), UiEvent::Quit);
        assert_eq!(mapper.map_event(Event::Resize(80, 24)), UiEvent::Redraw);
    }

    #[test]
    fn key_releases_are_ignored() {
        let mut mapper = EventMapper::new();
        let release = Event::Key(KeyEvent {
            code: KeyCode::Char('x'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        });
        assert_eq!(mapper.map_event(release), UiEvent::None);
    }

    #[test]
    fn paste_in_normal_mode_opens_the_dropped_file() {
        let mut mapper = EventMapper::new();
        assert_eq!(
            mapper.map_event(Event::Paste("'/tmp/my scan.pdf'".into())),
            UiEvent::OpenPath(PathBuf::from("/tmp/my scan.pdf"))
        );
        assert_eq!(
            mapper.map_event(Event::Paste("  ".into())),
            UiEvent::InvalidDrop(DropError::Empty)
        );
    }

    #[test]
    fn prompt_collects_a_path_and_submits_it() {
        let mut mapper = EventMapper::new();
        assert_eq!(mapper.map_event(key_event(KeyCode::Char('o'))), UiEvent::BeginOpen);
        assert_eq!(mapper.mode(), InputMode::Prompt);

        type_text(&mut mapper, "a.pdx");
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Backspace)),
            UiEvent::PromptChanged {
                input: "a.pd".into()
            }
        );
        mapper.map_event(key_event(KeyCode::Char('f')));
        assert_eq!(mapper.pending_input().as_deref(), Some("open: a.pdf"));

        assert_eq!(
            mapper.map_event(key_event(KeyCode::Enter)),
            UiEvent::OpenPath(PathBuf::from("a.pdf"))
        );
        assert_eq!(mapper.mode(), InputMode::Normal);
        assert!(mapper.pending_input().is_none());
    }

    #[test]
    fn prompt_keys_do_not_trigger_editor_actions() {
        let mut mapper = EventMapper::new();
        mapper.map_event(key_event(KeyCode::Char('o')));

        assert_eq!(
            mapper.map_event(key_event(KeyCode::Char('x'))),
            UiEvent::PromptChanged { input: "x".into() }
        );
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Delete)),
            UiEvent::PromptChanged {
                input: String::new()
            }
        );
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Backspace)),
            UiEvent::PromptChanged {
                input: String::new()
            }
        );
        assert_eq!(mapper.mode(), InputMode::Prompt);
    }

    #[test]
    fn prompt_accepts_pasted_text_and_escape_cancels() {
        let mut mapper = EventMapper::new();
        mapper.map_event(key_event(KeyCode::Char('o')));
        assert_eq!(
            mapper.map_event(Event::Paste("/tmp/b.pdf\n".into())),
            UiEvent::PromptChanged {
                input: "/tmp/b.pdf".into()
            }
        );
        assert_eq!(mapper.map_event(key_event(KeyCode::Esc)), UiEvent::PromptCancel);
        assert_eq!(mapper.mode(), InputMode::Normal);

        mapper.map_event(key_event(KeyCode::Char('o')));
        assert!(mapper.pending_input().as_deref() == Some("open: "));
        assert_eq!(mapper.map_event(key_event(KeyCode::Enter)), UiEvent::PromptCancel);
    }

    #[test]
    fn switching_modes_clears_pending_state() {
        let mut mapper = EventMapper::new();
        mapper.map_event(key_event(KeyCode::Char('7')));
        mapper.set_mode(InputMode::Prompt);
        mapper.set_mode(InputMode::Normal);
        assert!(mapper.pending_input().is_none());
    }

    #[test]
    fn ctrl_c_quits_from_any_mode() {
        let mut mapper = EventMapper::new();
        mapper.set_mode(InputMode::Prompt);
        assert_eq!(
            mapper.map_event(key_event_with_modifiers(
                KeyCode::Char('c'),
                KeyModifiers::CONTROL
            )),
            UiEvent::Quit
        );
    }
}
