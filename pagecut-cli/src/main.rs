use std::fs;
use std::io::{self, Stdout};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::Parser;
use crossterm::cursor;
use crossterm::event::{self, DisableBracketedPaste, EnableBracketedPaste};
use crossterm::terminal::{self, Clear, ClearType};
use directories::ProjectDirs;
use pagecut_core::{
    prefetch_window, Command, DocumentSource, EditSession, EditorConfig, Notice, PageRaster,
    Projections, RenderedDocument, SessionEvent, CONFIG_FILE_NAME,
};
use pagecut_mutate::LopdfMutator;
use pagecut_render::PdfiumRenderer;
use pagecut_tty::{write_status_line, EventMapper, KittyRenderer, Placement, UiEvent};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{prelude::*, EnvFilter};

mod layout;
mod status;

use layout::{fit, split, strip_slots, thumbnail_window, Area, Screen};
use status::{combine_status, format_status, thumbnail_label, StatusInfo};

const PAGE_IMAGE_ID: u32 = 1;
const THUMBNAIL_IMAGE_BASE: u32 = 100;

#[derive(Debug, Parser)]
#[command(
    name = "pagecut",
    version,
    about = "Delete pages from a PDF in the terminal, with undo"
)]
struct Args {
    /// PDF file to open
    file: Option<PathBuf>,

    /// Directory edited copies are written to
    #[arg(short = 'o', long = "output-dir", default_value = ".")]
    output_dir: PathBuf,

    /// Configuration file to use instead of the default location
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Page to show first (1-based)
    #[arg(short = 'p', long = "page")]
    page: Option<usize>,
}

struct RawModeGuard;

impl RawModeGuard {
    fn new() -> Result<Self> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        crossterm::execute!(stdout, cursor::Hide, EnableBracketedPaste)?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let mut stdout = io::stdout();
        let _ = crossterm::execute!(stdout, DisableBracketedPaste, cursor::Show);
        let _ = terminal::disable_raw_mode();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Reject a bad path before touching the terminal or the pdfium library.
    let initial = args
        .file
        .as_deref()
        .map(|path| {
            DocumentSource::from_path(path).with_context(|| format!("cannot open {}", path.display()))
        })
        .transpose()?;

    let project_dirs = ProjectDirs::from("net", "pagecut", "pagecut")
        .ok_or_else(|| anyhow!("unable to resolve platform data directories"))?;
    let _log_guard = init_logging(&project_dirs)?;
    let config = load_config(args.config.as_deref(), &project_dirs)?;

    let renderer = PdfiumRenderer::new()?;
    let session = Arc::new(EditSession::new(
        Arc::new(renderer),
        Arc::new(LopdfMutator::new()),
        &config,
    ));

    if let Some(source) = initial {
        let name = source.name.clone();
        session
            .load(source)
            .await
            .with_context(|| format!("failed to open {name}"))?;
        if let Some(page) = args.page {
            session.apply(Command::GotoPage { page });
        }
    }

    let mut app = App {
        session,
        projections: Projections::new(config.render.base_scale, config.render.thumbnail_scale),
        mapper: EventMapper::new(),
        notice: None,
        output_dir: args.output_dir,
    };

    let _raw = RawModeGuard::new()?;
    let mut renderer = KittyRenderer::new(io::stdout());
    let result = app.run(&mut renderer).await;

    renderer.delete_all()?;
    crossterm::execute!(renderer.writer(), Clear(ClearType::All), cursor::MoveTo(0, 0))?;
    result
}

enum LoopAction {
    Continue,
    Redraw,
    Quit,
}

struct App {
    session: Arc<EditSession>,
    projections: Projections,
    mapper: EventMapper,
    notice: Option<Notice>,
    output_dir: PathBuf,
}

impl App {
    async fn run(&mut self, renderer: &mut KittyRenderer<Stdout>) -> Result<()> {
        let mut dirty = true;
        loop {
            if self.sync_with_session()? {
                dirty = true;
            }
            if dirty {
                self.redraw(renderer)?;
                dirty = false;
            }

            if event::poll(Duration::from_millis(50))? {
                let ui_event = self.mapper.map_event(event::read()?);
                if ui_event != UiEvent::None {
                    self.notice = None;
                }
                match self.handle_event(ui_event).await {
                    LoopAction::Continue => self.draw_status(renderer)?,
                    LoopAction::Redraw => dirty = true,
                    LoopAction::Quit => return Ok(()),
                }
            }
        }
    }

    /// Applies queued session events to the projections and renders the
    /// pages now in view. Returns whether anything visible changed.
    fn sync_with_session(&mut self) -> Result<bool> {
        let events = self.session.drain_events();
        for event in &events {
            self.projections.apply_event(event);
            if let SessionEvent::Notice(notice) = event {
                self.notice = Some(notice.clone());
            }
        }
        let Some(document) = self.session.document() else {
            return Ok(!events.is_empty());
        };

        let screen = Self::screen()?;
        let view = self.session.view();
        let full_pages = prefetch_window(view.active_page, document.page_count());
        let thumbnail_pages = split(&screen, view.thumbnails_visible)
            .strip
            .and_then(|strip| self.strip_plan(&screen, strip, document.as_ref(), view.active_page))
            .map_or(1..1, |(_, pages)| pages);
        let rendered =
            self.projections
                .refresh(document.as_ref(), view.zoom, full_pages, thumbnail_pages);
        Ok(!events.is_empty() || rendered > 0)
    }

    /// Slot height and the pages the strip shows. Every slot is sized after
    /// page 1 at thumbnail scale.
    fn strip_plan(
        &self,
        screen: &Screen,
        strip: Area,
        document: &dyn RenderedDocument,
        active_page: usize,
    ) -> Option<(u16, Range<usize>)> {
        let (width, height) = document
            .page_size(1)
            .ok()?
            .scaled(self.projections.thumbnail_scale());
        let (slot_rows, slots) = strip_slots(screen, strip, width, height);
        Some((
            slot_rows,
            thumbnail_window(active_page, document.page_count(), slots),
        ))
    }

    async fn handle_event(&mut self, event: UiEvent) -> LoopAction {
        match event {
            UiEvent::Command(command) => {
                if self.session.apply(command) {
                    LoopAction::Redraw
                } else {
                    LoopAction::Continue
                }
            }
            UiEvent::DeleteActivePage => {
                let session = Arc::clone(&self.session);
                tokio::spawn(async move {
                    // Failures reach the user as session notices.
                    let _ = session.delete_active_page().await;
                });
                LoopAction::Continue
            }
            UiEvent::Undo => {
                let session = Arc::clone(&self.session);
                tokio::spawn(async move {
                    let _ = session.undo().await;
                });
                LoopAction::Continue
            }
            UiEvent::OpenPath(path) => {
                self.open(&path);
                LoopAction::Continue
            }
            UiEvent::InvalidDrop(err) => {
                warn!(%err, "ignored drop");
                self.notice = Some(Notice::warning("Please open a PDF file."));
                LoopAction::Continue
            }
            UiEvent::Export => {
                self.export().await;
                LoopAction::Continue
            }
            UiEvent::BeginOpen | UiEvent::PromptChanged { .. } | UiEvent::PromptCancel => {
                LoopAction::Continue
            }
            UiEvent::Redraw => LoopAction::Redraw,
            UiEvent::Quit => LoopAction::Quit,
            UiEvent::None => LoopAction::Continue,
        }
    }

    fn open(&mut self, path: &Path) {
        match DocumentSource::from_path(path) {
            Ok(source) => {
                let session = Arc::clone(&self.session);
                tokio::spawn(async move {
                    let _ = session.load(source).await;
                });
            }
            Err(err) => {
                warn!(%err, path = %path.display(), "rejected file");
                self.notice = Some(Notice::warning(err.user_message()));
            }
        }
    }

    async fn export(&mut self) {
        let export = match self.session.export(Utc::now()) {
            Ok(export) => export,
            Err(_) => return,
        };
        let target = self.output_dir.join(&export.file_name);
        self.notice = Some(match tokio::fs::write(&target, &export.bytes[..]).await {
            Ok(()) => {
                info!(path = %target.display(), bytes = export.bytes.len(), "wrote edited copy");
                Notice::info(format!("Saved {}", target.display()))
            }
            Err(err) => {
                warn!(%err, path = %target.display(), "failed to write edited copy");
                Notice::warning(format!("Could not write {}", target.display()))
            }
        });
    }

    fn screen() -> Result<Screen> {
        let window = terminal::window_size()?;
        Ok(Screen::new(
            window.columns,
            window.rows,
            window.width,
            window.height,
        ))
    }

    fn redraw(&mut self, renderer: &mut KittyRenderer<Stdout>) -> Result<()> {
        let screen = Self::screen()?;
        let view = self.session.view();
        let layout = split(&screen, view.thumbnails_visible);

        renderer.begin_sync_update()?;
        renderer.delete_all()?;
        renderer.clear_all()?;

        if let Some(raster) = self.projections.full.page(view.active_page) {
            match raster.image() {
                Some(image) => {
                    let placed = fit(&screen, layout.page, image.width, image.height);
                    renderer.draw(image, placement(PAGE_IMAGE_ID, placed))?;
                }
                None => draw_label(renderer, layout.page, "Page could not be rendered")?,
            }
        }

        if let Some(strip) = layout.strip {
            self.draw_strip(renderer, &screen, strip, view.active_page)?;
        }

        self.draw_status(renderer)?;
        renderer.end_sync_update()
    }

    fn draw_strip(
        &self,
        renderer: &mut KittyRenderer<Stdout>,
        screen: &Screen,
        strip: Area,
        active_page: usize,
    ) -> Result<()> {
        let Some(document) = self.session.document() else {
            return Ok(());
        };
        let Some((slot_rows, pages)) =
            self.strip_plan(screen, strip, document.as_ref(), active_page)
        else {
            return Ok(());
        };
        let page_count = document.page_count();

        let mut row = strip.row;
        for page in pages {
            let slot = Area {
                column: strip.column,
                row,
                columns: strip.columns,
                rows: slot_rows - 1,
            };
            match self.projections.thumbnails.page(page).and_then(PageRaster::image) {
                Some(image) => {
                    let placed = fit(screen, slot, image.width, image.height);
                    let id = THUMBNAIL_IMAGE_BASE + page as u32;
                    renderer.draw(image, placement(id, placed))?;
                }
                None => draw_label(renderer, slot, "?")?,
            }
            let label = Area {
                row: row + slot_rows - 1,
                rows: 1,
                ..slot
            };
            let text = thumbnail_label(page, page_count, active_page, label.columns);
            draw_label(renderer, label, &text)?;
            row += slot_rows;
        }
        Ok(())
    }

    fn draw_status(&self, renderer: &mut KittyRenderer<Stdout>) -> Result<()> {
        let screen = Self::screen()?;
        let view = self.session.view();
        let name = self.session.source_name();
        let info = StatusInfo {
            file_name: name.as_deref(),
            page: view.active_page,
            page_count: self.session.snapshot().map_or(0, |s| s.page_count),
            zoom_percent: view.zoom_percent(),
            undo_steps: self.session.undo_depth_used(),
        };
        let pending = self.mapper.pending_input();
        let line = combine_status(format_status(&info), self.notice.as_ref(), pending.as_deref());
        write_status_line(
            renderer.writer(),
            screen.rows.saturating_sub(1),
            screen.columns,
            &line,
        )?;
        Ok(())
    }
}

fn placement(image_id: u32, area: Area) -> Placement {
    Placement::new(
        image_id,
        area.column,
        area.row,
        u32::from(area.columns),
        u32::from(area.rows),
    )
}

fn draw_label(renderer: &mut KittyRenderer<Stdout>, area: Area, text: &str) -> Result<()> {
    let clipped: String = text.chars().take(usize::from(area.columns)).collect();
    crossterm::queue!(
        renderer.writer(),
        cursor::MoveTo(area.column, area.row),
        crossterm::style::Print(clipped)
    )?;
    Ok(())
}

fn load_config(explicit: Option<&Path>, project_dirs: &ProjectDirs) -> Result<EditorConfig> {
    let path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| project_dirs.config_dir().join(CONFIG_FILE_NAME));
    let config = EditorConfig::load(&path)
        .with_context(|| format!("invalid configuration in {}", path.display()))?;
    info!(path = %path.display(), undo_depth = config.undo_depth, "configuration ready");
    Ok(config)
}

fn init_logging(project_dirs: &ProjectDirs) -> Result<WorkerGuard> {
    let log_dir = project_dirs.data_local_dir().join("logs");
    fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::never(log_dir, "pagecut.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // The terminal belongs to the page view, so logs go to the file only.
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(file_writer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .try_init()
        .map_err(|err| anyhow!(err))?;
    Ok(guard)
}
