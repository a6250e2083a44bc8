use std::ops::Range;

/// Cell size assumed when the terminal does not report its pixel size.
const FALLBACK_CELL: (f32, f32) = (8.0, 16.0);
/// Narrower terminals get no thumbnail strip.
const STRIP_MIN_COLUMNS: u16 = 40;

/// A rectangle of terminal cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Area {
    pub column: u16,
    pub row: u16,
    pub columns: u16,
    pub rows: u16,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Screen {
    pub columns: u16,
    pub rows: u16,
    cell_width: f32,
    cell_height: f32,
}

impl Screen {
    pub fn new(columns: u16, rows: u16, pixel_width: u16, pixel_height: u16) -> Self {
        let columns = columns.max(1);
        let rows = rows.max(1);
        let (cell_width, cell_height) = if pixel_width > 0 && pixel_height > 0 {
            (
                f32::from(pixel_width) / f32::from(columns),
                f32::from(pixel_height) / f32::from(rows),
            )
        } else {
            FALLBACK_CELL
        };
        Self {
            columns,
            rows,
            cell_width,
            cell_height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub page: Area,
    pub strip: Option<Area>,
    pub status_row: u16,
}

/// Splits the screen into the thumbnail strip, the page view and the status
/// line on the last row.
pub fn split(screen: &Screen, thumbnails_visible: bool) -> Layout {
    let body_rows = screen.rows.saturating_sub(1).max(1);
    let strip_columns = if thumbnails_visible && screen.columns >= STRIP_MIN_COLUMNS {
        (screen.columns / 5).clamp(8, 24)
    } else {
        0
    };
    let strip = (strip_columns > 0).then_some(Area {
        column: 0,
        row: 0,
        columns: strip_columns,
        rows: body_rows,
    });
    let page_column = if strip_columns > 0 { strip_columns + 1 } else { 0 };

    Layout {
        page: Area {
            column: page_column,
            row: 0,
            columns: screen.columns.saturating_sub(page_column).max(1),
            rows: body_rows,
        },
        strip,
        status_row: screen.rows.saturating_sub(1),
    }
}

/// Cells an image of `width`x`height` pixels covers inside `area`, centred.
/// Images larger than the area are shrunk with their aspect ratio kept.
pub fn fit(screen: &Screen, area: Area, width: u32, height: u32) -> Area {
    if width == 0 || height == 0 {
        return area;
    }
    let max_columns = f32::from(area.columns.max(1));
    let max_rows = f32::from(area.rows.max(1));
    let natural_columns = (width as f32 / screen.cell_width).ceil().max(1.0);
    let natural_rows = (height as f32 / screen.cell_height).ceil().max(1.0);
    let shrink = (max_columns / natural_columns)
        .min(max_rows / natural_rows)
        .min(1.0);

    let columns = (natural_columns * shrink).floor().clamp(1.0, max_columns) as u16;
    let rows = (natural_rows * shrink).floor().clamp(1.0, max_rows) as u16;
    Area {
        column: area.column + (area.columns.saturating_sub(columns)) / 2,
        row: area.row + (area.rows.saturating_sub(rows)) / 2,
        columns,
        rows,
    }
}

/// Rows taken by one strip slot, a thumbnail of `width`x`height` pixels plus
/// its label row, and how many such slots fit in `strip`.
pub fn strip_slots(screen: &Screen, strip: Area, width: u32, height: u32) -> (u16, usize) {
    let slot_rows = fit(screen, strip, width, height).rows + 1;
    (slot_rows, usize::from(strip.rows / slot_rows))
}

/// 1-based pages shown in a strip with room for `slots` thumbnails, keeping
/// the active page near the middle.
pub fn thumbnail_window(active: usize, page_count: usize, slots: usize) -> Range<usize> {
    if page_count == 0 || slots == 0 {
        return 1..1;
    }
    let end = (active.saturating_sub(slots / 2).max(1) + slots).min(page_count + 1);
    let start = end.saturating_sub(slots).max(1);
    start..end
}
