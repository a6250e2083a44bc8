use pagecut_core::{page_label, Notice, NoticeLevel};

/// What the status line reports about the session.
#[derive(Debug, Clone, Copy)]
pub struct StatusInfo<'a> {
    pub file_name: Option<&'a str>,
    pub page: usize,
    pub page_count: usize,
    pub zoom_percent: u32,
    pub undo_steps: usize,
}

pub fn format_status(info: &StatusInfo<'_>) -> String {
    match info.file_name {
        Some(name) => format!(
            "{name} | {} | {}% | undo: {}",
            page_label(info.page, info.page_count),
            info.zoom_percent,
            info.undo_steps
        ),
        None => "No PDF loaded | o: open file | q: quit".to_string(),
    }
}

/// Label under a strip thumbnail, with `>` marking the active page. Falls
/// back to `{page} of {count}` when the full label is wider than `columns`.
pub fn thumbnail_label(page: usize, page_count: usize, active: usize, columns: u16) -> String {
    let marker = if page == active { '>' } else { ' ' };
    let full = format!("{marker} {}", page_label(page, page_count));
    if full.chars().count() <= usize::from(columns) {
        full
    } else {
        format!("{marker}{page} of {page_count}")
    }
}

/// Joins the session status with the latest notice and any half-typed input.
pub fn combine_status(base: String, notice: Option<&Notice>, pending_input: Option<&str>) -> String {
    let mut line = base;
    if let Some(notice) = notice {
        let marker = match notice.level {
            NoticeLevel::Info => "",
            NoticeLevel::Warning => "! ",
        };
        line.push_str(" | ");
        line.push_str(marker);
        line.push_str(&notice.message);
    }
    if let Some(pending) = pending_input.filter(|s| !s.is_empty()) {
        line.push_str(" | ");
        line.push_str(pending);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded() -> StatusInfo<'static> {
        StatusInfo {
            file_name: Some("report.pdf"),
            page: 2,
            page_count: 7,
            zoom_percent: 110,
            undo_steps: 3,
        }
    }

    #[test]
    fn status_for_loaded_document() {
        insta::assert_snapshot!(format_status(&loaded()), @"report.pdf | Page 2 of 7 | 110% | undo: 3");
    }

    #[test]
    fn status_without_document() {
        let info = StatusInfo {
            file_name: None,
            page: 0,
            page_count: 0,
            zoom_percent: 100,
            undo_steps: 0,
        };
        insta::assert_snapshot!(format_status(&info), @"No PDF loaded | o: open file | q: quit");
    }

    #[test]
    fn warnings_and_pending_input_are_appended() {
        let notice = Notice::warning("Cannot delete the last page of the PDF.");
        let line = combine_status(format_status(&loaded()), Some(&notice), Some("12"));
        insta::assert_snapshot!(line, @"report.pdf | Page 2 of 7 | 110% | undo: 3 | ! Cannot delete the last page of the PDF. | 12");
    }

    #[test]
    fn strip_labels_after_deleting_a_middle_page() {
        let labels: Vec<_> = (1..=2).map(|page| thumbnail_label(page, 2, 2, 20)).collect();
        insta::assert_debug_snapshot!(labels, @r###"
        [
            "  Page 1 of 2",
            "> Page 2 of 2",
        ]
        "###);
    }

    #[test]
    fn narrow_strip_uses_short_labels() {
        assert_eq!(thumbnail_label(12, 30, 12, 8), ">12 of 30");
        assert_eq!(thumbnail_label(3, 30, 12, 8), " 3 of 30");
    }

    #[test]
    fn info_notices_have_no_marker() {
        let notice = Notice::info("Saved out.pdf");
        let line = combine_status("base".to_string(), Some(&notice), Some(""));
        assert_eq!(line, "base | Saved out.pdf");
    }
}
