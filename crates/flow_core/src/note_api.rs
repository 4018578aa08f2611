use crate::datetime::{local_offset, now_rfc3339, parse_rfc3339};
use crate::error::AppError;
use crate::model::Note;
use crate::storage::json_store;
use docx_rs::{
    AbstractNumbering, Docx, IndentLevel, Level, LevelJc, LevelText, NumberFormat, Numbering,
    NumberingId, Paragraph, Run, SpecialIndentType, Start,
};
use log::info;
use std::io::Cursor;
use std::path::Path;
use std::str::FromStr;
use time::macros::format_description;
use time::{Date, OffsetDateTime, UtcOffset};

const EXPORT_RULE: &str = "=============================";
const EXPORT_SEPARATOR: &str = "--------------------------------";
const DOCX_BULLET_ID: usize = 1;
const DOCX_INDENT: i32 = 720;
const DOCX_STATUS_COLOR: &str = "888888";

pub fn add_note(content: &str) -> Result<Note, AppError> {
    let path = json_store::store_path()?;
    add_note_with_path(&path, content)
}

pub fn edit_note(id: &str, content: &str) -> Result<Note, AppError> {
    let path = json_store::store_path()?;
    edit_note_with_path(&path, id, content)
}

pub fn toggle_note(id: &str) -> Result<Note, AppError> {
    let path = json_store::store_path()?;
    toggle_note_with_path(&path, id)
}

pub fn delete_note(id: &str) -> Result<Note, AppError> {
    let path = json_store::store_path()?;
    delete_note_with_path(&path, id)
}

pub fn get_note(id: &str) -> Result<Note, AppError> {
    let path = json_store::store_path()?;
    get_note_with_path(&path, id)
}

pub fn list_notes() -> Result<Vec<Note>, AppError> {
    let path = json_store::store_path()?;
    list_notes_with_path(&path)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Txt,
    Docx,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Txt => "txt",
            ExportFormat::Docx => "docx",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "txt" | "text" => Ok(ExportFormat::Txt),
            "docx" | "word" => Ok(ExportFormat::Docx),
            other => Err(AppError::invalid_input(format!(
                "unknown export format '{other}' (expected txt or docx)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesExport {
    pub file_name: String,
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
    pub count: usize,
}

/// Renders every note into an export document, or fails when there are none.
pub fn export_notes(format: ExportFormat) -> Result<NotesExport, AppError> {
    let notes = list_notes()?;
    let export = render_export(&notes, format, OffsetDateTime::now_utc(), local_offset())?;
    info!(
        "event=note_export format={} count={}",
        format.extension(),
        export.count
    );
    Ok(export)
}

/// The file name carries the UTC date; the banner inside uses the local date.
fn render_export(
    notes: &[Note],
    format: ExportFormat,
    now: OffsetDateTime,
    offset: UtcOffset,
) -> Result<NotesExport, AppError> {
    let local_today = now.to_offset(offset).date();
    let bytes = match format {
        ExportFormat::Txt => export_notes_txt(notes, local_today)?.into_bytes(),
        ExportFormat::Docx => export_notes_docx(notes, local_today)?,
    };
    Ok(NotesExport {
        file_name: export_file_name(now.to_offset(UtcOffset::UTC).date(), format)?,
        format,
        bytes,
        count: notes.len(),
    })
}

pub fn export_file_name(date: Date, format: ExportFormat) -> Result<String, AppError> {
    let stamp = date
        .format(format_description!("[year]-[month]-[day]"))
        .map_err(|err| AppError::invalid_data(err.to_string()))?;
    Ok(format!("Flow_Notes_{stamp}.{}", format.extension()))
}

fn required_id(id: &str) -> Result<&str, AppError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("id is required"));
    }
    Ok(trimmed)
}

fn required_content(content: &str) -> Result<String, AppError> {
    if content.trim().is_empty() {
        return Err(AppError::invalid_input("content is required"));
    }
    Ok(content.trim_end().to_string())
}

fn add_note_with_path(path: &Path, content: &str) -> Result<Note, AppError> {
    let content = required_content(content)?;
    let now = now_rfc3339()?;
    let note = Note {
        id: format!("note-{}", OffsetDateTime::now_utc().unix_timestamp_nanos()),
        content,
        completed: false,
        created_at: now.clone(),
        last_edited: now,
    };

    json_store::update_state(path, |state| {
        state.notes.push(note.clone());
        Ok(())
    })?;
    info!("event=note_add id={}", note.id);

    Ok(note)
}

fn edit_note_with_path(path: &Path, id: &str, content: &str) -> Result<Note, AppError> {
    let trimmed_id = required_id(id)?;
    let content = required_content(content)?;
    let last_edited = now_rfc3339()?;

    let updated = json_store::update_state(path, |state| {
        let note = state
            .notes
            .iter_mut()
            .find(|note| note.id == trimmed_id)
            .ok_or_else(|| AppError::not_found("note not found"))?;
        note.content = content;
        note.last_edited = last_edited;
        Ok(note.clone())
    })?;
    info!(
        "event=note_edit id={} bytes={}",
        updated.id,
        updated.content.len()
    );

    Ok(updated)
}

fn toggle_note_with_path(path: &Path, id: &str) -> Result<Note, AppError> {
    let trimmed_id = required_id(id)?;

    let toggled = json_store::update_state(path, |state| {
        let note = state
            .notes
            .iter_mut()
            .find(|note| note.id == trimmed_id)
            .ok_or_else(|| AppError::not_found("note not found"))?;
        note.completed = !note.completed;
        Ok(note.clone())
    })?;
    info!(
        "event=note_toggle id={} completed={}",
        toggled.id, toggled.completed
    );

    Ok(toggled)
}

fn delete_note_with_path(path: &Path, id: &str) -> Result<Note, AppError> {
    let trimmed_id = required_id(id)?;

    let removed = json_store::update_state(path, |state| {
        let index = state
            .notes
            .iter()
            .position(|note| note.id == trimmed_id)
            .ok_or_else(|| AppError::not_found("note not found"))?;
        Ok(state.notes.remove(index))
    })?;
    info!("event=note_delete id={}", removed.id);

    Ok(removed)
}

fn get_note_with_path(path: &Path, id: &str) -> Result<Note, AppError> {
    let trimmed_id = required_id(id)?;

    json_store::load_state(path)?
        .notes
        .into_iter()
        .find(|note| note.id == trimmed_id)
        .ok_or_else(|| AppError::not_found("note not found"))
}

fn list_notes_with_path(path: &Path) -> Result<Vec<Note>, AppError> {
    let notes = json_store::load_state(path)?.notes;
    sort_notes_by_last_edited(notes)
}

/// Most recently edited first.
pub fn sort_notes_by_last_edited(notes: Vec<Note>) -> Result<Vec<Note>, AppError> {
    let mut keyed = Vec::with_capacity(notes.len());
    for note in notes {
        let edited = parse_rfc3339(&note.last_edited, "last_edited")?;
        keyed.push((edited, note));
    }
    keyed.sort_by(|(left, _), (right, _)| right.cmp(left));
    Ok(keyed.into_iter().map(|(_, note)| note).collect())
}

fn export_heading(date: Date) -> Result<String, AppError> {
    date.format(format_description!(
        "[month repr:long] [day padding:none], [year]"
    ))
    .map_err(|err| AppError::invalid_data(err.to_string()))
}

pub fn export_notes_txt(notes: &[Note], date: Date) -> Result<String, AppError> {
    if notes.is_empty() {
        return Err(AppError::invalid_input("no notes to export"));
    }

    let heading = export_heading(date)?;
    let mut output = format!(
        "{EXPORT_RULE}\nFLOW NOTES – {}\n{EXPORT_RULE}\n",
        heading.to_uppercase()
    );
    for note in notes {
        let marker = if note.completed { 'x' } else { ' ' };
        output.push_str(&format!(
            "\n[{marker}] Note from {}\n\n{}\n\n{EXPORT_SEPARATOR}\n",
            note.created_at, note.content
        ));
    }

    Ok(output)
}

/// Word document: a title, then per note a bullet heading, a gray italic
/// status line and the indented content lines.
pub fn export_notes_docx(notes: &[Note], date: Date) -> Result<Vec<u8>, AppError> {
    if notes.is_empty() {
        return Err(AppError::invalid_input("no notes to export"));
    }

    let bullet = Level::new(
        0,
        Start::new(1),
        NumberFormat::new("bullet"),
        LevelText::new("•"),
        LevelJc::new("left"),
    )
    .indent(
        Some(DOCX_INDENT),
        Some(SpecialIndentType::Hanging(360)),
        None,
        None,
    );

    let title = format!("Flow Notes – {}", export_heading(date)?);
    let mut docx = Docx::new()
        .add_abstract_numbering(AbstractNumbering::new(DOCX_BULLET_ID).add_level(bullet))
        .add_numbering(Numbering::new(DOCX_BULLET_ID, DOCX_BULLET_ID))
        .add_paragraph(
            Paragraph::new()
                .style("Title")
                .add_run(Run::new().add_text(title).bold().size(32)),
        );

    for note in notes {
        let status = if note.completed {
            "✓ Completed"
        } else {
            "☐ Open"
        };
        docx = docx
            .add_paragraph(
                Paragraph::new()
                    .numbering(NumberingId::new(DOCX_BULLET_ID), IndentLevel::new(0))
                    .add_run(Run::new().add_text(format!("Note from {}", note.created_at))),
            )
            .add_paragraph(
                Paragraph::new()
                    .indent(Some(DOCX_INDENT), None, None, None)
                    .add_run(
                        Run::new()
                            .add_text(status)
                            .italic()
                            .color(DOCX_STATUS_COLOR),
                    ),
            );
        for line in note.content.lines() {
            docx = docx.add_paragraph(
                Paragraph::new()
                    .indent(Some(DOCX_INDENT), None, None, None)
                    .add_run(Run::new().add_text(line)),
            );
        }
        docx = docx.add_paragraph(Paragraph::new());
    }

    let mut buffer = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut buffer)
        .map_err(|err| AppError::io(format!("failed to build docx export: {err}")))?;
    Ok(buffer.into_inner())
}
