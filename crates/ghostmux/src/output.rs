use anyhow::Result;
use ghostmux_core::Session;
use serde::Serialize;
use std::path::Path;

/// JSON shape of one terminal in command output.
#[derive(Debug, Serialize)]
pub struct SessionRecord<'a> {
    pub id: &'a str,
    pub name: String,
    pub short_id: String,
    pub title: &'a str,
    pub focused: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cell_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cell_height: Option<u32>,
}

impl<'a> From<&'a Session> for SessionRecord<'a> {
    fn from(session: &'a Session) -> Self {
        Self {
            id: &session.id,
            name: session.name(),
            short_id: session.short_id(),
            title: &session.title,
            focused: session.focused,
            working_directory: session.working_directory.as_deref(),
            columns: session.columns,
            rows: session.rows,
            cell_width: session.cell_width,
            cell_height: session.cell_height,
        }
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Multi-line description printed after a terminal is created.
pub fn terminal_summary(session: &Session, label: &str) -> String {
    let mut output = format!("{label}: {} ({})", session.name(), session.short_id());
    if session.focused {
        output.push_str(" - now focused");
    }
    if let Some(cwd) = &session.working_directory {
        output.push_str(&format!("\nWorking directory: {cwd}"));
    }
    if let (Some(columns), Some(rows)) = (session.columns, session.rows) {
        output.push_str(&format!("\nSize: {columns}x{rows}"));
    }
    output
}

/// One row of a terminal listing: `name  short_id  title (dir) *`.
pub fn list_line(session: &Session, me: Option<&str>) -> String {
    let you = if me == Some(session.id.as_str()) {
        " (you)"
    } else {
        ""
    };
    let focused = if session.focused { " *" } else { "" };
    let mut title = session.title.clone();
    if let Some(cwd) = &session.working_directory {
        let dir = Path::new(cwd)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| cwd.clone());
        title.push_str(&format!(" ({dir})"));
    }
    format!(
        "{}{you}  {}  {title}{focused}",
        session.name(),
        session.short_id()
    )
}
