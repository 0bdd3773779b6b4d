//! Editor Window Recognition
//!
//! Decides which application windows belong to code editors and pulls the
//! project name and active tab out of their titles.

use crate::commands::WindowInfo;

/// Applications treated as code editors
pub const EDITOR_APPLICATIONS: &[&str] = &[
    "Visual Studio Code",
    "Code",
    "VSCode",
    "Zed",
    "Sublime Text",
    "Sublime Text 3",
    "Sublime Text 4",
    "Atom",
    "Vim",
    "MacVim",
    "Neovim",
    "Emacs",
    "GNU Emacs",
    "IntelliJ IDEA",
    "PyCharm",
    "WebStorm",
    "PhpStorm",
    "RubyMine",
    "CLion",
    "GoLand",
    "DataGrip",
    "Rider",
    "Android Studio",
    "Xcode",
    "TextEdit",
    "TextMate",
    "Brackets",
    "Nova",
    "CotEditor",
    "BBEdit",
    "Nano",
    "Cursor",
    "Fleet",
    "Helix",
];

const JETBRAINS_MARKERS: &[&str] = &[
    "IntelliJ", "PyCharm", "WebStorm", "PhpStorm", "RubyMine", "CLion", "GoLand", "DataGrip",
    "Rider",
];

const BROWSER_MARKERS: &[&str] = &["Chrome", "Safari", "Firefox"];

/// Fragments that mark a tab as a terminal or task rather than a file
const COMMAND_PATTERNS: &[&str] = &[
    " run ", " dev", " build", " test", " start", "npm ", "yarn ", "bun ", "cargo ", "pnpm ",
];

const EM_DASH: &str = " \u{2014} ";
const DASH: &str = " - ";
const FILE_URL_PREFIX: &str = "file://";

/// How much shorter a part must be before its length alone marks it as the project
const LENGTH_MARGIN: usize = 5;

/// Project and tab recovered from a window title
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleInfo {
    pub project: Option<String>,
    pub tab: Option<String>,
}

impl TitleInfo {
    fn project(project: impl Into<String>) -> Self {
        Self {
            project: Some(project.into()),
            tab: None,
        }
    }

    fn both(project: &str, tab: &str) -> Self {
        Self {
            project: Some(project.to_string()),
            tab: Some(tab.to_string()),
        }
    }
}

/// Returns true if `app_name` is a known editor or a variant of one
/// ("Visual Studio Code - Insiders", "Code - OSS")
pub fn is_editor_application(app_name: &str) -> bool {
    EDITOR_APPLICATIONS
        .iter()
        .any(|&editor| app_name.eq_ignore_ascii_case(editor) || app_name.contains(editor))
}

fn mentions_editor(title: &str) -> bool {
    EDITOR_APPLICATIONS.iter().any(|&editor| title.contains(editor))
}

fn mentions_any(title: &str, markers: &[&str]) -> bool {
    markers.iter().any(|&marker| title.contains(marker))
}

fn mentions_vscode_family(title: &str) -> bool {
    title.contains("Visual Studio Code") || title.contains("Cursor")
}

/// Build the listing entry for a window, or `None` when the app is not an editor
pub fn describe_window(
    app_name: &str,
    title: Option<&str>,
    pid: i32,
    window_number: u32,
) -> Option<WindowInfo> {
    if !is_editor_application(app_name) {
        return None;
    }

    let title = title.map(str::trim).filter(|t| !t.is_empty());
    let info = title.map(parse_title).unwrap_or_default();

    Some(WindowInfo {
        app_name: app_name.to_string(),
        window_name: title.map(str::to_string),
        pid,
        window_number,
        project: info.project,
        active_editor_tab: info.tab,
        app_icon: None,
    })
}

/// Recover project and tab from an editor window title.
///
/// Recognized shapes:
/// - `project \u{2014} file.ext` and `command \u{2014} project` (Zed, Cursor)
/// - `file.ext - project - Visual Studio Code` (VS Code, Cursor)
/// - anything [`project_from_title`] understands, without a tab
pub fn parse_title(title: &str) -> TitleInfo {
    if title.is_empty() {
        return TitleInfo::default();
    }

    if let Some((first, second)) = split_pair(title, EM_DASH) {
        if is_meaningful(first) && is_meaningful(second) {
            let (project, tab) = assign_project_and_tab(first, second);
            return TitleInfo::both(project, tab);
        }
    }

    if mentions_vscode_family(title) {
        let parts: Vec<&str> = title.split(DASH).map(str::trim).collect();
        if let [tab, project, _, ..] = parts.as_slice() {
            if !tab.is_empty() && !project.is_empty() && !project.contains('/') {
                return TitleInfo::both(project, tab);
            }
        }
    }

    match project_from_title(title) {
        Some(project) if is_clean_project(&project) => TitleInfo::project(project),
        _ => TitleInfo::default(),
    }
}

/// Project name alone, for titles that carry no separable tab
pub fn project_from_title(title: &str) -> Option<String> {
    if title.is_empty() {
        return None;
    }

    if let Some((first, second)) = split_pair(title, EM_DASH) {
        // "project — file.ext"
        if second.contains('.') && !first.contains('/') && !first.is_empty() {
            return Some(first.to_string());
        }
        // "command — project"
        if !second.contains('/') && !second.contains('.') && !second.is_empty() {
            return Some(second.to_string());
        }
    }

    if mentions_vscode_family(title) {
        let parts: Vec<&str> = title.split(DASH).map(str::trim).collect();
        if let [_, project, _, ..] = parts.as_slice() {
            if !project.is_empty() && !project.contains('/') {
                return Some(project.to_string());
            }
        }
    }

    if title.contains("Xcode") {
        let head = title.split(DASH).next().unwrap_or(title).trim();
        if !head.is_empty() && !head.contains("Xcode") && !head.contains('/') {
            return Some(head.to_string());
        }
    }

    if !mentions_editor(title) {
        // "project - file.ext"
        if let Some((project, file)) = split_pair(title, DASH) {
            if file.contains('.') && !project.contains('/') {
                return Some(project.to_string());
            }
        }

        // Bare project name
        let bare = !title.contains(DASH) && !title.contains('/') && !title.contains('.');
        if bare && !mentions_any(title, BROWSER_MARKERS) {
            let cleaned = title.trim();
            if cleaned.len() > 1 {
                return Some(cleaned.to_string());
            }
        }
    }

    // "project [path] - IntelliJ IDEA"
    if mentions_any(title, JETBRAINS_MARKERS) {
        if let Some(bracket) = title.find('[') {
            let project = title[..bracket].trim();
            if !project.is_empty() {
                return Some(project.to_string());
            }
        }
    }

    // "/path/to/file.ext - Sublime Text"
    if title.contains("Sublime Text") {
        let file = title.split(DASH).next().unwrap_or_default().trim();
        if title.contains(DASH) && file.contains('/') {
            return project_from_path(file);
        }
    }

    if title.contains('/') {
        return project_from_path(title);
    }

    None
}

/// Guess a project name from a file path: the directory holding `src`, `lib`
/// or `app`, else the last meaningful component
pub fn project_from_path(path: &str) -> Option<String> {
    let path = path.strip_prefix(FILE_URL_PREFIX).unwrap_or(path);
    let parts: Vec<&str> = path.split('/').collect();

    let rooted = parts.windows(2).find_map(|pair| match pair {
        [project, "src" | "lib" | "app"] if project.len() > 1 => Some(project.to_string()),
        _ => None,
    });
    if rooted.is_some() {
        return rooted;
    }

    parts
        .iter()
        .rev()
        .find(|part| {
            part.len() > 1 && !part.starts_with('.') && !part.chars().all(|c| c.is_numeric())
        })
        .map(|part| part.to_string())
}

/// Split into exactly two trimmed parts, or `None`
fn split_pair<'a>(title: &'a str, separator: &str) -> Option<(&'a str, &'a str)> {
    let mut parts = title.split(separator);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(first), Some(second), None) => Some((first.trim(), second.trim())),
        _ => None,
    }
}

fn is_dash_or_punctuation(c: char) -> bool {
    c.is_ascii_punctuation() || c == '\u{2014}' || c == '\u{2013}'
}

fn is_meaningful(part: &str) -> bool {
    part.len() > 1 && !part.chars().all(is_dash_or_punctuation)
}

fn is_clean_project(project: &str) -> bool {
    is_meaningful(project)
        && !project.contains(['\u{2014}', '\u{2013}'])
        && project.trim() == project
}

/// Decide which half of a two-part title is the project and which the tab
pub fn assign_project_and_tab<'a>(first: &'a str, second: &'a str) -> (&'a str, &'a str) {
    match (has_file_extension(first), has_file_extension(second)) {
        (true, false) => return (second, first),
        (false, true) => return (first, second),
        _ => {}
    }

    match (is_command_like(first), is_command_like(second)) {
        (true, false) => return (second, first),
        (false, true) => return (first, second),
        _ => {}
    }

    let is_plain = |part: &str| !part.contains('/') && !part.contains(' ');
    if first.len() + LENGTH_MARGIN <= second.len() && is_plain(first) {
        return (first, second);
    }
    if second.len() + LENGTH_MARGIN <= first.len() && is_plain(second) {
        return (second, first);
    }

    (first, second)
}

/// True for names ending in a 2-4 character alphanumeric extension
pub fn has_file_extension(text: &str) -> bool {
    text.rsplit_once('.').is_some_and(|(_, extension)| {
        (2..=4).contains(&extension.len()) && extension.chars().all(char::is_alphanumeric)
    })
}

/// True for tabs that look like a running command rather than a file
pub fn is_command_like(text: &str) -> bool {
    mentions_any(text, COMMAND_PATTERNS) || (text.contains(' ') && text.len() > 10)
}
