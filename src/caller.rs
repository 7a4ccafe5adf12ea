//! Caller information: which parts to show and how to render them.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::sync::Arc;

use tracing::Metadata;

/// Bitmask of caller components attached to each record.
///
/// File and function flags are independent and combine with `|`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CallerFlags(u8);

impl CallerFlags {
    pub const NONE: CallerFlags = CallerFlags(0);
    /// File name without directories.
    pub const SHORT_FILE: CallerFlags = CallerFlags(1);
    /// File path as recorded by the compiler.
    pub const LONG_FILE: CallerFlags = CallerFlags(1 << 1);
    /// Last segment of the module path.
    pub const SHORT_FUNC: CallerFlags = CallerFlags(1 << 2);
    /// Full module path.
    pub const LONG_FUNC: CallerFlags = CallerFlags(1 << 3);

    pub fn contains(self, other: CallerFlags) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for CallerFlags {
    type Output = CallerFlags;

    fn bitor(self, rhs: CallerFlags) -> CallerFlags {
        CallerFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for CallerFlags {
    fn bitor_assign(&mut self, rhs: CallerFlags) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for CallerFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = [
            (CallerFlags::SHORT_FILE, "SHORT_FILE"),
            (CallerFlags::LONG_FILE, "LONG_FILE"),
            (CallerFlags::SHORT_FUNC, "SHORT_FUNC"),
            (CallerFlags::LONG_FUNC, "LONG_FUNC"),
        ]
        .into_iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, name)| name)
        .collect();
        if names.is_empty() {
            f.write_str("CallerFlags(NONE)")
        } else {
            write!(f, "CallerFlags({})", names.join(" | "))
        }
    }
}

/// How the source file of a record is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileMode {
    None,
    #[default]
    Short,
    Long,
}

impl FileMode {
    /// `none` and `long` are recognized, anything else is `short`.
    pub fn parse(mode: &str) -> FileMode {
        match mode.to_ascii_lowercase().as_str() {
            "none" => FileMode::None,
            "long" => FileMode::Long,
            _ => FileMode::Short,
        }
    }

    pub fn flags(self) -> CallerFlags {
        match self {
            FileMode::None => CallerFlags::NONE,
            FileMode::Short => CallerFlags::SHORT_FILE,
            FileMode::Long => CallerFlags::LONG_FILE,
        }
    }
}

/// How the function (module path) of a record is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FuncMode {
    #[default]
    None,
    Short,
    Long,
    /// Full path with every package segment but the last cut to one letter.
    Simple,
}

impl FuncMode {
    /// `short`, `long` and `simple` are recognized, anything else is `none`.
    pub fn parse(mode: &str) -> FuncMode {
        match mode.to_ascii_lowercase().as_str() {
            "short" => FuncMode::Short,
            "long" => FuncMode::Long,
            "simple" => FuncMode::Simple,
            _ => FuncMode::None,
        }
    }

    pub fn flags(self) -> CallerFlags {
        match self {
            FuncMode::None => CallerFlags::NONE,
            FuncMode::Short => CallerFlags::SHORT_FUNC,
            FuncMode::Long | FuncMode::Simple => CallerFlags::LONG_FUNC,
        }
    }
}

/// Renders `(file, line, function)` into the suffix appended to a record.
///
/// Empty strings mean the component is absent.
pub type CallerFormatter = Arc<dyn Fn(&str, u32, &str) -> String + Send + Sync>;

/// Default caller rendering: `file:line (func)`, dropping absent parts.
pub fn format_caller(file: &str, line: u32, func: &str) -> String {
    match (file.is_empty(), func.is_empty()) {
        (false, false) => format!("{file}:{line} ({func})"),
        (false, true) => format!("{file}:{line}"),
        (true, false) => format!("({func})"),
        (true, true) => String::new(),
    }
}

/// Like [`format_caller`] but with the function path compressed.
pub fn format_caller_simple(file: &str, line: u32, func: &str) -> String {
    format_caller(file, line, &compress_path(func))
}

/// Caller formatter matching a function display mode.
pub fn caller_formatter(mode: FuncMode) -> CallerFormatter {
    match mode {
        FuncMode::Simple => Arc::new(format_caller_simple),
        _ => Arc::new(format_caller),
    }
}

/// Shorten a package path to the first letter of every segment but the last.
///
/// Segments are separated by `/` or `::`; the kept letters are joined with
/// `.` and the final segment is appended unchanged:
/// `github.com/org/pkg.Func` becomes `g.o.pkg.Func`.
pub fn compress_path(path: &str) -> String {
    let segments: Vec<&str> = path.split("::").flat_map(|s| s.split('/')).collect();
    let Some((last, parents)) = segments.split_last() else {
        return String::new();
    };
    let mut out = String::with_capacity(parents.len() * 2 + last.len());
    for segment in parents {
        if let Some(c) = segment.chars().next() {
            out.push(c);
            out.push('.');
        }
    }
    out.push_str(last);
    out
}

/// Caller suffix for a record with the given metadata.
pub(crate) fn render(
    flags: CallerFlags,
    format: &CallerFormatter,
    metadata: &Metadata<'_>,
) -> String {
    if flags.is_empty() {
        return String::new();
    }
    let path = metadata.file().unwrap_or_default();
    let file = if flags.contains(CallerFlags::LONG_FILE) {
        path
    } else if flags.contains(CallerFlags::SHORT_FILE) {
        short_file(path)
    } else {
        ""
    };
    let line = if file.is_empty() {
        0
    } else {
        metadata.line().unwrap_or(0)
    };
    let module = metadata.module_path().unwrap_or_default();
    let func = if flags.contains(CallerFlags::LONG_FUNC) {
        module
    } else if flags.contains(CallerFlags::SHORT_FUNC) {
        short_func(module)
    } else {
        ""
    };
    format(file, line, func)
}

/// Strip directories from a source path.
pub(crate) fn short_file(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Last segment of a module path.
pub(crate) fn short_func(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}
