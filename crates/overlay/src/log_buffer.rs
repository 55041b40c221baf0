use std::fmt::Write as _;

use tracing::warn;
use tracks::{LogProvider, LogSeverity};

/// Append-only log text with the byte offset of every newline.
#[derive(Debug, Default, Clone)]
pub struct LogBuffer {
    text: String,
    line_ends: Vec<usize>,
}

impl LogBuffer {
    pub fn new() -> Self { Self::default() }

    /// Append `"[<severity>] <text>\n"`.
    pub fn append(&mut self, severity: LogSeverity, text: &str) {
        let start = self.text.len();
        // writing into a String cannot fail
        let _ = writeln!(self.text, "[{}] {}", severity, text);
        let added = self.text[start..].bytes().enumerate().filter(|&(_, b)| b == b'\n').map(|(i, _)| start + i);
        self.line_ends.extend(added);
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.line_ends.clear();
    }

    pub fn as_str(&self) -> &str { &self.text }

    pub fn is_empty(&self) -> bool { self.text.is_empty() }

    pub fn line_count(&self) -> usize { self.line_ends.len() }

    /// Every line without its trailing newline.
    pub fn lines(&self) -> FilteredLines<'_> {
        FilteredLines { text: &self.text, ends: &self.line_ends, next: 0, filter: None }
    }

    /// The text to display under `filter`.
    pub fn render<'a>(&'a self, filter: &'a LogFilter) -> LogView<'a> {
        if filter.is_active() {
            LogView::Filtered(FilteredLines { text: &self.text, ends: &self.line_ends, next: 0, filter: Some(filter) })
        } else {
            LogView::Full(&self.text)
        }
    }
}

/// Lines of a [`LogBuffer`], optionally restricted to those a filter passes.
///
/// Walks the newline index lazily; clone it to iterate again.
#[derive(Debug, Clone)]
pub struct FilteredLines<'a> {
    text: &'a str,
    ends: &'a [usize],
    next: usize,
    filter: Option<&'a LogFilter>,
}

impl<'a> Iterator for FilteredLines<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        while self.next < self.ends.len() {
            let start = if self.next == 0 { 0 } else { self.ends[self.next - 1] + 1 };
            let line = &self.text[start..self.ends[self.next]];
            self.next += 1;
            if self.filter.map_or(true, |f| f.passes(line)) {
                return Some(line);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) { (0, Some(self.ends.len() - self.next)) }
}

#[derive(Debug, Clone)]
pub enum LogView<'a> {
    Full(&'a str),
    Filtered(FilteredLines<'a>),
}

impl LogView<'_> {
    /// Displayed text, each line terminated by a newline.
    pub fn to_text(&self) -> String {
        match self {
            LogView::Full(text) => (*text).to_string(),
            LogView::Filtered(lines) => lines.clone().fold(String::new(), |mut out, line| {
                out.push_str(line);
                out.push('\n');
                out
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Term {
    Include(String),
    Exclude(String),
}

/// Comma separated, case-insensitive line filter.
///
/// `"error,warn"` keeps lines containing either term, `"-texture"` drops lines
/// containing "texture". Exclusions win over inclusions.
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    input: String,
    terms: Vec<Term>,
}

impl LogFilter {
    pub fn new(input: &str) -> Self {
        let mut filter = Self { input: input.to_string(), terms: Vec::new() };
        filter.build();
        filter
    }

    pub fn input(&self) -> &str { &self.input }

    /// Edit the raw filter text; call [`build`](Self::build) afterwards.
    pub fn input_mut(&mut self) -> &mut String { &mut self.input }

    pub fn set(&mut self, input: &str) {
        self.input.clear();
        self.input.push_str(input);
        self.build();
    }

    /// Reparse the terms from the input text.
    pub fn build(&mut self) {
        self.terms = self
            .input
            .split(',')
            .map(str::trim)
            .filter_map(|term| match term.strip_prefix('-') {
                Some(rest) if !rest.trim().is_empty() => Some(Term::Exclude(rest.trim().to_ascii_lowercase())),
                Some(_) => None,
                None if term.is_empty() => None,
                None => Some(Term::Include(term.to_ascii_lowercase())),
            })
            .collect();
    }

    pub fn is_active(&self) -> bool { !self.terms.is_empty() }

    pub fn passes(&self, line: &str) -> bool {
        if !self.is_active() {
            return true;
        }
        let line = line.to_ascii_lowercase();
        let mut has_include = false;
        let mut included = false;
        for term in &self.terms {
            match term {
                Term::Exclude(t) if line.contains(t.as_str()) => return false,
                Term::Exclude(_) => {}
                Term::Include(t) => {
                    has_include = true;
                    included |= line.contains(t.as_str());
                }
            }
        }
        !has_include || included
    }
}

/// Log window state: buffer, filter and the scroll request raised by new entries.
#[derive(Debug, Default)]
pub struct LogPanel {
    buffer: LogBuffer,
    filter: LogFilter,
    scroll_to_bottom: bool,
}

impl LogPanel {
    pub fn new() -> Self { Self::default() }

    pub fn buffer(&self) -> &LogBuffer { &self.buffer }

    pub fn filter(&self) -> &LogFilter { &self.filter }

    pub fn filter_mut(&mut self) -> &mut LogFilter { &mut self.filter }

    pub fn append(&mut self, severity: LogSeverity, text: &str) {
        self.buffer.append(severity, text);
        self.scroll_to_bottom = true;
    }

    /// Drain everything `provider` has queued. Returns how many messages were appended.
    pub fn poll<P: LogProvider + ?Sized>(&mut self, provider: &mut P) -> usize {
        let batch = match provider.drain_log_messages() {
            Ok(batch) => batch,
            Err(e) => {
                warn!("log provider: {e}");
                return 0;
            }
        };
        for message in &batch {
            self.append(message.severity, &message.text);
        }
        batch.len()
    }

    pub fn clear(&mut self) { self.buffer.clear(); }

    pub fn view(&self) -> LogView<'_> { self.buffer.render(&self.filter) }

    /// Text for the "Copy" button: what is currently displayed.
    pub fn copy_text(&self) -> String { self.view().to_text() }

    /// True once after new entries were appended.
    pub fn take_scroll_to_bottom(&mut self) -> bool { std::mem::take(&mut self.scroll_to_bottom) }
}
