//! ANSI to HTML conversion for transcripts, built on the `vte` state
//! machine. Colored console output becomes a document with inline styles.

use std::fmt::Write as _;

use vte::{Params, Parser, Perform};

/// Convert ANSI-styled text to a standalone HTML document.
///
/// SGR attributes (bold, dim, italic, underline, 16/256/truecolor foreground
/// and background) become inline-styled `<span>` elements. Spans are never
/// nested: the open span is closed before a new style starts. Every other
/// escape sequence is dropped.
pub fn to_html(text: &str, title: &str) -> String {
    let mut sink = HtmlSink {
        body: String::with_capacity(text.len() * 2),
        style: Style::default(),
        span_open: false,
    };
    Parser::new().advance(&mut sink, text.as_bytes());
    sink.close_span();

    let mut html = String::with_capacity(sink.body.len() + 512);
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(html, "<title>{}</title>", escape(title));
    html.push_str(
        "<style>\nbody { background-color: #000000; color: #aaaaaa; }\n\
         pre.ansi { font-family: monospace; white-space: pre-wrap; }\n</style>\n",
    );
    html.push_str("</head>\n<body>\n<pre class=\"ansi\">\n");
    html.push_str(&sink.body);
    html.push_str("</pre>\n</body>\n</html>\n");
    html
}

/// Escape text for inclusion in HTML element content or attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        push_escaped(&mut out, c);
    }
    out
}

fn push_escaped(out: &mut String, c: char) {
    match c {
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        '&' => out.push_str("&amp;"),
        '"' => out.push_str("&quot;"),
        '\'' => out.push_str("&#39;"),
        c => out.push(c),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Indexed(u8),
    Rgb(u8, u8, u8),
}

impl Color {
    fn css(self) -> String {
        let (r, g, b) = match self {
            Color::Indexed(i) => palette(i),
            Color::Rgb(r, g, b) => (r, g, b),
        };
        format!("#{r:02x}{g:02x}{b:02x}")
    }
}

/// xterm 256-color palette.
fn palette(index: u8) -> (u8, u8, u8) {
    const BASE: [(u8, u8, u8); 16] = [
        (0x00, 0x00, 0x00),
        (0xaa, 0x00, 0x00),
        (0x00, 0xaa, 0x00),
        (0xaa, 0x55, 0x00),
        (0x00, 0x00, 0xaa),
        (0xaa, 0x00, 0xaa),
        (0x00, 0xaa, 0xaa),
        (0xaa, 0xaa, 0xaa),
        (0x55, 0x55, 0x55),
        (0xff, 0x55, 0x55),
        (0x55, 0xff, 0x55),
        (0xff, 0xff, 0x55),
        (0x55, 0x55, 0xff),
        (0xff, 0x55, 0xff),
        (0x55, 0xff, 0xff),
        (0xff, 0xff, 0xff),
    ];
    match index {
        0..=15 => BASE[index as usize],
        16..=231 => {
            let i = index - 16;
            let level = |v: u8| if v == 0 { 0 } else { 55 + v * 40 };
            (level(i / 36), level((i / 6) % 6), level(i % 6))
        }
        _ => {
            let v = 8 + (index - 232) * 10;
            (v, v, v)
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Style {
    bold: bool,
    dim: bool,
    italic: bool,
    underline: bool,
    fg: Option<Color>,
    bg: Option<Color>,
}

impl Style {
    fn is_plain(&self) -> bool {
        *self == Style::default()
    }

    fn css(&self) -> String {
        let mut rules = Vec::new();
        if let Some(fg) = self.fg {
            rules.push(format!("color: {}", fg.css()));
        }
        if let Some(bg) = self.bg {
            rules.push(format!("background-color: {}", bg.css()));
        }
        if self.bold {
            rules.push("font-weight: bold".to_string());
        }
        if self.dim {
            rules.push("opacity: 0.7".to_string());
        }
        if self.italic {
            rules.push("font-style: italic".to_string());
        }
        if self.underline {
            rules.push("text-decoration: underline".to_string());
        }
        rules.join("; ")
    }

    /// Apply one SGR sequence.
    fn apply_sgr(&mut self, params: &[Vec<u16>]) {
        if params.is_empty() {
            *self = Style::default();
            return;
        }

        let mut i = 0;
        while i < params.len() {
            let group = &params[i];
            let code = group.first().copied().unwrap_or(0);
            match code {
                0 => *self = Style::default(),
                1 => self.bold = true,
                2 => self.dim = true,
                3 => self.italic = true,
                4 => self.underline = true,
                22 => {
                    self.bold = false;
                    self.dim = false;
                }
                23 => self.italic = false,
                24 => self.underline = false,
                30..=37 => self.fg = Some(Color::Indexed((code - 30) as u8)),
                39 => self.fg = None,
                40..=47 => self.bg = Some(Color::Indexed((code - 40) as u8)),
                49 => self.bg = None,
                90..=97 => self.fg = Some(Color::Indexed((code - 90 + 8) as u8)),
                100..=107 => self.bg = Some(Color::Indexed((code - 100 + 8) as u8)),
                38 | 48 => {
                    // Either colon form (38:5:n in one group) or semicolon
                    // form (38;5;n spread over following groups).
                    let (color, consumed) = if group.len() > 1 {
                        (extended_color(&group[1..]), 0)
                    } else {
                        let rest: Vec<u16> =
                            params[i + 1..].iter().filter_map(|g| g.first().copied()).collect();
                        let color = extended_color(&rest);
                        let consumed = match rest.first() {
                            Some(5) => 2,
                            Some(2) => 4,
                            _ => 0,
                        };
                        (color, consumed)
                    };
                    if code == 38 {
                        self.fg = color;
                    } else {
                        self.bg = color;
                    }
                    i += consumed;
                }
                _ => {}
            }
            i += 1;
        }
    }
}

fn extended_color(args: &[u16]) -> Option<Color> {
    match args {
        [5, index, ..] => Some(Color::Indexed((*index).min(255) as u8)),
        [2, r, g, b, ..] => Some(Color::Rgb(
            (*r).min(255) as u8,
            (*g).min(255) as u8,
            (*b).min(255) as u8,
        )),
        _ => None,
    }
}

struct HtmlSink {
    body: String,
    style: Style,
    span_open: bool,
}

impl HtmlSink {
    fn close_span(&mut self) {
        if self.span_open {
            self.body.push_str("</span>");
            self.span_open = false;
        }
    }

    fn open_span(&mut self) {
        if !self.style.is_plain() {
            let _ = write!(self.body, "<span style=\"{}\">", self.style.css());
            self.span_open = true;
        }
    }
}

impl Perform for HtmlSink {
    fn print(&mut self, c: char) {
        push_escaped(&mut self.body, c);
    }

    fn execute(&mut self, byte: u8) {
        match byte {
            b'\n' => self.body.push('\n'),
            b'\t' => self.body.push('\t'),
            _ => {}
        }
    }

    fn csi_dispatch(&mut self, params: &Params, _intermediates: &[u8], ignore: bool, action: char) {
        if ignore || action != 'm' {
            return;
        }
        let groups: Vec<Vec<u16>> = params.iter().map(<[u16]>::to_vec).collect();
        let previous = self.style;
        self.style.apply_sgr(&groups);
        if self.style != previous {
            self.close_span();
            self.open_span();
        }
    }
}
