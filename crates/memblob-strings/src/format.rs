//! Text rendering of a collection.

use std::fmt;

use crate::collection::PackedStringCollection;

/// Options for [`PackedStringCollection::format`].
///
/// Separators go between entries, quotes around each entry and CRLF after
/// each entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FormatOptions {
    /// Wrap each entry in double quotes.
    pub quoted: bool,
    /// Put a comma between entries.
    pub commas: bool,
    /// Put a space between entries (after the comma, if any).
    pub spaced: bool,
    /// End each entry with CR LF.
    pub crlf: bool,
}

impl FormatOptions {
    /// Plain concatenation.
    pub const NONE: FormatOptions = FormatOptions {
        quoted: false,
        commas: false,
        spaced: false,
        crlf: false,
    };

    /// `"a", "b", "c"`.
    pub const QUOTED_LIST: FormatOptions = FormatOptions {
        quoted: true,
        commas: true,
        spaced: true,
        crlf: false,
    };

    /// One entry per line.
    pub const LINES: FormatOptions = FormatOptions {
        quoted: false,
        commas: false,
        spaced: false,
        crlf: true,
    };
}

impl PackedStringCollection {
    /// Render every entry into one string. Unpaired surrogates become
    /// U+FFFD.
    pub fn format(&self, options: FormatOptions) -> String {
        let mut out = String::with_capacity(self.byte_len() / 2 + self.count() * 4);
        for (i, entry) in self.iter().enumerate() {
            if i > 0 {
                if options.commas {
                    out.push(',');
                }
                if options.spaced {
                    out.push(' ');
                }
            }
            if options.quoted {
                out.push('"');
            }
            out.push_str(&entry);
            if options.quoted {
                out.push('"');
            }
            if options.crlf {
                out.push_str("\r\n");
            }
        }
        out
    }
}

impl fmt::Display for PackedStringCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(FormatOptions::NONE))
    }
}
