//! Iteration over collection entries.

use std::borrow::Cow;
use std::iter::FusedIterator;

use memblob_block::ReadView;

use crate::collection::PackedStringCollection;
use crate::framing::OffsetIndex;

/// Iterator over a collection's entries as `String`s.
///
/// Unpaired surrogates become U+FFFD; use
/// [`PackedStringCollection::get`] for strict decoding.
pub struct Iter<'a> {
    collection: &'a PackedStringCollection,
    layout: Cow<'a, OffsetIndex>,
    next: usize,
}

impl Iterator for Iter<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let span = self.layout.get(self.next)?;
        self.next += 1;
        let units = self.collection.block.to_chars(span.start, span.units);
        Some(String::from_utf16_lossy(&units))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.layout.len() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl FusedIterator for Iter<'_> {}

impl PackedStringCollection {
    /// Iterate over every entry in order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            collection: self,
            layout: self.layout().unwrap_or_default(),
            next: 0,
        }
    }
}

impl<'a> IntoIterator for &'a PackedStringCollection {
    type Item = String;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}
