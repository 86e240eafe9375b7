//! Key identities and the fixed key index layout.

use std::fmt;
use std::ops::Range;

/// Number of pseudo-keys a rotary encoder occupies
pub const ROTARY_DIRECTIONS: usize = 2;

/// Stable identity of one logical input.
///
/// Keys are allocated by [`KeyLayout`] and never change for the lifetime of
/// the [`crate::InputSubsystem`] that owns them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(u16);

impl Key {
    /// Create a key from its raw index
    pub const fn new(index: u16) -> Self {
        Key(index)
    }

    /// Index of the key in the layout
    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key{}", self.0)
    }
}

/// Kind of hardware a key index belongs to, in partition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Matrix,
    Gpio,
    Rotary,
    Joystick,
}

impl Source {
    /// All sources in the order they are laid out and polled
    pub const ALL: [Source; 4] = [
        Source::Matrix,
        Source::Gpio,
        Source::Rotary,
        Source::Joystick,
    ];
}

/// Rotary encoder pseudo-keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotaryDirection {
    Decrement = 0,
    Increment = 1,
}

/// Linear allocation of key indices over the device topology.
///
/// Matrix cells come first (row-major), then GPIO buttons, then the two rotary
/// pseudo-keys when an encoder is present, then joystick channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyLayout {
    matrix_rows: usize,
    matrix_cols: usize,
    gpio: usize,
    rotary: usize,
    joystick: usize,
}

impl KeyLayout {
    /// Compute the layout for the given topology
    pub fn new(
        matrix_rows: usize,
        matrix_cols: usize,
        gpio: usize,
        encoder: bool,
        joystick: usize,
    ) -> Self {
        Self {
            matrix_rows,
            matrix_cols,
            gpio,
            rotary: if encoder { ROTARY_DIRECTIONS } else { 0 },
            joystick,
        }
    }

    /// Total number of keys
    pub fn total(&self) -> usize {
        self.matrix_rows * self.matrix_cols + self.gpio + self.rotary + self.joystick
    }

    /// Number of keys allocated to `source`
    pub fn len(&self, source: Source) -> usize {
        match source {
            Source::Matrix => self.matrix_rows * self.matrix_cols,
            Source::Gpio => self.gpio,
            Source::Rotary => self.rotary,
            Source::Joystick => self.joystick,
        }
    }

    /// Whether the layout holds no key at all
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Index range allocated to `source`
    pub fn range(&self, source: Source) -> Range<usize> {
        let start = Source::ALL
            .iter()
            .take_while(|s| **s != source)
            .map(|s| self.len(*s))
            .sum();
        start..start + self.len(source)
    }

    /// Matrix dimensions as `(rows, cols)`
    pub fn matrix_size(&self) -> (usize, usize) {
        (self.matrix_rows, self.matrix_cols)
    }

    pub fn matrix_key(&self, row: usize, col: usize) -> Option<Key> {
        if row >= self.matrix_rows || col >= self.matrix_cols {
            return None;
        }
        self.key_at(Source::Matrix, row * self.matrix_cols + col)
    }

    pub fn gpio_key(&self, button: usize) -> Option<Key> {
        self.key_at(Source::Gpio, button)
    }

    pub fn rotary_key(&self, direction: RotaryDirection) -> Option<Key> {
        self.key_at(Source::Rotary, direction as usize)
    }

    pub fn joystick_key(&self, channel: usize) -> Option<Key> {
        self.key_at(Source::Joystick, channel)
    }

    /// Source partition `key` belongs to
    pub fn source_of(&self, key: Key) -> Option<Source> {
        Source::ALL
            .into_iter()
            .find(|s| self.range(*s).contains(&key.index()))
    }

    /// Every key of the layout in index order
    pub fn keys(&self) -> impl Iterator<Item = Key> {
        (0..self.total()).filter_map(|i| u16::try_from(i).ok().map(Key::new))
    }

    fn key_at(&self, source: Source, offset: usize) -> Option<Key> {
        let range = self.range(source);
        let index = range.start + offset;
        if !range.contains(&index) {
            return None;
        }
        u16::try_from(index).ok().map(Key::new)
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_should_partition_sources_in_order() {
        let layout = KeyLayout::new(3, 2, 4, true, 2);

        assert_eq!(layout.total(), 14);
        assert_eq!(layout.range(Source::Matrix), 0..6);
        assert_eq!(layout.range(Source::Gpio), 6..10);
        assert_eq!(layout.range(Source::Rotary), 10..12);
        assert_eq!(layout.range(Source::Joystick), 12..14);
    }

    #[test]
    fn test_should_not_overlap_ranges() {
        let layout = KeyLayout::new(4, 4, 6, true, 3);
        for key in layout.keys() {
            let owners = Source::ALL
                .iter()
                .filter(|s| layout.range(**s).contains(&key.index()))
                .count();
            assert_eq!(owners, 1, "{key} has {owners} owners");
        }
    }

    #[test]
    fn test_should_lay_out_matrix_row_major() {
        let layout = KeyLayout::new(2, 3, 0, false, 0);

        assert_eq!(layout.matrix_key(0, 0), Some(Key::new(0)));
        assert_eq!(layout.matrix_key(0, 2), Some(Key::new(2)));
        assert_eq!(layout.matrix_key(1, 0), Some(Key::new(3)));
        assert_eq!(layout.matrix_key(1, 2), Some(Key::new(5)));
        assert_eq!(layout.matrix_key(2, 0), None);
        assert_eq!(layout.matrix_key(0, 3), None);
    }

    #[test]
    fn test_should_skip_rotary_without_encoder() {
        let layout = KeyLayout::new(0, 0, 6, false, 1);

        assert_eq!(layout.total(), 7);
        assert!(layout.range(Source::Rotary).is_empty());
        assert_eq!(layout.rotary_key(RotaryDirection::Increment), None);
        assert_eq!(layout.joystick_key(0), Some(Key::new(6)));
    }

    #[test]
    fn test_should_resolve_source_of_key() {
        let layout = KeyLayout::new(1, 1, 1, true, 1);

        assert_eq!(layout.source_of(Key::new(0)), Some(Source::Matrix));
        assert_eq!(layout.source_of(Key::new(1)), Some(Source::Gpio));
        assert_eq!(
            layout.rotary_key(RotaryDirection::Decrement),
            Some(Key::new(2))
        );
        assert_eq!(layout.source_of(Key::new(3)), Some(Source::Rotary));
        assert_eq!(layout.source_of(Key::new(4)), Some(Source::Joystick));
        assert_eq!(layout.source_of(Key::new(5)), None);
    }

    #[test]
    fn test_should_display_key() {
        assert_eq!(Key::new(7).to_string(), "Key7");
    }
}
