//! Deterministic file names for staged assets
//!
//! Every staged image is renamed `<color letter><counter>.<ext>`, e.g. `R001.png`.
//! Counters live in a [`ColorCounterTable`] owned by one staging batch.

use crate::color::ColorCode;

/// Next free counter for each color code in one batch
///
/// All seven counters start at 1 and only ever increase, so a table never
/// hands out the same name twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorCounterTable {
    next: [u32; 7],
}

impl Default for ColorCounterTable {
    fn default() -> Self {
        Self { next: [1; 7] }
    }
}

impl ColorCounterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter the next asset of this color will receive
    pub fn peek(&self, color: ColorCode) -> u32 {
        self.next[color.index()]
    }

    /// Assign the next name for `color` and advance its counter
    pub fn allocate(&mut self, color: ColorCode, extension: &str) -> String {
        let slot = &mut self.next[color.index()];
        let name = format!("{}{:03}.{}", color.letter(), *slot, extension);
        *slot += 1;
        name
    }
}

/// Free-function form of [`ColorCounterTable::allocate`]
pub fn allocate(color: ColorCode, table: &mut ColorCounterTable, extension: &str) -> String {
    table.allocate(color, extension)
}

/// Everything after the last `.` of a file name
///
/// Case is preserved and nothing is validated. A name without a dot is
/// returned whole.
pub fn file_extension(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(idx) => &file_name[idx + 1..],
        None => file_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_counters_start_at_one() {
        let table = ColorCounterTable::new();
        for color in ColorCode::ALL {
            assert_eq!(table.peek(color), 1);
        }
    }

    #[test]
    fn test_same_color_never_repeats() {
        let mut table = ColorCounterTable::new();
        let names: Vec<String> = (0..250)
            .map(|_| table.allocate(ColorCode::Red, "png"))
            .collect();

        assert_eq!(names[0], "R001.png");
        assert_eq!(names[249], "R250.png");
        let unique: HashSet<&String> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn test_colors_count_independently() {
        let mut table = ColorCounterTable::new();
        assert_eq!(allocate(ColorCode::Red, &mut table, "png"), "R001.png");
        assert_eq!(allocate(ColorCode::Green, &mut table, "jpg"), "G001.jpg");
        assert_eq!(allocate(ColorCode::Red, &mut table, "png"), "R002.png");
        assert_eq!(allocate(ColorCode::Black, &mut table, "gif"), "K001.gif");
        assert_eq!(table.peek(ColorCode::Red), 3);
        assert_eq!(table.peek(ColorCode::Other), 1);
    }

    #[test]
    fn test_padding_is_a_minimum_width() {
        let mut table = ColorCounterTable::new();
        for _ in 0..999 {
            table.allocate(ColorCode::Blue, "png");
        }
        assert_eq!(table.allocate(ColorCode::Blue, "png"), "B1000.png");
    }

    #[test]
    fn test_extension_is_verbatim() {
        assert_eq!(file_extension("sign.PNG"), "PNG");
        assert_eq!(file_extension("archive.tar.gz"), "gz");
        assert_eq!(file_extension("trailing."), "");
        assert_eq!(file_extension("README"), "README");
    }
}
