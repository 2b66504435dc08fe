//! Matrix geometry: key positions, diode orientation and the position to logical index decoder.

/// A board pin number as configured for the matrix and the peripherals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinId(pub u8);

/// Which way the switch diodes point. The anode side is the line that gets driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DiodeOrientation {
    /// Columns are driven high and rows are sampled.
    ColumnToRow,
    /// Rows are driven high and columns are sampled.
    RowToColumn,
}

impl DiodeOrientation {
    pub const fn columns_driven(self) -> bool {
        matches!(self, Self::ColumnToRow)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyPosition {
    pub row: u8,
    pub col: u8,
}

impl KeyPosition {
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }
}

/// The logical key index of `position`. Orientation only decides which lines are strobed so
/// both wirings share the row-major index.
pub const fn logical_index(position: KeyPosition, orientation: DiodeOrientation, cols: usize) -> usize {
    let _ = orientation;
    position.row as usize * cols + position.col as usize
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Decoder {
    rows: usize,
    cols: usize,
    orientation: DiodeOrientation,
}

impl Decoder {
    pub const fn new(rows: usize, cols: usize, orientation: DiodeOrientation) -> Self {
        Self {
            rows,
            cols,
            orientation,
        }
    }

    pub const fn orientation(&self) -> DiodeOrientation {
        self.orientation
    }

    pub const fn rows(&self) -> usize {
        self.rows
    }

    pub const fn cols(&self) -> usize {
        self.cols
    }

    pub const fn key_count(&self) -> usize {
        self.rows * self.cols
    }

    /// `None` when `position` lies outside the matrix.
    pub fn logical_index(&self, position: KeyPosition) -> Option<usize> {
        if (position.row as usize) < self.rows && (position.col as usize) < self.cols {
            Some(logical_index(position, self.orientation, self.cols))
        } else {
            None
        }
    }

    pub fn position(&self, index: usize) -> Option<KeyPosition> {
        if self.cols == 0 || index >= self.key_count() {
            return None;
        }
        Some(KeyPosition::new(
            (index / self.cols) as u8,
            (index % self.cols) as u8,
        ))
    }

    /// The key position of the switch between strobe line `output` and sense line `input`.
    pub fn position_of(&self, input: usize, output: usize) -> KeyPosition {
        if self.orientation.columns_driven() {
            KeyPosition::new(input as u8, output as u8)
        } else {
            KeyPosition::new(output as u8, input as u8)
        }
    }
}

#[cfg(test)]
#[path = "matrix_test.rs"]
mod test;
