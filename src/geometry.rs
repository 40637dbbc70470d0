/// Integer size measured in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Absolute horizontal distance between two widths.
    pub fn width_delta(&self, other: Size) -> u32 {
        self.width.abs_diff(other.width)
    }
}

/// Width available to each of `columns` columns separated by `gap` pixels.
pub fn column_width(container_width: u32, columns: usize, gap: u32) -> u32 {
    if columns == 0 {
        return container_width;
    }
    let gaps = gap.saturating_mul(columns.saturating_sub(1) as u32);
    container_width.saturating_sub(gaps) / columns as u32
}
