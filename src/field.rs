use crate::capability::Filtering;
use glam::Vec2;

#[cfg(not(target_arch = "wasm32"))]
use rayon::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSize {
    pub width: usize,
    pub height: usize,
}

impl GridSize {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    pub fn cells(&self) -> usize {
        self.width * self.height
    }
}

/// Dense grid of samples with up to 4 channels per cell.
///
/// Row 0 is the bottom of the surface, so cell `(x, y)` sits at normalized
/// coordinate `((x + 0.5) / width, (y + 0.5) / height)`. Every read clamps to
/// the edge; nothing wraps.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub data: Vec<f32>,
}

impl Field {
    pub fn new(size: GridSize, channels: usize) -> Self {
        assert!((1..=4).contains(&channels), "fields hold 1 to 4 channels");
        assert!(size.width > 0 && size.height > 0, "fields cannot be empty");
        Self {
            width: size.width,
            height: size.height,
            channels,
            data: vec![0.0; size.cells() * channels],
        }
    }

    pub fn size(&self) -> GridSize {
        GridSize::new(self.width, self.height)
    }

    pub fn texel_size(&self) -> Vec2 {
        Vec2::new(1.0 / self.width as f32, 1.0 / self.height as f32)
    }

    pub fn cell_uv(&self, x: usize, y: usize) -> Vec2 {
        Vec2::new(
            (x as f32 + 0.5) / self.width as f32,
            (y as f32 + 0.5) / self.height as f32,
        )
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, channel: usize) -> f32 {
        self.data[(y * self.width + x) * self.channels + channel]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, channel: usize, value: f32) {
        self.data[(y * self.width + x) * self.channels + channel] = value;
    }

    /// Neighbor read with clamp-to-edge addressing.
    #[inline]
    pub fn fetch(&self, x: isize, y: isize, channel: usize) -> f32 {
        let x = x.clamp(0, self.width as isize - 1) as usize;
        let y = y.clamp(0, self.height as isize - 1) as usize;
        self.get(x, y, channel)
    }

    #[inline]
    pub fn texel(&self, x: usize, y: usize) -> [f32; 4] {
        let base = (y * self.width + x) * self.channels;
        let mut out = [0.0; 4];
        out[..self.channels].copy_from_slice(&self.data[base..base + self.channels]);
        out
    }

    /// Samples at a normalized coordinate. The coordinate is clamped to
    /// `[0, 1]` before lookup.
    pub fn sample(&self, uv: Vec2, filtering: Filtering) -> [f32; 4] {
        let u = uv.x.clamp(0.0, 1.0);
        let v = uv.y.clamp(0.0, 1.0);

        match filtering {
            Filtering::Nearest => {
                let x = ((u * self.width as f32) as usize).min(self.width - 1);
                let y = ((v * self.height as f32) as usize).min(self.height - 1);
                self.texel(x, y)
            }
            Filtering::Linear => {
                let fx = (u * self.width as f32 - 0.5).clamp(0.0, (self.width - 1) as f32);
                let fy = (v * self.height as f32 - 0.5).clamp(0.0, (self.height - 1) as f32);

                let x0 = fx.floor() as usize;
                let y0 = fy.floor() as usize;
                let x1 = (x0 + 1).min(self.width - 1);
                let y1 = (y0 + 1).min(self.height - 1);
                let sx = fx - x0 as f32;
                let sy = fy - y0 as f32;

                let t00 = self.texel(x0, y0);
                let t10 = self.texel(x1, y0);
                let t01 = self.texel(x0, y1);
                let t11 = self.texel(x1, y1);

                let mut out = [0.0; 4];
                for c in 0..self.channels {
                    out[c] = (1.0 - sx) * (1.0 - sy) * t00[c]
                        + sx * (1.0 - sy) * t10[c]
                        + (1.0 - sx) * sy * t01[c]
                        + sx * sy * t11[c];
                }
                out
            }
        }
    }

    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }

    pub fn channel_sum(&self, channel: usize) -> f32 {
        self.data
            .iter()
            .skip(channel)
            .step_by(self.channels)
            .sum()
    }

    /// Runs `f(y, row)` over every row.
    pub fn for_each_row_mut<F>(&mut self, f: F)
    where
        F: Fn(usize, &mut [f32]) + Send + Sync,
    {
        let stride = self.width * self.channels;
        for_each_row(&mut self.data, stride, f);
    }
}

/// Splits `data` into rows of `stride` and calls `f(y, row)` on each, rows in
/// parallel off wasm.
pub fn for_each_row<T, F>(data: &mut [T], stride: usize, f: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Send + Sync,
{
    #[cfg(not(target_arch = "wasm32"))]
    data.par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| f(y, row));

    #[cfg(target_arch = "wasm32")]
    data.chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| f(y, row));
}

/// Two same-shaped fields: passes read `read()` and write `write`, then
/// `swap()` makes the result current.
#[derive(Debug, Clone)]
pub struct DoubleField {
    read: Field,
    write: Field,
}

impl DoubleField {
    pub fn new(size: GridSize, channels: usize) -> Self {
        Self {
            read: Field::new(size, channels),
            write: Field::new(size, channels),
        }
    }

    pub fn read(&self) -> &Field {
        &self.read
    }

    /// Mutable access to the current state, for seeding and tests.
    pub fn read_mut(&mut self) -> &mut Field {
        &mut self.read
    }

    /// The two halves of a pass, borrowed disjointly.
    pub fn read_write(&mut self) -> (&Field, &mut Field) {
        (&self.read, &mut self.write)
    }

    pub fn swap(&mut self) {
        std::mem::swap(&mut self.read, &mut self.write);
    }

    pub fn size(&self) -> GridSize {
        self.read.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_clamps_to_edge() {
        let mut field = Field::new(GridSize::new(3, 2), 1);
        field.set(0, 0, 0, 1.0);
        field.set(2, 1, 0, 5.0);
        assert_eq!(field.fetch(-4, -1, 0), 1.0);
        assert_eq!(field.fetch(10, 7, 0), 5.0);
    }

    #[test]
    fn test_linear_sample_at_cell_center_is_exact() {
        let mut field = Field::new(GridSize::new(4, 4), 2);
        field.set(2, 1, 0, 3.0);
        field.set(2, 1, 1, -2.0);
        let uv = field.cell_uv(2, 1);
        let s = field.sample(uv, Filtering::Linear);
        assert!((s[0] - 3.0).abs() < 1e-6);
        assert!((s[1] + 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_linear_sample_interpolates_between_cells() {
        let mut field = Field::new(GridSize::new(2, 1), 1);
        field.set(0, 0, 0, 0.0);
        field.set(1, 0, 0, 4.0);
        let s = field.sample(Vec2::new(0.5, 0.5), Filtering::Linear);
        assert!((s[0] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_sample_outside_unit_square_reads_nearest_edge() {
        let mut field = Field::new(GridSize::new(4, 1), 1);
        for x in 0..4 {
            field.set(x, 0, 0, x as f32 + 1.0);
        }
        for filtering in [Filtering::Linear, Filtering::Nearest] {
            assert_eq!(field.sample(Vec2::new(-3.0, 0.5), filtering)[0], 1.0);
            assert_eq!(field.sample(Vec2::new(7.0, 0.5), filtering)[0], 4.0);
        }
    }

    #[test]
    fn test_swap_exchanges_buffers() {
        let mut double = DoubleField::new(GridSize::new(2, 2), 1);
        {
            let (read, write) = double.read_write();
            assert_eq!(read.get(0, 0, 0), 0.0);
            write.set(0, 0, 0, 7.0);
        }
        double.swap();
        assert_eq!(double.read().get(0, 0, 0), 7.0);
    }

    #[test]
    fn test_channel_sum() {
        let mut field = Field::new(GridSize::new(2, 1), 4);
        field.set(0, 0, 3, 0.25);
        field.set(1, 0, 3, 0.5);
        field.set(1, 0, 0, 9.0);
        assert_eq!(field.channel_sum(3), 0.75);
    }

    #[test]
    fn test_for_each_row_mut_visits_rows_in_order() {
        let mut field = Field::new(GridSize::new(3, 4), 1);
        field.for_each_row_mut(|y, row| row.fill(y as f32));
        assert_eq!(field.get(2, 3, 0), 3.0);
        assert_eq!(field.get(0, 0, 0), 0.0);
    }
}
