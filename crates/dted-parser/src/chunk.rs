//! Decoded chunk of posts.

/// Rectangular block of decoded posts from one cell, row 0 northern-most.
///
/// A chunk spans `chunk_size` samples plus one sample of overlap into the
/// next chunk east and south, so interpolation between adjacent chunks
/// never needs a neighbor. Edge chunks are smaller.
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    pub chunk_x: usize,
    pub chunk_y: usize,
    pub width: usize,
    pub height: usize,
    /// Row-major meters, NaN for void or implausible posts.
    pub values: Vec<f32>,
}

impl Chunk {
    /// Resize for a new load, reallocating only when capacity is exceeded.
    pub fn reset(&mut self, chunk_x: usize, chunk_y: usize, width: usize, height: usize) {
        self.chunk_x = chunk_x;
        self.chunk_y = chunk_y;
        self.width = width;
        self.height = height;
        self.values.clear();
        self.values.resize(width * height, f32::NAN);
    }

    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.values[y * self.width + x]
    }

    /// Size of the decoded posts in bytes.
    pub fn memory_size(&self) -> usize {
        self.values.len() * std::mem::size_of::<f32>()
    }
}
