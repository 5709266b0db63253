//! Delta Smoothing Window
//!
//! Fixed-capacity ring buffer of recent frame deltas. The scroll engine moves
//! by the mean of the window instead of the raw delta, which damps jitter
//! from uneven call spacing.
//!
//! Memory is fixed at `capacity * size_of::<f64>()`.

/// Largest window accepted; longer windows only add lag.
pub const MAX_WINDOW: usize = 64;

/// Ring buffer of frame deltas (seconds)
#[derive(Debug, Clone)]
pub struct DeltaWindow {
    /// Sample storage
    samples: Vec<f64>,
    /// Next slot to overwrite
    write_pos: usize,
    /// Number of valid samples
    len: usize,
    /// Running sum of valid samples
    sum: f64,
}

impl DeltaWindow {
    /// Create a window holding the last `capacity` samples.
    ///
    /// A capacity of 0 or 1 disables smoothing: [`push`](Self::push) returns
    /// its input unchanged.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_WINDOW);
        DeltaWindow {
            samples: vec![0.0; capacity],
            write_pos: 0,
            len: 0,
            sum: 0.0,
        }
    }

    /// Record a sample and return the mean of the window including it
    pub fn push(&mut self, delta: f64) -> f64 {
        let capacity = self.samples.len();
        if capacity == 1 {
            self.samples[0] = delta;
            self.len = 1;
            self.sum = delta;
            return delta;
        }

        if self.len == capacity {
            self.sum -= self.samples[self.write_pos];
        } else {
            self.len += 1;
        }
        self.samples[self.write_pos] = delta;
        self.sum += delta;
        self.write_pos = (self.write_pos + 1) % capacity;

        // Recompute occasionally to stop floating point drift in the running sum
        if self.write_pos == 0 {
            self.sum = self.samples[..self.len].iter().sum();
        }

        self.mean()
    }

    /// Mean of the current samples (0 when empty)
    pub fn mean(&self) -> f64 {
        if self.len == 0 {
            0.0
        } else {
            self.sum / self.len as f64
        }
    }

    /// Number of samples currently held
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the window holds no samples
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum number of samples held
    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    /// Drop all samples
    pub fn clear(&mut self) {
        self.samples.iter_mut().for_each(|s| *s = 0.0);
        self.write_pos = 0;
        self.len = 0;
        self.sum = 0.0;
    }
}

impl Default for DeltaWindow {
    fn default() -> Self {
        Self::new(1)
    }
}
