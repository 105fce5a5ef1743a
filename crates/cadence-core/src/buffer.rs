//! Fixed-capacity sample containers.
//!
//! Every buffer in the pipeline is one of three kinds:
//!
//! - [`SampleBuffer`] - real-valued `f32` samples (time-domain blocks, detector results)
//! - [`ComplexBuffer`] - polar spectrum frames (magnitude/phase pairs)
//! - [`LongBuffer`] - `f64` coefficients (filter taps)
//!
//! All three share the same lifecycle: capacity is fixed at construction,
//! contents start at zero, and [`release`](SampleBuffer::release) frees the
//! storage exactly once. A released buffer reports `size() == 0` and exposes
//! empty slices, so code that keeps using it degrades to a no-op instead of
//! indexing freed memory.
//!
//! Snapshots taken with `to_vec()` are independent copies. Buffers are reused
//! in place across pipeline steps, so anything that must outlive the current
//! step has to be copied out.

/// Real-valued sample buffer with fixed capacity.
///
/// # Example
///
/// ```rust
/// use cadence_core::SampleBuffer;
///
/// let mut buf = SampleBuffer::new(4);
/// buf.as_mut_slice()[0] = 0.5;
///
/// let snapshot = buf.to_vec();
/// buf.fill(1.0);
/// assert_eq!(snapshot, vec![0.5, 0.0, 0.0, 0.0]);
///
/// buf.release();
/// buf.release();
/// assert_eq!(buf.size(), 0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    data: Option<Vec<f32>>,
}

impl SampleBuffer {
    /// Creates a buffer of `capacity` zeroed samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: Some(vec![0.0; capacity]),
        }
    }

    /// Creates a buffer holding a copy of `samples`.
    pub fn from_slice(samples: &[f32]) -> Self {
        Self {
            data: Some(samples.to_vec()),
        }
    }

    /// Capacity in samples, or 0 once released.
    #[inline]
    pub fn size(&self) -> usize {
        self.data.as_ref().map_or(0, Vec::len)
    }

    /// Whether [`release`](Self::release) has been called.
    #[inline]
    pub fn is_released(&self) -> bool {
        self.data.is_none()
    }

    /// Returns an independent copy of the current contents.
    pub fn to_vec(&self) -> Vec<f32> {
        self.as_slice().to_vec()
    }

    /// Borrowed view of the samples (empty once released).
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        self.data.as_deref().unwrap_or(&[])
    }

    /// Mutable view of the samples (empty once released).
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        self.data.as_deref_mut().unwrap_or(&mut [])
    }

    /// Reads one sample; `None` when out of range or released.
    #[inline]
    pub fn get(&self, index: usize) -> Option<f32> {
        self.as_slice().get(index).copied()
    }

    /// Writes one sample. Returns `false` when out of range or released.
    #[inline]
    pub fn set(&mut self, index: usize, value: f32) -> bool {
        match self.as_mut_slice().get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Sets every sample to `value`.
    pub fn fill(&mut self, value: f32) {
        self.as_mut_slice().fill(value);
    }

    /// Sets every sample to zero.
    pub fn clear(&mut self) {
        self.fill(0.0);
    }

    /// Copies as many samples as fit from `src`, returning the count copied.
    pub fn copy_from(&mut self, src: &[f32]) -> usize {
        let dst = self.as_mut_slice();
        let n = dst.len().min(src.len());
        dst[..n].copy_from_slice(&src[..n]);
        n
    }

    /// Frees the storage. Safe to call more than once.
    pub fn release(&mut self) {
        self.data = None;
    }
}

/// Polar spectrum frame: `capacity` magnitude/phase pairs.
///
/// A phase vocoder produces one of these per hop (a "grain"); spectral
/// stages such as the filter bank consume them.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexBuffer {
    data: Option<Polar>,
}

#[derive(Debug, Clone, PartialEq)]
struct Polar {
    norm: Vec<f32>,
    phase: Vec<f32>,
}

impl ComplexBuffer {
    /// Creates a frame of `capacity` zero-magnitude, zero-phase bins.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: Some(Polar {
                norm: vec![0.0; capacity],
                phase: vec![0.0; capacity],
            }),
        }
    }

    /// Number of bins, or 0 once released.
    #[inline]
    pub fn size(&self) -> usize {
        self.data.as_ref().map_or(0, |p| p.norm.len())
    }

    /// Whether [`release`](Self::release) has been called.
    #[inline]
    pub fn is_released(&self) -> bool {
        self.data.is_none()
    }

    /// Independent copy of the magnitudes.
    pub fn magnitudes(&self) -> Vec<f32> {
        self.magnitudes_slice().to_vec()
    }

    /// Independent copy of the phases (radians).
    pub fn phases(&self) -> Vec<f32> {
        self.phases_slice().to_vec()
    }

    /// Borrowed magnitudes (empty once released).
    #[inline]
    pub fn magnitudes_slice(&self) -> &[f32] {
        match self.data.as_ref() {
            Some(p) => p.norm.as_slice(),
            None => &[],
        }
    }

    /// Borrowed phases (empty once released).
    #[inline]
    pub fn phases_slice(&self) -> &[f32] {
        match self.data.as_ref() {
            Some(p) => p.phase.as_slice(),
            None => &[],
        }
    }

    /// Mutable magnitudes (empty once released).
    #[inline]
    pub fn magnitudes_mut(&mut self) -> &mut [f32] {
        match self.data.as_mut() {
            Some(p) => p.norm.as_mut_slice(),
            None => &mut [],
        }
    }

    /// Mutable phases (empty once released).
    #[inline]
    pub fn phases_mut(&mut self) -> &mut [f32] {
        match self.data.as_mut() {
            Some(p) => p.phase.as_mut_slice(),
            None => &mut [],
        }
    }

    /// Mutable magnitudes and phases at once.
    pub fn split_mut(&mut self) -> (&mut [f32], &mut [f32]) {
        match self.data.as_mut() {
            Some(p) => (p.norm.as_mut_slice(), p.phase.as_mut_slice()),
            None => (&mut [], &mut []),
        }
    }

    /// Writes one bin. Returns `false` when out of range or released.
    pub fn set_polar(&mut self, index: usize, magnitude: f32, phase: f32) -> bool {
        let (norm, phas) = self.split_mut();
        if index >= norm.len() {
            return false;
        }
        norm[index] = magnitude;
        phas[index] = phase;
        true
    }

    /// Resets every bin to zero magnitude and phase.
    pub fn clear(&mut self) {
        let (norm, phase) = self.split_mut();
        norm.fill(0.0);
        phase.fill(0.0);
    }

    /// Frees the storage. Safe to call more than once.
    pub fn release(&mut self) {
        self.data = None;
    }
}

/// Double-precision coefficient buffer.
///
/// Filters own their coefficients in `LongBuffer`s and lend them out as
/// `&LongBuffer`; a borrowed view can be read but never released.
#[derive(Debug, Clone, PartialEq)]
pub struct LongBuffer {
    data: Option<Vec<f64>>,
}

impl LongBuffer {
    /// Creates a buffer of `capacity` zeroed coefficients.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: Some(vec![0.0; capacity]),
        }
    }

    /// Creates a buffer holding a copy of `values`.
    pub fn from_slice(values: &[f64]) -> Self {
        Self {
            data: Some(values.to_vec()),
        }
    }

    /// Capacity, or 0 once released.
    #[inline]
    pub fn size(&self) -> usize {
        self.data.as_ref().map_or(0, Vec::len)
    }

    /// Whether [`release`](Self::release) has been called.
    #[inline]
    pub fn is_released(&self) -> bool {
        self.data.is_none()
    }

    /// Independent copy of the coefficients.
    pub fn to_vec(&self) -> Vec<f64> {
        self.as_slice().to_vec()
    }

    /// Borrowed coefficients (empty once released).
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        self.data.as_deref().unwrap_or(&[])
    }

    /// Mutable coefficients (empty once released).
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        self.data.as_deref_mut().unwrap_or(&mut [])
    }

    /// Reads one coefficient; `None` when out of range or released.
    #[inline]
    pub fn get(&self, index: usize) -> Option<f64> {
        self.as_slice().get(index).copied()
    }

    /// Frees the storage. Safe to call more than once.
    pub fn release(&mut self) {
        self.data = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_zeroed() {
        let buf = SampleBuffer::new(16);
        assert_eq!(buf.size(), 16);
        assert!(buf.as_slice().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_copy_out_is_independent() {
        let mut buf = SampleBuffer::from_slice(&[1.0, 2.0, 3.0]);
        let copy = buf.to_vec();
        buf.as_mut_slice()[1] = -7.0;
        assert_eq!(copy, vec![1.0, 2.0, 3.0]);
        assert_eq!(buf.get(1), Some(-7.0));
    }

    #[test]
    fn test_out_of_range_access() {
        let mut buf = SampleBuffer::new(2);
        assert_eq!(buf.get(2), None);
        assert!(!buf.set(5, 1.0));
        assert!(buf.set(1, 1.0));
    }

    #[test]
    fn test_release_twice() {
        let mut buf = SampleBuffer::new(8);
        buf.release();
        buf.release();
        assert!(buf.is_released());
        assert_eq!(buf.size(), 0);
        assert!(buf.to_vec().is_empty());
        assert!(!buf.set(0, 1.0));
        buf.fill(2.0);
    }

    #[test]
    fn test_copy_from_truncates() {
        let mut buf = SampleBuffer::new(3);
        assert_eq!(buf.copy_from(&[1.0, 2.0, 3.0, 4.0]), 3);
        assert_eq!(buf.to_vec(), vec![1.0, 2.0, 3.0]);
        assert_eq!(buf.copy_from(&[9.0]), 1);
        assert_eq!(buf.to_vec(), vec![9.0, 2.0, 3.0]);
    }

    #[test]
    fn test_complex_views() {
        let mut grain = ComplexBuffer::new(5);
        assert_eq!(grain.magnitudes().len(), 5);
        assert_eq!(grain.phases().len(), 5);

        assert!(grain.set_polar(2, 0.5, 1.0));
        let mags = grain.magnitudes();
        grain.magnitudes_mut()[2] = 9.0;
        assert_eq!(mags[2], 0.5);
        assert_eq!(grain.phases()[2], 1.0);

        grain.release();
        grain.release();
        assert_eq!(grain.size(), 0);
        assert!(grain.magnitudes().is_empty());
        assert!(!grain.set_polar(0, 1.0, 1.0));
    }

    #[test]
    fn test_long_buffer_lifecycle() {
        let mut coeffs = LongBuffer::from_slice(&[1.0, -0.5]);
        assert_eq!(coeffs.size(), 2);
        assert_eq!(coeffs.get(1), Some(-0.5));
        let copy = coeffs.to_vec();
        coeffs.as_mut_slice()[0] = 3.0;
        assert_eq!(copy, vec![1.0, -0.5]);

        coeffs.release();
        coeffs.release();
        assert_eq!(coeffs.size(), 0);
        assert_eq!(coeffs.get(0), None);
    }
}
