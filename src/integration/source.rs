//! Video frames and the trait that delivers them.

use std::convert::Infallible;

use ndarray::Array3;

/// One decoded video frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Position in the source video, 0-based, strictly increasing
    pub index: usize,
    pub width: u32,
    pub height: u32,
    /// Pixel data `(height, width, channels)`; empty for replayed frames
    pub pixels: Array3<u8>,
}

impl Frame {
    /// Wrap decoded pixels `(height, width, channels)`.
    pub fn new(index: usize, pixels: Array3<u8>) -> Self {
        let (height, width, _) = pixels.dim();
        Self {
            index,
            width: width as u32,
            height: height as u32,
            pixels,
        }
    }

    /// A frame that carries only its index and size.
    ///
    /// Used when model outputs are replayed from a recording and no pixels
    /// are needed.
    pub fn placeholder(index: usize, width: u32, height: u32) -> Self {
        Self {
            index,
            width,
            height,
            pixels: Array3::zeros((0, 0, 3)),
        }
    }

    pub fn has_pixels(&self) -> bool {
        !self.pixels.is_empty()
    }
}

/// Source of frames in strictly increasing temporal order.
pub trait FrameSource {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Next frame, or `None` at end of stream.
    fn next_frame(&mut self) -> Result<Option<Frame>, Self::Error>;
}

impl<S: FrameSource + ?Sized> FrameSource for &mut S {
    type Error = S::Error;

    fn next_frame(&mut self) -> Result<Option<Frame>, Self::Error> {
        (**self).next_frame()
    }
}

/// Adapts any iterator of frames into an infallible [`FrameSource`].
#[derive(Debug, Clone)]
pub struct IterSource<I> {
    frames: I,
}

impl<I: Iterator<Item = Frame>> IterSource<I> {
    pub fn new(frames: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            frames: frames.into_iter(),
        }
    }
}

impl IterSource<std::vec::IntoIter<Frame>> {
    /// `count` placeholder frames numbered from 0.
    pub fn placeholders(count: usize, width: u32, height: u32) -> Self {
        let frames: Vec<Frame> = (0..count)
            .map(|i| Frame::placeholder(i, width, height))
            .collect();
        Self::new(frames)
    }
}

impl<I: Iterator<Item = Frame>> FrameSource for IterSource<I> {
    type Error = Infallible;

    fn next_frame(&mut self) -> Result<Option<Frame>, Self::Error> {
        Ok(self.frames.next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_dimensions_come_from_pixels() {
        let frame = Frame::new(3, Array3::zeros((480, 640, 3)));
        assert_eq!(frame.width, 640);
        assert_eq!(frame.height, 480);
        assert!(frame.has_pixels());
        assert!(!Frame::placeholder(0, 640, 480).has_pixels());
    }

    #[test]
    fn test_iter_source_ends() {
        let mut source = IterSource::placeholders(2, 10, 10);
        assert_eq!(source.next_frame().unwrap().unwrap().index, 0);
        assert_eq!(source.next_frame().unwrap().unwrap().index, 1);
        assert!(source.next_frame().unwrap().is_none());
    }
}
