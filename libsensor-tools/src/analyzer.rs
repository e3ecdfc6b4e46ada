use crate::context::CaptureContext;
use crate::error::Error;
use crate::frame::Frame;

/// Common trait for frame analyzers, fed by live or offline capture engines
pub trait FrameAnalyzer {
    /// Initialization function, called before the first frame (optional)
    fn init(&mut self) -> Result<(), Error> {
        Ok(())
    }

    /// Callback function for every captured frame
    ///
    /// Frames are delivered one at a time, and the call must complete before the next
    /// frame is requested.
    fn handle_frame(&mut self, frame: &Frame, ctx: &CaptureContext) -> Result<(), Error>;

    /// Teardown function, called after the last frame (optional)
    fn teardown(&mut self) {}
}
