//! Capture device ownership
//!
//! The camera is a single process-wide resource. `CaptureDevice` is the shared
//! handle; a session takes exclusive use of it through a `CaptureLease`.
//! Acquire, every read and release go through one mutex, so stopping can
//! never interleave with an in-flight read.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{BiometricError, Result};

/// Raw video frame from the capture collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Camera backend (excluded collaborator)
pub trait FrameSource {
    /// Prepare the device for reading
    fn open(&mut self) -> Result<()>;

    /// Read the next frame; an error ends the stream
    fn read(&mut self) -> Result<Frame>;

    /// Release the underlying device
    fn release(&mut self);
}

struct DeviceState<S> {
    source: S,
    leased: bool,
}

/// Shared handle to the capture resource
pub struct CaptureDevice<S: FrameSource> {
    inner: Arc<Mutex<DeviceState<S>>>,
}

impl<S: FrameSource> Clone for CaptureDevice<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

fn lock<S>(inner: &Mutex<DeviceState<S>>) -> MutexGuard<'_, DeviceState<S>> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<S: FrameSource> CaptureDevice<S> {
    pub fn new(source: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(DeviceState {
                source,
                leased: false,
            })),
        }
    }

    /// Take exclusive use of the device. Fails with `Device` while another
    /// lease is outstanding.
    pub fn acquire(&self) -> Result<CaptureLease<S>> {
        let mut state = lock(&self.inner);
        if state.leased {
            return Err(BiometricError::Device(
                "capture device already in use".to_string(),
            ));
        }

        state.source.open()?;
        state.leased = true;
        log::info!("Capture device acquired");

        Ok(CaptureLease {
            inner: Arc::clone(&self.inner),
            released: false,
        })
    }

    pub fn is_in_use(&self) -> bool {
        lock(&self.inner).leased
    }
}

/// Exclusive use of the capture device; released exactly once
pub struct CaptureLease<S: FrameSource> {
    inner: Arc<Mutex<DeviceState<S>>>,
    released: bool,
}

impl<S: FrameSource> CaptureLease<S> {
    pub fn read(&mut self) -> Result<Frame> {
        if self.released {
            return Err(BiometricError::Device("capture lease released".to_string()));
        }
        lock(&self.inner).source.read()
    }

    /// Release the device. Returns false if it was already released.
    pub fn release(&mut self) -> bool {
        if self.released {
            return false;
        }

        let mut state = lock(&self.inner);
        state.source.release();
        state.leased = false;
        self.released = true;
        log::info!("Capture device released");
        true
    }
}

impl<S: FrameSource> Drop for CaptureLease<S> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted camera: yields `frames` frames then fails
    pub struct ScriptedCamera {
        pub frames: usize,
        pub served: usize,
        pub releases: Arc<AtomicUsize>,
    }

    impl ScriptedCamera {
        pub fn new(frames: usize) -> (Self, Arc<AtomicUsize>) {
            let releases = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    frames,
                    served: 0,
                    releases: Arc::clone(&releases),
                },
                releases,
            )
        }

        pub fn release_count(counter: &Arc<AtomicUsize>) -> usize {
            counter.load(Ordering::SeqCst)
        }
    }

    impl FrameSource for ScriptedCamera {
        fn open(&mut self) -> Result<()> {
            Ok(())
        }

        fn read(&mut self) -> Result<Frame> {
            if self.served >= self.frames {
                return Err(BiometricError::Device("end of script".to_string()));
            }
            self.served += 1;
            Ok(Frame {
                width: 4,
                height: 4,
                pixels: vec![self.served as u8; 16],
            })
        }

        fn release(&mut self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedCamera;
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_second_acquire_is_refused() {
        let (camera, _) = ScriptedCamera::new(3);
        let device = CaptureDevice::new(camera);
        let _lease = device.acquire().unwrap();
        let err = device.acquire().err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Device);
    }

    #[test]
    fn test_release_once_then_reacquire() {
        let (camera, releases) = ScriptedCamera::new(3);
        let device = CaptureDevice::new(camera);

        let mut lease = device.acquire().unwrap();
        assert!(device.is_in_use());
        assert!(lease.release());
        assert!(!lease.release());
        drop(lease);
        assert_eq!(ScriptedCamera::release_count(&releases), 1);
        assert!(!device.is_in_use());

        let _again = device.acquire().unwrap();
    }

    #[test]
    fn test_drop_releases() {
        let (camera, releases) = ScriptedCamera::new(1);
        let device = CaptureDevice::new(camera);
        {
            let mut lease = device.acquire().unwrap();
            lease.read().unwrap();
        }
        assert_eq!(ScriptedCamera::release_count(&releases), 1);
        assert!(!device.is_in_use());
    }

    #[test]
    fn test_read_after_release_fails() {
        let (camera, _) = ScriptedCamera::new(5);
        let device = CaptureDevice::new(camera);
        let mut lease = device.acquire().unwrap();
        lease.release();
        assert_eq!(lease.read().unwrap_err().kind(), ErrorKind::Device);
    }
}
