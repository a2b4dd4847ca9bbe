use std::panic::Location;

/// Failure of a GPU or presentation call.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("{call} failed: {message}")]
    CallFailed { call: &'static str, message: String },
    #[error("no suitable adapter found")]
    AdapterNotFound,
    #[error("device creation failed: {0}")]
    DeviceCreation(String),
    #[error("surface error: {0}")]
    Surface(String),
    #[error("command allocator reset while its lists are still executing")]
    AllocatorInUse,
    #[error("command list is still open")]
    ListOpen,
    #[error("command list is not open for recording")]
    ListNotOpen,
    #[error("fence wait for {value} can never complete (completed {completed}, last signaled {signaled})")]
    WaitNeverSatisfied {
        value: u64,
        completed: u64,
        signaled: u64,
    },
    #[error("descriptor heap full (capacity {capacity})")]
    DescriptorHeapFull { capacity: u32 },
    #[error("descriptor index {index} out of range (capacity {capacity})")]
    InvalidDescriptor { index: u32, capacity: u32 },
    #[error("resource is not CPU visible")]
    NotCpuVisible,
    #[error("write of {len} bytes at offset {offset} overflows buffer of {size} bytes")]
    WriteOutOfBounds { offset: u64, len: u64, size: u64 },
    #[error("shader error: {0}")]
    Shader(String),
}

impl GpuError {
    pub fn call(call: &'static str, message: impl Into<String>) -> Self {
        Self::CallFailed {
            call,
            message: message.into(),
        }
    }
}

/// Unwraps a GPU result or aborts the process.
///
/// GPU failures have no recovery path: the error and the calling location are
/// logged and the process terminates without unwinding.
#[track_caller]
pub fn verify<T>(result: Result<T, GpuError>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => {
            let location = Location::caller();
            tracing::error!(
                file = location.file(),
                line = location.line(),
                "fatal GPU error: {err}"
            );
            std::process::abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_passes_ok_through() {
        assert_eq!(verify(Ok::<_, GpuError>(7)), 7);
    }

    #[test]
    fn call_failed_names_the_call() {
        let err = GpuError::call("CreateSwapchain", "surface lost");
        assert_eq!(err.to_string(), "CreateSwapchain failed: surface lost");
    }
}
