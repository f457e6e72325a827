use super::cache::ModelOptions;
use crate::error::{PipelineError, Result};
use candle_core::Device;

/// Device a pipeline should load its model on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeviceRequest {
    #[default]
    Cpu,
    Cuda(usize),
}

impl DeviceRequest {
    pub fn resolve(self) -> Result<Device> {
        match self {
            DeviceRequest::Cpu => Ok(Device::Cpu),
            DeviceRequest::Cuda(i) => Device::new_cuda(i).map_err(|e| {
                PipelineError::Device(format!(
                    "Failed to init CUDA device {i}: {e}. Try CPU as fallback."
                ))
            }),
        }
    }
}

pub fn build_cache_key<O: ModelOptions>(options: &O, device: &Device) -> String {
    format!("{}-{:?}", options.cache_key(), device.location())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Opts;

    impl ModelOptions for Opts {
        fn cache_key(&self) -> String {
            "org/model".into()
        }
    }

    #[test]
    fn cpu_always_resolves() {
        assert!(DeviceRequest::Cpu.resolve().unwrap().is_cpu());
    }

    #[test]
    fn cache_key_includes_device() {
        let key = build_cache_key(&Opts, &Device::Cpu);
        assert!(key.starts_with("org/model-"));
        assert!(key.contains("Cpu"));
    }
}
