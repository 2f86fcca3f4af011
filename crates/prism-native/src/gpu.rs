use prism_core::CapabilityProbe;

/// What the native host can tell about itself without opening a window.
#[derive(Clone, Debug, Default)]
pub struct NativeProbe {
    pub adapter: Option<AdapterSummary>,
    pub benchmark_ms: Option<f32>,
}

#[derive(Clone, Debug)]
pub struct AdapterSummary {
    pub name: String,
    pub device_type: wgpu::DeviceType,
    pub backend: wgpu::Backend,
    pub max_texture_dimension_2d: u32,
}

impl AdapterSummary {
    fn is_hardware(&self) -> bool {
        !matches!(
            self.device_type,
            wgpu::DeviceType::Cpu | wgpu::DeviceType::Other
        )
    }
}

/// Ask wgpu for the preferred adapter. No surface is needed for a probe.
pub async fn probe_adapter() -> anyhow::Result<AdapterSummary> {
    let instance = wgpu::Instance::default();
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .ok_or_else(|| anyhow::anyhow!("No GPU adapter"))?;
    let info = adapter.get_info();
    let limits = adapter.limits();
    Ok(AdapterSummary {
        name: info.name,
        device_type: info.device_type,
        backend: info.backend,
        max_texture_dimension_2d: limits.max_texture_dimension_2d,
    })
}

impl CapabilityProbe for NativeProbe {
    fn logical_cores(&self) -> Option<u32> {
        std::thread::available_parallelism()
            .ok()
            .map(|n| n.get() as u32)
    }

    fn gpu_acceleration(&self) -> Option<bool> {
        self.adapter.as_ref().map(AdapterSummary::is_hardware)
    }

    // Device memory has no portable query; a large texture limit is the
    // closest proxy for a desktop-class GPU.
    fn device_memory_gb(&self) -> Option<f32> {
        let adapter = self.adapter.as_ref()?;
        match adapter.max_texture_dimension_2d {
            d if d >= 16_384 => Some(8.0),
            d if d >= 8_192 => Some(4.0),
            _ => None,
        }
    }

    fn benchmark_ms(&self) -> Option<f32> {
        self.benchmark_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::{DeviceCapabilityProfile, Tier};

    fn summary(device_type: wgpu::DeviceType, max_tex: u32) -> AdapterSummary {
        AdapterSummary {
            name: "test".into(),
            device_type,
            backend: wgpu::Backend::Vulkan,
            max_texture_dimension_2d: max_tex,
        }
    }

    #[test]
    fn software_adapter_is_not_acceleration() {
        let probe = NativeProbe {
            adapter: Some(summary(wgpu::DeviceType::Cpu, 8_192)),
            benchmark_ms: None,
        };
        assert_eq!(probe.gpu_acceleration(), Some(false));
    }

    #[test]
    fn no_adapter_detects_without_gpu() {
        let device = DeviceCapabilityProfile::detect(&NativeProbe::default());
        assert!(!device.gpu_acceleration);
        assert_eq!(device.memory_tier, Tier::Low);
    }

    #[test]
    fn texture_limit_maps_to_memory_tier() {
        let probe = NativeProbe {
            adapter: Some(summary(wgpu::DeviceType::DiscreteGpu, 16_384)),
            benchmark_ms: Some(0.1),
        };
        let device = DeviceCapabilityProfile::detect(&probe);
        assert!(device.gpu_acceleration);
        assert_eq!(device.memory_tier, Tier::High);
    }
}
