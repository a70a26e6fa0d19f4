use winit::dpi::PhysicalSize;

/// Depth buffer format shared by the surface depth target and sprite pipelines.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

pub(crate) fn choose_surface_format(
    caps: &wgpu::SurfaceCapabilities,
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    let first = caps.formats.first().copied()?;
    if !prefer_srgb {
        return Some(first);
    }

    Some(
        caps.formats
            .iter()
            .copied()
            .find(wgpu::TextureFormat::is_srgb)
            .unwrap_or(first),
    )
}

pub(crate) fn choose_alpha_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    requested
        .filter(|m| caps.alpha_modes.contains(m))
        .or_else(|| caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

/// Depth target matching the surface size.
pub(crate) fn create_depth_view(device: &wgpu::Device, size: PhysicalSize<u32>) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("verger depth target"),
        size: wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::{CompositeAlphaMode, TextureFormat};

    fn surface_caps(formats: Vec<TextureFormat>, alpha_modes: Vec<CompositeAlphaMode>) -> wgpu::SurfaceCapabilities {
        wgpu::SurfaceCapabilities {
            formats,
            present_modes: vec![wgpu::PresentMode::Fifo],
            alpha_modes,
            usages: wgpu::TextureUsages::RENDER_ATTACHMENT,
        }
    }

    // ── formats ──────────────────────────────────────────────────────────

    #[test]
    fn srgb_format_preferred_when_offered() {
        let caps = surface_caps(vec![TextureFormat::Bgra8Unorm, TextureFormat::Bgra8UnormSrgb], vec![]);
        assert_eq!(choose_surface_format(&caps, true), Some(TextureFormat::Bgra8UnormSrgb));
        assert_eq!(choose_surface_format(&caps, false), Some(TextureFormat::Bgra8Unorm));
    }

    #[test]
    fn first_format_used_without_srgb_option() {
        let caps = surface_caps(vec![TextureFormat::Rgba16Float], vec![]);
        assert_eq!(choose_surface_format(&caps, true), Some(TextureFormat::Rgba16Float));
        assert_eq!(choose_surface_format(&surface_caps(vec![], vec![]), true), None);
    }

    // ── alpha ────────────────────────────────────────────────────────────

    #[test]
    fn unsupported_alpha_mode_falls_back() {
        let caps = surface_caps(vec![], vec![CompositeAlphaMode::Opaque]);
        assert_eq!(
            choose_alpha_mode(&caps, Some(CompositeAlphaMode::PreMultiplied)),
            CompositeAlphaMode::Opaque
        );
        assert_eq!(choose_alpha_mode(&caps, None), CompositeAlphaMode::Opaque);
        assert_eq!(
            choose_alpha_mode(&surface_caps(vec![], vec![]), None),
            CompositeAlphaMode::Auto
        );
    }
}
