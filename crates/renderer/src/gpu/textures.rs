use wgpu::util::{DeviceExt, TextureDataOrder};

use crate::assets::DecodedImage;
use crate::types::SurfaceSize;

/// Format of buffer-pass render targets; feedback needs more than 8 bits.
pub(crate) const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
const SAMPLED_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// A sampled texture together with its view and sampler.
pub struct GpuTexture {
    pub(crate) texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub(crate) sampler: wgpu::Sampler,
    size: SurfaceSize,
    label: String,
}

impl GpuTexture {
    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn placeholder(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let texture = device.create_texture_with_data(
            queue,
            &sampled_descriptor("placeholder texture", SurfaceSize::new(1, 1)),
            TextureDataOrder::LayerMajor,
            &[255u8, 255, 255, 255],
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = create_sampler(device, wgpu::AddressMode::ClampToEdge, wgpu::FilterMode::Linear);
        Self {
            texture,
            view,
            sampler,
            size: SurfaceSize::new(1, 1),
            label: "placeholder".to_string(),
        }
    }

    /// Render target: linear minification, nearest magnification, clamped.
    pub(crate) fn target(device: &wgpu::Device, label: &str, size: SurfaceSize) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent(size),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        Self {
            texture,
            view,
            sampler,
            size,
            label: label.to_string(),
        }
    }

    /// Shared asset texture; rows arrive bottom-up and wrap in both axes.
    pub(crate) fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        image: &DecodedImage,
    ) -> Self {
        let size = SurfaceSize::new(image.width, image.height);
        let texture = device.create_texture_with_data(
            queue,
            &sampled_descriptor(label, size),
            TextureDataOrder::LayerMajor,
            &image.rgba,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = create_sampler(device, wgpu::AddressMode::Repeat, wgpu::FilterMode::Linear);
        Self {
            texture,
            view,
            sampler,
            size,
            label: label.to_string(),
        }
    }

    /// Replaces the storage of a render target; contents are lost.
    pub(crate) fn reallocate(&mut self, device: &wgpu::Device, size: SurfaceSize) {
        let replacement = Self::target(device, &self.label, size);
        let previous = std::mem::replace(self, replacement);
        previous.destroy();
    }

    pub(crate) fn destroy(self) {
        self.texture.destroy();
    }
}

fn extent(size: SurfaceSize) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: size.width,
        height: size.height,
        depth_or_array_layers: 1,
    }
}

fn sampled_descriptor(label: &str, size: SurfaceSize) -> wgpu::TextureDescriptor<'_> {
    wgpu::TextureDescriptor {
        label: Some(label),
        size: extent(size),
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: SAMPLED_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    }
}

fn create_sampler(
    device: &wgpu::Device,
    address_mode: wgpu::AddressMode,
    filter: wgpu::FilterMode,
) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: filter,
        min_filter: filter,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}
