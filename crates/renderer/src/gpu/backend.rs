use std::sync::Arc;

use anyhow::{anyhow, Result};
use tracing::debug;
use winit::window::Window;

use crate::assets::DecodedImage;
use crate::backend::{DrawCall, DrawTarget, OutputKind, RenderBackend};
use crate::types::SurfaceSize;

use super::context::GpuContext;
use super::pipeline::{build_sampler_entries, GpuProgram, PipelineLayouts};
use super::textures::GpuTexture;

/// Work recorded for one displayed frame.
pub struct GpuFrame {
    encoder: wgpu::CommandEncoder,
    surface_texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
}

/// [`RenderBackend`] drawing into a winit window through wgpu.
pub struct WgpuBackend {
    context: GpuContext,
    layouts: PipelineLayouts,
    // Keeps the window alive for as long as the surface created from it.
    _window: Arc<Window>,
}

impl WgpuBackend {
    pub fn new(window: Arc<Window>, size: SurfaceSize) -> Result<Self> {
        let context = GpuContext::new(window.as_ref(), size)?;
        let layouts = PipelineLayouts::new(&context.device);
        Ok(Self {
            context,
            layouts,
            _window: window,
        })
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.context.surface_format
    }
}

impl RenderBackend for WgpuBackend {
    type Texture = GpuTexture;
    type Program = GpuProgram;
    type Frame = GpuFrame;

    fn create_placeholder(&mut self) -> Result<GpuTexture> {
        Ok(GpuTexture::placeholder(
            &self.context.device,
            &self.context.queue,
        ))
    }

    fn create_target(&mut self, label: &str, size: SurfaceSize) -> Result<GpuTexture> {
        let max_dimension = self.context.device.limits().max_texture_dimension_2d;
        if size.width > max_dimension || size.height > max_dimension {
            return Err(anyhow!(
                "render target {label} of {}x{} exceeds the GPU limit of {max_dimension}",
                size.width,
                size.height
            ));
        }
        Ok(GpuTexture::target(&self.context.device, label, size))
    }

    fn resize_target(&mut self, target: &mut GpuTexture, size: SurfaceSize) -> Result<()> {
        target.reallocate(&self.context.device, size);
        Ok(())
    }

    fn upload_image(&mut self, label: &str, image: &DecodedImage) -> Result<GpuTexture> {
        let max_dimension = self.context.device.limits().max_texture_dimension_2d;
        if image.width > max_dimension || image.height > max_dimension {
            return Err(anyhow!(
                "texture {label} of {}x{} exceeds the GPU limit of {max_dimension}",
                image.width,
                image.height
            ));
        }
        Ok(GpuTexture::from_image(
            &self.context.device,
            &self.context.queue,
            label,
            image,
        ))
    }

    fn release_texture(&mut self, texture: GpuTexture) {
        texture.destroy();
    }

    fn compile(&mut self, label: &str, assembled: &str, output: OutputKind) -> Result<GpuProgram> {
        GpuProgram::new(
            &self.context.device,
            &self.layouts,
            self.context.surface_format,
            label,
            assembled,
            output,
        )
    }

    fn resize_surface(&mut self, size: SurfaceSize) {
        self.context.resize(size);
    }

    fn begin_frame(&mut self) -> Result<Option<GpuFrame>> {
        let surface_texture = match self.context.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                debug!("surface lost or outdated; reconfiguring");
                self.context.reconfigure();
                return Ok(None);
            }
            Err(wgpu::SurfaceError::Timeout) => {
                debug!("timed out acquiring surface texture");
                return Ok(None);
            }
            Err(err) => return Err(anyhow!("failed to acquire surface texture: {err}")),
        };
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("multipass frame"),
            });
        Ok(Some(GpuFrame {
            encoder,
            surface_texture,
            view,
        }))
    }

    fn draw(&mut self, frame: &mut GpuFrame, call: DrawCall<'_, GpuTexture, GpuProgram>) -> Result<()> {
        let device = &self.context.device;
        self.context.queue.write_buffer(
            &call.program.uniform_buffer,
            0,
            bytemuck::bytes_of(call.uniforms),
        );
        let channel_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("channel bind group"),
            layout: &self.layouts.channel_layout,
            entries: &build_sampler_entries(&call.channels),
        });
        let asset_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("asset bind group"),
            layout: &self.layouts.asset_layout,
            entries: &build_sampler_entries(&call.textures),
        });

        let view = match call.target {
            DrawTarget::Offscreen(texture) => &texture.view,
            DrawTarget::Surface => &frame.view,
        };
        let mut render_pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(call.label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        render_pass.set_pipeline(&call.program.pipeline);
        render_pass.set_bind_group(0, &call.program.uniform_bind_group, &[]);
        render_pass.set_bind_group(1, &channel_bind_group, &[]);
        render_pass.set_bind_group(2, &asset_bind_group, &[]);
        render_pass.draw(0..3, 0..1);
        Ok(())
    }

    fn end_frame(&mut self, frame: GpuFrame) -> Result<()> {
        let GpuFrame {
            encoder,
            surface_texture,
            ..
        } = frame;
        self.context.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
        Ok(())
    }
}
